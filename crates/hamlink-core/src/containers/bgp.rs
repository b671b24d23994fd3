use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BgpPeer {
    pub name: String,
    pub remote_address: Option<IpAddr>,
    pub remote_as: Option<u32>,
    pub state: String,
    pub uptime_secs: u64,
    pub prefix_count: Option<u64>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BgpPeers {
    pub peers: Vec<BgpPeer>,
    #[serde(skip)]
    pub query_duration: Duration,
}

impl BgpPeers {
    pub fn established(&self) -> impl Iterator<Item = &BgpPeer> {
        self.peers
            .iter()
            .filter(|p| p.state.eq_ignore_ascii_case("established"))
    }
}
