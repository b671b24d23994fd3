// ── RouterOS API handler ──
//
// MikroTik devices reached through the vendor API. Every view is read in
// one command and arrives fully resolved; nothing is left lazy.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hamlink_api::{VendorRecord, VendorSession};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{DeviceHandler, HandlerParts};
use crate::containers::{
    BgpPeer, BgpPeers, FieldSource, InterfaceDetails, InterfaceSnapshot, PeerRecord, PeerValues,
    SystemData, SystemRecord, VolatileQueries, WirelessPeerInfo, WirelessPeerInfos,
};
use crate::error::CoreError;
use crate::model::{DeviceAddress, InterfaceType, MacAddress};

#[derive(Debug)]
pub struct RouterOsApiHandler {
    parts: HandlerParts,
    session: Arc<dyn VendorSession>,
    system: OnceCell<Arc<SystemData>>,
    interfaces: OnceCell<Arc<InterfaceDetails>>,
    peers: OnceCell<Arc<WirelessPeerInfos>>,
}

impl RouterOsApiHandler {
    pub fn new(parts: HandlerParts) -> Result<Self, CoreError> {
        let session = parts.vendor.clone().ok_or_else(|| {
            CoreError::Internal(format!("{}: RouterOS handler without API session", parts.address))
        })?;
        Ok(Self {
            parts,
            session,
            system: OnceCell::new(),
            interfaces: OnceCell::new(),
            peers: OnceCell::new(),
        })
    }

    async fn run(
        &self,
        source: &FieldSource,
        words: &[&str],
    ) -> Result<Vec<VendorRecord>, CoreError> {
        let started = Instant::now();
        let result = self.session.run(words).await;
        source.timer().record(started.elapsed());
        result.map_err(|e| CoreError::transport(self.parts.address, e))
    }

    fn offline(&self) -> FieldSource {
        FieldSource::offline(self.parts.address)
    }
}

#[async_trait]
impl DeviceHandler for RouterOsApiHandler {
    fn address(&self) -> DeviceAddress {
        self.parts.address
    }

    async fn system_data(&self) -> Result<Arc<SystemData>, CoreError> {
        let system = self
            .system
            .get_or_try_init(|| async {
                let source = self.offline();
                let resource = self.run(&source, &["/system/resource/print"]).await?;
                let identity = self.run(&source, &["/system/identity/print"]).await?;
                let resource = resource.into_iter().next().unwrap_or_default();
                let name = identity
                    .into_iter()
                    .next()
                    .and_then(|mut record| record.remove("name"));

                let record = SystemRecord {
                    descriptor: self.parts.descriptor.clone(),
                    description: resource
                        .get("version")
                        .map(|version| format!("RouterOS {version}")),
                    object_id: None,
                    name,
                    contact: None,
                    location: None,
                };
                let uptime = resource.get("uptime").and_then(|u| parse_duration(u));
                Ok::<_, CoreError>(Arc::new(SystemData::resolved(source, record, uptime)))
            })
            .await?;
        Ok(Arc::clone(system))
    }

    async fn network_interface_details(&self) -> Result<Arc<InterfaceDetails>, CoreError> {
        let interfaces = self
            .interfaces
            .get_or_try_init(|| async {
                let source = self.offline();
                let records = self.run(&source, &["/interface/print"]).await?;
                let snapshots = records.iter().filter_map(interface_snapshot).collect();
                Ok::<_, CoreError>(Arc::new(InterfaceDetails::resolved(source, snapshots)))
            })
            .await?;
        Ok(Arc::clone(interfaces))
    }

    async fn wireless_peer_infos(&self) -> Result<Arc<WirelessPeerInfos>, CoreError> {
        let peers = self
            .peers
            .get_or_try_init(|| async {
                let interfaces = self.network_interface_details().await?;
                let source = self.offline();
                let records = self
                    .run(&source, &["/interface/wireless/registration-table/print"])
                    .await?;

                let per_interface = |name: &str| {
                    records
                        .iter()
                        .filter(|r| r.get("interface").map(String::as_str) == Some(name))
                        .count()
                };
                let mut peers = Vec::with_capacity(records.len());
                for record in &records {
                    let Some(remote_mac) = record.get("mac-address").and_then(|m| m.parse().ok())
                    else {
                        continue;
                    };
                    let interface = record.get("interface").map(String::as_str);
                    let interface_id = interface.and_then(|name| {
                        interfaces
                            .iter()
                            .find(|i| i.known_name() == Some(name))
                            .map(|i| i.id())
                    });
                    // `ap=true` marks the remote end as the access point.
                    let is_access_point = record.get("ap").map(|ap| ap != "true");
                    let client_count = match (is_access_point, interface) {
                        (Some(true), Some(name)) => u32::try_from(per_interface(name)).ok(),
                        _ => None,
                    };
                    let values = PeerValues {
                        rx_signal: record.get("signal-strength").and_then(|s| parse_signal(s)),
                        tx_signal: record.get("tx-signal-strength").and_then(|s| parse_signal(s)),
                        link_uptime: record.get("uptime").and_then(|u| parse_duration(u)),
                        ccq: record.get("tx-ccq").and_then(|c| c.trim().parse().ok()),
                    };
                    let peer = PeerRecord {
                        remote_mac,
                        interface_id,
                        is_access_point,
                        client_count,
                        queries: VolatileQueries::default(),
                    };
                    peers.push(WirelessPeerInfo::resolved(source.clone(), peer, values));
                }
                debug!(
                    address = %self.parts.address,
                    count = peers.len(),
                    "registration table read"
                );
                Ok::<_, CoreError>(Arc::new(WirelessPeerInfos::new(source, peers)))
            })
            .await?;
        Ok(Arc::clone(peers))
    }

    async fn fetch_bgp_peers(&self, remote: Option<IpAddr>) -> Result<BgpPeers, CoreError> {
        let source = self.offline();
        let query = remote.map(|ip| format!("?remote-address={ip}"));
        let mut words = vec!["/routing/bgp/peer/print"];
        if let Some(query) = &query {
            words.push(query);
        }
        let records = self.run(&source, &words).await?;
        let peers = records
            .iter()
            .map(bgp_peer)
            .filter(|peer| remote.is_none() || peer.remote_address == remote)
            .collect();
        Ok(BgpPeers {
            peers,
            query_duration: source.timer().total(),
        })
    }
}

// ── Record parsing ──────────────────────────────────────────────────

fn interface_snapshot(record: &VendorRecord) -> Option<InterfaceSnapshot> {
    let id = record.get(".id")?;
    let id = u32::from_str_radix(id.trim_start_matches('*'), 16).ok()?;
    Some(InterfaceSnapshot {
        id,
        if_type: record.get("type").map(|t| interface_type(t)),
        mac: record
            .get("mac-address")
            .and_then(|m| m.parse::<MacAddress>().ok())
            .filter(|m| !m.is_zero()),
        name: record.get("name").cloned(),
    })
}

fn interface_type(kind: &str) -> InterfaceType {
    match kind {
        "ether" => InterfaceType::EthernetCsmacd,
        "wlan" | "wifi" | "w60g" => InterfaceType::Ieee80211,
        "bridge" => InterfaceType::Bridge,
        "vlan" => InterfaceType::L2Vlan,
        "loopback" => InterfaceType::SoftwareLoopback,
        k if k.starts_with("ppp") || k.starts_with("pptp") || k.starts_with("l2tp") => {
            InterfaceType::Ppp
        }
        k if k.contains("tunnel") || k == "eoip" || k == "wg" => InterfaceType::Tunnel,
        _ => InterfaceType::Other,
    }
}

fn bgp_peer(record: &VendorRecord) -> BgpPeer {
    BgpPeer {
        name: record.get("name").cloned().unwrap_or_default(),
        remote_address: record.get("remote-address").and_then(|a| a.parse().ok()),
        remote_as: record.get("remote-as").and_then(|a| a.parse().ok()),
        state: record.get("state").cloned().unwrap_or_else(|| "unknown".into()),
        uptime_secs: record
            .get("uptime")
            .and_then(|u| parse_duration(u))
            .map_or(0, |d| d.as_secs()),
        prefix_count: record.get("prefix-count").and_then(|c| c.parse().ok()),
        disabled: record.get("disabled").is_some_and(|d| d == "true"),
    }
}

/// `-64dBm@6Mbps`, `-64dBm` or `-64`.
fn parse_signal(text: &str) -> Option<f64> {
    let level = text.split('@').next()?.trim();
    level.trim_end_matches("dBm").trim().parse().ok()
}

/// RouterOS durations: `1w2d3h4m5s`, optionally with `ms`, or `hh:mm:ss`.
fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.contains(':') {
        let mut secs = 0_u64;
        for part in text.split(':') {
            secs = secs.checked_mul(60)?.checked_add(part.parse().ok()?)?;
        }
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut number = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: u64 = number.parse().ok()?;
        number.clear();
        let unit = match c {
            'w' => Duration::from_secs(value.saturating_mul(7 * 86_400)),
            'd' => Duration::from_secs(value.saturating_mul(86_400)),
            'h' => Duration::from_secs(value.saturating_mul(3_600)),
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                Duration::from_millis(value)
            }
            'm' => Duration::from_secs(value.saturating_mul(60)),
            's' => Duration::from_secs(value),
            _ => return None,
        };
        total += unit;
    }
    number.is_empty().then_some(total)
}
