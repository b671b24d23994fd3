// ── Link correlation ──
//
// Merges the views of the two ends of one radio link. A side's peer entry
// belongs to the link when its remote MAC is one of the other side's
// interface MACs. Absence of such a pairing yields no details, not an
// error: probed topologies are often speculative.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::containers::{
    InterfaceDetail, InterfaceDetails, SystemData, WirelessPeerInfo, WirelessPeerInfos,
};
use crate::error::CoreError;
use crate::handler::DeviceHandler;
use crate::model::{DeviceAddress, MacAddress};

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// One correlated radio link. Side 1 is the first device queried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkDetail {
    pub address1: DeviceAddress,
    pub address2: DeviceAddress,
    pub mac1: Option<MacAddress>,
    pub mac2: Option<MacAddress>,
    pub interface_name1: Option<String>,
    pub interface_name2: Option<String>,
    pub model_and_version1: String,
    pub model_and_version2: String,
    /// dBm received at side 1 from side 2; NaN if neither side reports it.
    #[serde(rename = "rx_level_1at2")]
    pub rx_level_1at2: f64,
    /// dBm received at side 2 from side 1.
    #[serde(rename = "rx_level_2at1")]
    pub rx_level_2at1: f64,
    #[serde(serialize_with = "as_millis", rename = "link_uptime_ms")]
    pub link_uptime: Duration,
    /// 1 or 2; `None` when no side or both sides claim the AP role.
    pub side_of_access_point: Option<u8>,
    pub ccq1: Option<f64>,
    pub ccq2: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkDetails {
    pub details: Vec<LinkDetail>,
    /// Sum of the device round-trip time of every container involved.
    #[serde(serialize_with = "as_millis", rename = "query_duration_ms")]
    pub query_duration: Duration,
}

impl LinkDetails {
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn merge(&mut self, other: Self) {
        self.details.extend(other.details);
        self.query_duration += other.query_duration;
    }
}

/// Everything one side contributes, loaded in dependency order.
struct LinkSide {
    system: Arc<SystemData>,
    interfaces: Arc<InterfaceDetails>,
    peers: Arc<WirelessPeerInfos>,
}

impl LinkSide {
    async fn load(handler: &dyn DeviceHandler) -> Result<Self, CoreError> {
        let system = handler.system_data().await?;
        let interfaces = handler.network_interface_details().await?;
        interfaces.force_evaluate_all().await;
        let peers = handler.wireless_peer_infos().await?;
        peers.force_evaluate_all().await;
        Ok(Self {
            system,
            interfaces,
            peers,
        })
    }

    fn query_duration(&self) -> Duration {
        self.system.query_duration()
            + self.interfaces.query_duration()
            + self.peers.query_duration()
    }

    fn interface_for(&self, peer: &WirelessPeerInfo) -> Option<&InterfaceDetail> {
        peer.interface_id()
            .and_then(|id| self.interfaces.find_by_id(id))
    }

    /// This side's peer entry pointing at any of `other`'s interfaces.
    fn peer_towards<'a>(
        &'a self,
        other: &'a LinkSide,
    ) -> Option<(&'a WirelessPeerInfo, &'a InterfaceDetail)> {
        self.peers.iter().find_map(|peer| {
            other
                .interfaces
                .find_by_mac(peer.remote_mac())
                .map(|iface| (peer, iface))
        })
    }
}

/// Correlates the link between `a` (side 1) and `b` (side 2).
pub async fn correlate(
    a: &dyn DeviceHandler,
    b: &dyn DeviceHandler,
) -> Result<LinkDetails, CoreError> {
    let side_a = LinkSide::load(a).await?;
    let side_b = LinkSide::load(b).await?;
    let query_duration = side_a.query_duration() + side_b.query_duration();

    let a_view = side_a.peer_towards(&side_b);
    let b_view = side_b.peer_towards(&side_a);
    if a_view.is_none() && b_view.is_none() {
        debug!(a = %a.address(), b = %b.address(), "no matching wireless peers");
        return Ok(LinkDetails {
            details: Vec::new(),
            query_duration,
        });
    }

    let a_peer = a_view.map(|(peer, _)| peer);
    let b_peer = b_view.map(|(peer, _)| peer);
    // Own interface of each side: the one the other side sees, else the
    // one owning the local peer entry.
    let iface1 = b_view
        .map(|(_, iface)| iface)
        .or_else(|| a_peer.and_then(|p| side_a.interface_for(p)));
    let iface2 = a_view
        .map(|(_, iface)| iface)
        .or_else(|| b_peer.and_then(|p| side_b.interface_for(p)));

    let detail = LinkDetail {
        address1: a.address(),
        address2: b.address(),
        mac1: iface1
            .and_then(InterfaceDetail::known_mac)
            .or(b_peer.map(WirelessPeerInfo::remote_mac)),
        mac2: iface2
            .and_then(InterfaceDetail::known_mac)
            .or(a_peer.map(WirelessPeerInfo::remote_mac)),
        interface_name1: iface1.and_then(|i| i.known_name().map(str::to_owned)),
        interface_name2: iface2.and_then(|i| i.known_name().map(str::to_owned)),
        model_and_version1: side_a.system.model_and_version(),
        model_and_version2: side_b.system.model_and_version(),
        rx_level_1at2: first_finite([
            rx_of(a_peer).await,
            tx_of(b_peer).await,
        ]),
        rx_level_2at1: first_finite([
            tx_of(a_peer).await,
            rx_of(b_peer).await,
        ]),
        link_uptime: uptime_of(a_peer).await.max(uptime_of(b_peer).await),
        side_of_access_point: side_of_access_point(
            a_peer.and_then(WirelessPeerInfo::is_access_point),
            b_peer.and_then(WirelessPeerInfo::is_access_point),
        ),
        ccq1: ccq_of(a_peer).await,
        ccq2: ccq_of(b_peer).await,
    };

    Ok(LinkDetails {
        details: vec![detail],
        query_duration,
    })
}

async fn rx_of(peer: Option<&WirelessPeerInfo>) -> f64 {
    match peer {
        Some(peer) => peer.rx_signal().await,
        None => f64::NAN,
    }
}

async fn tx_of(peer: Option<&WirelessPeerInfo>) -> f64 {
    match peer {
        Some(peer) => peer.tx_signal().await,
        None => f64::NAN,
    }
}

async fn uptime_of(peer: Option<&WirelessPeerInfo>) -> Duration {
    match peer {
        Some(peer) => peer.link_uptime().await,
        None => Duration::ZERO,
    }
}

async fn ccq_of(peer: Option<&WirelessPeerInfo>) -> Option<f64> {
    match peer {
        Some(peer) => peer.ccq().await,
        None => None,
    }
}

fn first_finite<const N: usize>(levels: [f64; N]) -> f64 {
    levels
        .into_iter()
        .find(|level| level.is_finite())
        .unwrap_or(f64::NAN)
}

/// The side whose radio alone claims the access point role.
fn side_of_access_point(side1: Option<bool>, side2: Option<bool>) -> Option<u8> {
    match (side1 == Some(true), side2 == Some(true)) {
        (true, false) => Some(1),
        (false, true) => Some(2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_roles_are_not_guessed() {
        assert_eq!(side_of_access_point(Some(true), Some(false)), Some(1));
        assert_eq!(side_of_access_point(None, Some(true)), Some(2));
        assert_eq!(side_of_access_point(Some(true), Some(true)), None);
        assert_eq!(side_of_access_point(Some(false), Some(false)), None);
        assert_eq!(side_of_access_point(None, None), None);
    }

    #[test]
    fn first_finite_level_wins() {
        assert!((first_finite([f64::NAN, -61.0]) - -61.0).abs() < f64::EPSILON);
        assert!(first_finite([f64::NAN, f64::NAN]).is_nan());
    }
}
