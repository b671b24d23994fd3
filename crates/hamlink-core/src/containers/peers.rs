// ── Wireless peers ──
//
// The roster (who is associated, on which interface, in which role) is
// settled when the container is built. Signal levels, link uptime and
// CCQ are volatile: only their query recipes are kept in a `PeerRecord`,
// the values are read lazily and never cached.

use std::collections::HashMap;
use std::time::Duration;

use hamlink_api::{Oid, SnmpValue};
use serde::{Deserialize, Serialize};

use super::lazy::{FieldState, LazyValue};
use super::query::ValueQuery;
use super::source::FieldSource;
use crate::model::MacAddress;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatileQueries {
    #[serde(default)]
    pub rx_signal: ValueQuery,
    #[serde(default)]
    pub tx_signal: ValueQuery,
    #[serde(default)]
    pub link_uptime: ValueQuery,
    #[serde(default)]
    pub ccq: ValueQuery,
}

/// Roster entry of one association; the cached form of a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub remote_mac: MacAddress,
    pub interface_id: Option<u32>,
    /// Role of the local radio: `Some(true)` when it is the access point.
    pub is_access_point: Option<bool>,
    pub client_count: Option<u32>,
    #[serde(default)]
    pub queries: VolatileQueries,
}

/// Values of the volatile fields when they are known up front.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeerValues {
    pub rx_signal: Option<f64>,
    pub tx_signal: Option<f64>,
    pub link_uptime: Option<Duration>,
    pub ccq: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerSnapshot {
    pub remote_mac: MacAddress,
    pub interface_id: Option<u32>,
    pub is_access_point: Option<bool>,
    pub client_count: Option<u32>,
    pub rx_signal: f64,
    pub tx_signal: f64,
    pub link_uptime_secs: u64,
    pub ccq: Option<f64>,
}

#[derive(Debug)]
pub struct WirelessPeerInfo {
    record: PeerRecord,
    source: FieldSource,
    rx_signal: LazyValue<f64>,
    tx_signal: LazyValue<f64>,
    link_uptime: LazyValue<Duration>,
    ccq: LazyValue<f64>,
}

impl WirelessPeerInfo {
    pub fn new(source: FieldSource, record: PeerRecord) -> Self {
        Self {
            record,
            source,
            rx_signal: LazyValue::new(),
            tx_signal: LazyValue::new(),
            link_uptime: LazyValue::new(),
            ccq: LazyValue::new(),
        }
    }

    pub fn resolved(source: FieldSource, record: PeerRecord, values: PeerValues) -> Self {
        let peer = Self::new(source, record);
        peer.rx_signal.fill(values.rx_signal);
        peer.tx_signal.fill(values.tx_signal);
        peer.link_uptime.fill(values.link_uptime);
        peer.ccq.fill(values.ccq);
        peer
    }

    pub fn remote_mac(&self) -> MacAddress {
        self.record.remote_mac
    }

    pub fn interface_id(&self) -> Option<u32> {
        self.record.interface_id
    }

    pub fn is_access_point(&self) -> Option<bool> {
        self.record.is_access_point
    }

    pub fn client_count(&self) -> Option<u32> {
        self.record.client_count
    }

    pub fn record(&self) -> &PeerRecord {
        &self.record
    }

    /// Level received from the peer in dBm; NaN if unsupported.
    pub async fn rx_signal(&self) -> f64 {
        self.rx_signal
            .get_or_fetch(|| {
                self.source
                    .fetch("rx_signal", &self.record.queries.rx_signal, ValueQuery::decode_f64)
            })
            .await
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Level the peer receives from us in dBm; NaN if unsupported.
    pub async fn tx_signal(&self) -> f64 {
        self.tx_signal
            .get_or_fetch(|| {
                self.source
                    .fetch("tx_signal", &self.record.queries.tx_signal, ValueQuery::decode_f64)
            })
            .await
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// `Duration::ZERO` if unsupported.
    pub async fn link_uptime(&self) -> Duration {
        self.link_uptime
            .get_or_fetch(|| {
                self.source.fetch(
                    "link_uptime",
                    &self.record.queries.link_uptime,
                    ValueQuery::decode_duration,
                )
            })
            .await
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub async fn ccq(&self) -> Option<f64> {
        self.ccq
            .get_or_fetch(|| {
                self.source
                    .fetch("ccq", &self.record.queries.ccq, ValueQuery::decode_f64)
            })
            .await
            .copied()
    }

    pub fn rx_state(&self) -> FieldState<'_, f64> {
        self.rx_signal.state()
    }

    fn pending(&self) -> Vec<Oid> {
        let q = &self.record.queries;
        [
            (&self.rx_signal, &q.rx_signal),
            (&self.tx_signal, &q.tx_signal),
            (&self.ccq, &q.ccq),
        ]
        .into_iter()
        .filter(|(slot, _)| !slot.is_fetched())
        .flat_map(|(_, query)| query.oids())
        .chain(
            (!self.link_uptime.is_fetched())
                .then(|| q.link_uptime.oids())
                .into_iter()
                .flatten(),
        )
        .collect()
    }

    fn settle(&self, values: &HashMap<Oid, SnmpValue>) {
        let q = &self.record.queries;
        self.rx_signal.fill(q.rx_signal.decode_f64(values));
        self.tx_signal.fill(q.tx_signal.decode_f64(values));
        self.link_uptime.fill(q.link_uptime.decode_duration(values));
        self.ccq.fill(q.ccq.decode_f64(values));
    }

    pub async fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            remote_mac: self.remote_mac(),
            interface_id: self.interface_id(),
            is_access_point: self.is_access_point(),
            client_count: self.client_count(),
            rx_signal: self.rx_signal().await,
            tx_signal: self.tx_signal().await,
            link_uptime_secs: self.link_uptime().await.as_secs(),
            ccq: self.ccq().await,
        }
    }
}

#[derive(Debug)]
pub struct WirelessPeerInfos {
    source: FieldSource,
    peers: Vec<WirelessPeerInfo>,
}

impl WirelessPeerInfos {
    pub fn new(source: FieldSource, peers: Vec<WirelessPeerInfo>) -> Self {
        Self { source, peers }
    }

    /// Rebuilds a roster from cached records; volatile fields are read
    /// live through `source`.
    pub fn from_records(source: FieldSource, records: Vec<PeerRecord>) -> Self {
        let peers = records
            .into_iter()
            .map(|record| WirelessPeerInfo::new(source.clone(), record))
            .collect();
        Self { source, peers }
    }

    pub fn source(&self) -> &FieldSource {
        &self.source
    }

    pub fn iter(&self) -> impl Iterator<Item = &WirelessPeerInfo> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn find_by_remote_mac(&self, mac: MacAddress) -> Option<&WirelessPeerInfo> {
        self.peers.iter().find(|p| p.remote_mac() == mac)
    }

    pub fn query_duration(&self) -> Duration {
        self.source.timer().total()
    }

    /// Settles every volatile field of every peer in batched requests.
    pub async fn force_evaluate_all(&self) {
        let oids: Vec<Oid> = self.peers.iter().flat_map(WirelessPeerInfo::pending).collect();
        let values = if oids.is_empty() {
            HashMap::new()
        } else {
            match self.source.values(&oids).await {
                Ok(values) => values,
                Err(e) => {
                    self.source.log_failure("wireless_peers", &e);
                    HashMap::new()
                }
            }
        };
        for peer in &self.peers {
            peer.settle(&values);
        }
    }

    pub fn records(&self) -> Vec<PeerRecord> {
        self.peers.iter().map(|p| p.record.clone()).collect()
    }

    pub async fn snapshots(&self) -> Vec<PeerSnapshot> {
        self.force_evaluate_all().await;
        let mut out = Vec::with_capacity(self.peers.len());
        for peer in &self.peers {
            out.push(peer.snapshot().await);
        }
        out
    }
}
