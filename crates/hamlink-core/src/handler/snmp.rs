use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use super::peers::{PeerContext, PeerStrategy};
use super::{DeviceHandler, HandlerParts, unsupported};
use crate::containers::{
    BgpPeers, FieldSource, InterfaceDetails, SystemData, WirelessPeerInfo, WirelessPeerInfos,
};
use crate::error::CoreError;
use crate::model::DeviceAddress;

/// Handler for every device queried over SNMP.
///
/// What differs between vendors is how the wireless roster is laid out;
/// that is the [`PeerStrategy`]. Everything else is driven by the lookup
/// tables.
#[derive(Debug)]
pub struct SnmpDeviceHandler {
    parts: HandlerParts,
    strategy: PeerStrategy,
    system: OnceCell<Arc<SystemData>>,
    interfaces: OnceCell<Arc<InterfaceDetails>>,
    peers: OnceCell<Arc<WirelessPeerInfos>>,
}

impl SnmpDeviceHandler {
    pub fn new(parts: HandlerParts, strategy: PeerStrategy) -> Self {
        Self {
            parts,
            strategy,
            system: OnceCell::new(),
            interfaces: OnceCell::new(),
            peers: OnceCell::new(),
        }
    }

    pub fn strategy(&self) -> PeerStrategy {
        self.strategy
    }

    fn source(&self) -> FieldSource {
        FieldSource::live(self.parts.address, Arc::clone(&self.parts.transport))
    }
}

#[async_trait]
impl DeviceHandler for SnmpDeviceHandler {
    fn address(&self) -> DeviceAddress {
        self.parts.address
    }

    async fn system_data(&self) -> Result<Arc<SystemData>, CoreError> {
        let system = self
            .system
            .get_or_init(|| async {
                Arc::new(SystemData::live(
                    self.source(),
                    self.parts.descriptor.clone(),
                    self.parts.probe.as_ref(),
                ))
            })
            .await;
        Ok(Arc::clone(system))
    }

    async fn network_interface_details(&self) -> Result<Arc<InterfaceDetails>, CoreError> {
        let interfaces = self
            .interfaces
            .get_or_try_init(|| async {
                let details = InterfaceDetails::load(self.source(), &self.parts.lookup).await?;
                debug!(address = %self.parts.address, count = details.len(), "interfaces loaded");
                Ok::<_, CoreError>(Arc::new(details))
            })
            .await?;
        Ok(Arc::clone(interfaces))
    }

    async fn wireless_peer_infos(&self) -> Result<Arc<WirelessPeerInfos>, CoreError> {
        let peers = self
            .peers
            .get_or_try_init(|| async {
                let source = self.source();
                let interfaces = if self.strategy.needs_interfaces() {
                    let interfaces = self.network_interface_details().await?;
                    interfaces.force_evaluate_all().await;
                    Some(interfaces)
                } else {
                    None
                };
                let context = PeerContext {
                    source: &source,
                    lookup: &self.parts.lookup,
                    interfaces: interfaces.as_deref(),
                };
                let records = self.strategy.load_roster(&context).await?;
                debug!(
                    address = %self.parts.address,
                    strategy = ?self.strategy,
                    count = records.len(),
                    "wireless roster loaded"
                );
                let peers = records
                    .into_iter()
                    .map(|record| WirelessPeerInfo::new(source.clone(), record))
                    .collect();
                Ok::<_, CoreError>(Arc::new(WirelessPeerInfos::new(source, peers)))
            })
            .await?;
        Ok(Arc::clone(peers))
    }

    async fn fetch_bgp_peers(&self, _remote: Option<IpAddr>) -> Result<BgpPeers, CoreError> {
        Err(unsupported(
            &self.parts.descriptor,
            self.parts.address,
            "BGP peer enumeration over SNMP",
        ))
    }
}
