// ── Device handlers ──
//
// One small interface over every device variant. SNMP devices share a
// single handler type parameterized by a peer strategy; MikroTik devices
// reached through the RouterOS API get their own handler.

mod peers;
mod routeros;
mod snmp;

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hamlink_api::{SnmpTransport, VendorSession};

use crate::containers::{BgpPeers, InterfaceDetails, SystemData, WirelessPeerInfos};
use crate::detect::SystemProbe;
use crate::error::CoreError;
use crate::model::{DeviceAddress, DeviceDescriptor};
use crate::oid_table::LayeredLookup;

pub use peers::PeerStrategy;
pub use routeros::RouterOsApiHandler;
pub use snmp::SnmpDeviceHandler;

/// Query surface of one detected device.
///
/// Each view is computed on first access and kept for the handler's
/// lifetime.
#[async_trait]
pub trait DeviceHandler: Send + Sync + fmt::Debug {
    fn address(&self) -> DeviceAddress;

    async fn system_data(&self) -> Result<Arc<SystemData>, CoreError>;

    async fn network_interface_details(&self) -> Result<Arc<InterfaceDetails>, CoreError>;

    async fn wireless_peer_infos(&self) -> Result<Arc<WirelessPeerInfos>, CoreError>;

    /// BGP sessions, optionally only those towards `remote`. Handlers that
    /// cannot enumerate routing peers return [`CoreError::Unsupported`].
    async fn fetch_bgp_peers(&self, remote: Option<IpAddr>) -> Result<BgpPeers, CoreError>;
}

/// Everything detection hands to a handler constructor.
#[derive(Clone)]
pub struct HandlerParts {
    pub address: DeviceAddress,
    pub transport: Arc<dyn SnmpTransport>,
    pub vendor: Option<Arc<dyn VendorSession>>,
    pub descriptor: DeviceDescriptor,
    pub lookup: Arc<LayeredLookup>,
    pub probe: Option<SystemProbe>,
}

impl fmt::Debug for HandlerParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerParts")
            .field("address", &self.address)
            .field("descriptor", &self.descriptor)
            .field("vendor", &self.vendor.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds the handler for a matched detector.
pub type HandlerConstructor = fn(HandlerParts) -> Result<Arc<dyn DeviceHandler>, CoreError>;

pub(crate) fn unsupported(
    descriptor: &DeviceDescriptor,
    address: DeviceAddress,
    operation: &str,
) -> CoreError {
    CoreError::Unsupported {
        address,
        model: descriptor.model_and_version(),
        operation: operation.to_owned(),
    }
}
