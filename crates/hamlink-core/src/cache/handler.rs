use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hamlink_api::{SnmpTransport, SnmpVersion};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::database::{CacheDatabase, StoreMode};
use super::entry::CacheEntry;
use crate::config::QueryApi;
use crate::containers::{BgpPeers, FieldSource, InterfaceDetails, SystemData, WirelessPeerInfos};
use crate::error::CoreError;
use crate::handler::DeviceHandler;
use crate::model::DeviceAddress;

/// Produces a live handler for an address, typically by running detection.
#[async_trait]
pub trait HandlerSource: Send + Sync + fmt::Debug {
    async fn create(&self, address: DeviceAddress) -> Result<Arc<dyn DeviceHandler>, CoreError>;
}

/// Serves each section from a fresh cache entry when possible and from a
/// live handler otherwise, writing live results back.
///
/// The live handler is created at most once per instance. A stale or
/// missing entry is replaced as a whole: the first section written resets
/// the row so no stale section survives under a new timestamp.
pub struct CachingDeviceHandler {
    address: DeviceAddress,
    db: CacheDatabase,
    validity: Duration,
    transport: Arc<dyn SnmpTransport>,
    requested_version: SnmpVersion,
    source: Arc<dyn HandlerSource>,
    entry: OnceCell<Option<CacheEntry>>,
    reset_pending: AtomicBool,
    live: OnceCell<Arc<dyn DeviceHandler>>,
    system: OnceCell<Arc<SystemData>>,
    interfaces: OnceCell<Arc<InterfaceDetails>>,
    peers: OnceCell<Arc<WirelessPeerInfos>>,
}

impl fmt::Debug for CachingDeviceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingDeviceHandler")
            .field("address", &self.address)
            .field("validity", &self.validity)
            .field("live", &self.live.initialized())
            .finish_non_exhaustive()
    }
}

impl CachingDeviceHandler {
    pub fn new(
        address: DeviceAddress,
        db: CacheDatabase,
        validity: Duration,
        transport: Arc<dyn SnmpTransport>,
        source: Arc<dyn HandlerSource>,
    ) -> Self {
        let requested_version = transport.protocol_version();
        Self {
            address,
            db,
            validity,
            transport,
            requested_version,
            source,
            entry: OnceCell::new(),
            reset_pending: AtomicBool::new(false),
            live: OnceCell::new(),
            system: OnceCell::new(),
            interfaces: OnceCell::new(),
            peers: OnceCell::new(),
        }
    }

    /// Whether this instance created a live handler.
    pub fn went_live(&self) -> bool {
        self.live.initialized()
    }

    async fn entry(&self) -> Option<&CacheEntry> {
        self.entry
            .get_or_init(|| async {
                match self.db.load_fresh(self.address, self.validity, Utc::now()) {
                    Ok(Some(entry)) => {
                        debug!(address = %self.address, "cache hit");
                        Some(entry)
                    }
                    Ok(None) => {
                        debug!(address = %self.address, "cache miss");
                        self.reset_pending.store(true, Ordering::SeqCst);
                        None
                    }
                    Err(e) => {
                        warn!(address = %self.address, error = %e, "cache read failed");
                        self.reset_pending.store(true, Ordering::SeqCst);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    async fn live(&self) -> Result<&Arc<dyn DeviceHandler>, CoreError> {
        self.live
            .get_or_try_init(|| self.source.create(self.address))
            .await
    }

    fn cached_source(&self, entry: &CacheEntry) -> FieldSource {
        // Cached recipes may need a lower protocol version than requested.
        if let Some(system) = &entry.system {
            let version = self
                .requested_version
                .min(system.descriptor.maximum_protocol_version);
            self.transport.set_protocol_version(version);
        }
        FieldSource::live(self.address, Arc::clone(&self.transport))
    }

    fn write_back(
        &self,
        section: &'static str,
        write: impl FnOnce(&CacheDatabase, StoreMode) -> Result<(), CoreError>,
    ) {
        let mode = if self.reset_pending.swap(false, Ordering::SeqCst) {
            StoreMode::Replace
        } else {
            StoreMode::Merge
        };
        if let Err(e) = write(&self.db, mode) {
            warn!(address = %self.address, section, error = %e, "cache write failed");
        }
    }
}

#[async_trait]
impl DeviceHandler for CachingDeviceHandler {
    fn address(&self) -> DeviceAddress {
        self.address
    }

    async fn system_data(&self) -> Result<Arc<SystemData>, CoreError> {
        let system = self
            .system
            .get_or_try_init(|| async {
                if let Some(entry) = self.entry().await {
                    if let Some(record) = &entry.system {
                        let source = self.cached_source(entry);
                        return Ok(Arc::new(SystemData::from_record(source, record.clone())));
                    }
                }
                let system = self.live().await?.system_data().await?;
                system.force_evaluate_all().await;
                let record = system.to_record();
                self.write_back("system_data", |db, mode| {
                    db.store_system(self.address, &record, mode)
                });
                Ok::<_, CoreError>(system)
            })
            .await?;
        Ok(Arc::clone(system))
    }

    async fn network_interface_details(&self) -> Result<Arc<InterfaceDetails>, CoreError> {
        let interfaces = self
            .interfaces
            .get_or_try_init(|| async {
                if let Some(snapshots) = self.entry().await.and_then(|e| e.interfaces.as_ref()) {
                    let source = FieldSource::live(self.address, Arc::clone(&self.transport));
                    return Ok(Arc::new(InterfaceDetails::resolved(source, snapshots.clone())));
                }
                let interfaces = self.live().await?.network_interface_details().await?;
                interfaces.force_evaluate_all().await;
                let snapshots = interfaces.snapshots();
                self.write_back("interface_details", |db, mode| {
                    db.store_interfaces(self.address, &snapshots, mode)
                });
                Ok::<_, CoreError>(interfaces)
            })
            .await?;
        Ok(Arc::clone(interfaces))
    }

    async fn wireless_peer_infos(&self) -> Result<Arc<WirelessPeerInfos>, CoreError> {
        let peers = self
            .peers
            .get_or_try_init(|| async {
                if let Some(entry) = self.entry().await {
                    let vendor = entry.api_used == Some(QueryApi::VendorSpecific);
                    if let (Some(records), false) = (&entry.peers, vendor) {
                        let source = self.cached_source(entry);
                        return Ok(Arc::new(WirelessPeerInfos::from_records(
                            source,
                            records.clone(),
                        )));
                    }
                }
                let peers = self.live().await?.wireless_peer_infos().await?;
                let api = self.system_data().await?.descriptor().api;
                if api == QueryApi::Snmp {
                    let records = peers.records();
                    self.write_back("wireless_peer_infos", |db, mode| {
                        db.store_peers(self.address, &records, mode)
                    });
                }
                Ok::<_, CoreError>(peers)
            })
            .await?;
        Ok(Arc::clone(peers))
    }

    async fn fetch_bgp_peers(&self, remote: Option<IpAddr>) -> Result<BgpPeers, CoreError> {
        self.live().await?.fetch_bgp_peers(remote).await
    }
}
