// ── Querier ──
//
// Facade over detection, handlers, link correlation and the cache. All
// collaborators are passed in; nothing here is process-global.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use hamlink_api::{SnmpTransport, TransportConfig, UdpTransport, VendorConnector};
use tracing::{debug, warn};

use crate::cache::{
    CacheDatabase, CacheMaintenance, CacheStatistics, CachingDeviceHandler, HandlerSource,
    MaintenanceReport,
};
use crate::catalog::DeviceCatalog;
use crate::config::QuerierOptions;
use crate::containers::{BgpPeers, InterfaceDetails, SystemData, WirelessPeerInfos};
use crate::detect::{DetectionRequest, DetectorRegistry};
use crate::error::CoreError;
use crate::handler::DeviceHandler;
use crate::link::{LinkDetails, correlate};
use crate::model::DeviceAddress;

/// Opens a transport towards one device.
pub trait TransportFactory: Send + Sync + fmt::Debug {
    fn create(&self, address: DeviceAddress) -> Result<Arc<dyn SnmpTransport>, CoreError>;
}

/// Real UDP sessions with a fixed configuration.
#[derive(Debug, Clone)]
pub struct UdpTransportFactory {
    config: TransportConfig,
}

impl UdpTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for UdpTransportFactory {
    fn create(&self, address: DeviceAddress) -> Result<Arc<dyn SnmpTransport>, CoreError> {
        Ok(Arc::new(UdpTransport::new(address.ip(), self.config.clone())))
    }
}

/// Entry point for every query operation.
#[derive(Clone)]
pub struct Querier {
    options: Arc<QuerierOptions>,
    registry: Arc<DetectorRegistry>,
    catalog: Arc<dyn DeviceCatalog>,
    transports: Arc<dyn TransportFactory>,
    vendor: Option<Arc<dyn VendorConnector>>,
    cache: Option<CacheDatabase>,
}

impl fmt::Debug for Querier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Querier")
            .field("detectors", &self.registry.detector_names())
            .field("vendor", &self.vendor.is_some())
            .field("cache", &self.cache.as_ref().map(CacheDatabase::path))
            .finish_non_exhaustive()
    }
}

impl Querier {
    /// The vendor connector is derived from the options; use
    /// [`with_vendor_connector`](Self::with_vendor_connector) to replace it.
    pub fn new(
        options: QuerierOptions,
        registry: DetectorRegistry,
        catalog: Arc<dyn DeviceCatalog>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        let vendor = options
            .vendor_connector()
            .map(|c| Arc::new(c) as Arc<dyn VendorConnector>);
        Self {
            options: Arc::new(options),
            registry: Arc::new(registry),
            catalog,
            transports,
            vendor,
            cache: None,
        }
    }

    /// Attaches the cache store; it is only consulted when caching is
    /// enabled in the options.
    pub fn with_cache(mut self, db: CacheDatabase) -> Self {
        self.cache = Some(db);
        self
    }

    pub fn with_vendor_connector(mut self, connector: Arc<dyn VendorConnector>) -> Self {
        self.vendor = Some(connector);
        self
    }

    pub fn options(&self) -> &QuerierOptions {
        &self.options
    }

    fn caching(&self) -> Option<&CacheDatabase> {
        self.cache.as_ref().filter(|_| self.options.enable_caching)
    }

    /// Handler for `address`: cache-backed when caching is enabled,
    /// otherwise freshly detected.
    pub async fn handler(
        &self,
        address: DeviceAddress,
    ) -> Result<Arc<dyn DeviceHandler>, CoreError> {
        let transport = self.transports.create(address)?;
        let source = Arc::new(DetectingSource {
            querier: self.clone(),
            transport: Arc::clone(&transport),
        });
        match self.caching() {
            Some(db) => Ok(Arc::new(CachingDeviceHandler::new(
                address,
                db.clone(),
                self.options.cache_validity,
                transport,
                source,
            ))),
            None => source.create(address).await,
        }
    }

    // ── Per-device views ────────────────────────────────────────────

    pub async fn system_data(&self, address: DeviceAddress) -> Result<Arc<SystemData>, CoreError> {
        self.handler(address).await?.system_data().await
    }

    pub async fn network_interface_details(
        &self,
        address: DeviceAddress,
    ) -> Result<Arc<InterfaceDetails>, CoreError> {
        self.handler(address).await?.network_interface_details().await
    }

    pub async fn wireless_peer_infos(
        &self,
        address: DeviceAddress,
    ) -> Result<Arc<WirelessPeerInfos>, CoreError> {
        self.handler(address).await?.wireless_peer_infos().await
    }

    pub async fn fetch_bgp_peers(
        &self,
        address: DeviceAddress,
        remote: Option<IpAddr>,
    ) -> Result<BgpPeers, CoreError> {
        self.handler(address).await?.fetch_bgp_peers(remote).await
    }

    // ── Links ───────────────────────────────────────────────────────

    /// Correlates `a` with each of `others`, concurrently.
    ///
    /// Fails only when every pairing fails; individual failures are logged
    /// and the remaining details are merged.
    pub async fn fetch_link_details(
        &self,
        a: DeviceAddress,
        others: &[DeviceAddress],
    ) -> Result<LinkDetails, CoreError> {
        let handler_a = self.handler(a).await?;
        let results = join_all(others.iter().map(|&b| {
            let handler_a = Arc::clone(&handler_a);
            async move {
                let handler_b = self.handler(b).await?;
                correlate(handler_a.as_ref(), handler_b.as_ref()).await
            }
        }))
        .await;

        let mut merged = LinkDetails::default();
        let mut first_error = None;
        let mut succeeded = 0usize;
        for (b, result) in others.iter().zip(results) {
            match result {
                Ok(details) => {
                    succeeded += 1;
                    merged.merge(details);
                }
                Err(e) => {
                    warn!(a = %a, b = %b, error = %e, "link correlation failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => {
                debug!(a = %a, links = merged.details.len(), "link details fetched");
                Ok(merged)
            }
        }
    }

    // ── Cache maintenance ───────────────────────────────────────────

    pub fn maintenance(&self) -> Result<CacheMaintenance, CoreError> {
        self.cache
            .clone()
            .map(CacheMaintenance::new)
            .ok_or_else(|| CoreError::Cache {
                message: "no cache database configured".into(),
            })
    }

    pub fn invalidate(
        &self,
        addresses: &[DeviceAddress],
        dry_run: bool,
    ) -> Result<MaintenanceReport, CoreError> {
        self.maintenance()?.invalidate(addresses, dry_run)
    }

    pub fn purge_older_than(
        &self,
        age: Duration,
        dry_run: bool,
    ) -> Result<MaintenanceReport, CoreError> {
        self.maintenance()?.purge_older_than(age, dry_run)
    }

    pub fn statistics(&self) -> Result<CacheStatistics, CoreError> {
        self.maintenance()?.statistics()
    }
}

/// Runs detection over one transport.
#[derive(Debug)]
struct DetectingSource {
    querier: Querier,
    transport: Arc<dyn SnmpTransport>,
}

#[async_trait]
impl HandlerSource for DetectingSource {
    async fn create(&self, address: DeviceAddress) -> Result<Arc<dyn DeviceHandler>, CoreError> {
        let querier = &self.querier;
        debug!(address = %address, "running device detection");
        querier
            .registry
            .detect(
                querier.catalog.as_ref(),
                DetectionRequest {
                    transport: Arc::clone(&self.transport),
                    vendor: querier.vendor.as_deref(),
                    allowed_apis: querier.options.effective_apis(),
                    requested_version: querier.options.protocol_version,
                },
            )
            .await
    }
}
