// ── Device detection ──
//
// Identifies vendor, model and firmware of a device by asking a
// priority-ordered list of detectors. Each detector either matches or
// returns a rejection. An SNMP timeout ends SNMP queries for the address,
// since every further candidate would time out as well; vendor-specific
// candidates are still tried, and the timeout is reported if none match.

mod airos;
mod linux;
mod mikrotik;
mod probe;

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hamlink_api::{SnmpTransport, SnmpVersion, VendorConnector, VendorSession};
use tracing::{debug, info};

use crate::catalog::DeviceCatalog;
use crate::config::{QueryApi, QueryApis};
use crate::error::{CoreError, Rejection};
use crate::handler::{DeviceHandler, HandlerConstructor, HandlerParts};
use crate::model::{DeviceAddress, DeviceDescriptor, SoftwareVersion};

pub use airos::{AirFiberDetector, AirOsDetector, AirOsLegacyDetector};
pub use linux::LinuxDetector;
pub use mikrotik::MikrotikDetector;
pub use probe::SystemProbe;

/// What a detector learned about a device.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub model: String,
    pub version: SoftwareVersion,
}

impl Identification {
    pub fn new(model: impl Into<String>, version: SoftwareVersion) -> Self {
        Self {
            model: model.into(),
            version,
        }
    }
}

/// Outcome of a failed applicability test.
#[derive(Debug)]
pub enum DetectError {
    /// Not this detector's device.
    Rejected(String),
    /// A query failed; terminal if it timed out.
    Transport(hamlink_api::Error),
}

impl DetectError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

impl From<hamlink_api::Error> for DetectError {
    fn from(err: hamlink_api::Error) -> Self {
        Self::Transport(err)
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => f.write_str(reason),
            Self::Transport(err) => write!(f, "{err}"),
        }
    }
}

#[async_trait]
pub trait DeviceDetector: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Higher runs first.
    fn priority(&self) -> i32;

    fn supported_apis(&self) -> QueryApis;

    async fn detect_snmp(
        &self,
        _transport: &dyn SnmpTransport,
        _probe: &SystemProbe,
    ) -> Result<Identification, DetectError> {
        Err(DetectError::rejected("no SNMP detection"))
    }

    async fn detect_vendor_specific(
        &self,
        _address: IpAddr,
        _connector: &dyn VendorConnector,
    ) -> Result<(Identification, Arc<dyn VendorSession>), DetectError> {
        Err(DetectError::rejected("no vendor-specific detection"))
    }
}

#[derive(Debug, Clone)]
struct Registration {
    detector: Arc<dyn DeviceDetector>,
    constructor: HandlerConstructor,
}

/// Explicitly constructed table of detectors and the handlers they create.
#[derive(Debug, Clone, Default)]
pub struct DetectorRegistry {
    entries: Vec<Registration>,
}

/// Inputs of one detection run.
pub struct DetectionRequest<'a> {
    pub transport: Arc<dyn SnmpTransport>,
    pub vendor: Option<&'a dyn VendorConnector>,
    pub allowed_apis: QueryApis,
    /// Version the caller wants to use after detection.
    pub requested_version: SnmpVersion,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detectors for every device family in the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MikrotikDetector), mikrotik::construct);
        registry.register(Arc::new(AirFiberDetector), airos::construct_airfiber);
        registry.register(Arc::new(AirOsDetector), airos::construct_airos);
        registry.register(Arc::new(AirOsLegacyDetector), airos::construct_airos_legacy);
        registry.register(Arc::new(LinuxDetector), linux::construct);
        registry
    }

    /// Adds a detector; order among equal priorities is registration order.
    pub fn register(&mut self, detector: Arc<dyn DeviceDetector>, constructor: HandlerConstructor) {
        self.entries.push(Registration {
            detector,
            constructor,
        });
        self.entries
            .sort_by_key(|entry| std::cmp::Reverse(entry.detector.priority()));
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.detector.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the detection chain and builds the handler of the first match.
    pub async fn detect(
        &self,
        catalog: &dyn DeviceCatalog,
        request: DetectionRequest<'_>,
    ) -> Result<Arc<dyn DeviceHandler>, CoreError> {
        let transport = Arc::clone(&request.transport);
        let address = DeviceAddress::new(transport.target());
        let allowed = request.allowed_apis;
        let vendor = request.vendor.filter(|_| allowed.allows(QueryApi::VendorSpecific));

        transport.set_protocol_version(SnmpVersion::V1);

        let mut snmp = if allowed.allows(QueryApi::Snmp) {
            SnmpAccess::Pending
        } else {
            SnmpAccess::Disabled
        };
        let mut rejections = Vec::new();
        for entry in &self.entries {
            let detector = entry.detector.as_ref();
            let supported = detector.supported_apis();

            if let Some(connector) = vendor.filter(|_| supported.allows(QueryApi::VendorSpecific)) {
                match detector
                    .detect_vendor_specific(address.ip(), connector)
                    .await
                {
                    Ok((identification, session)) => {
                        return build_handler(
                            catalog,
                            &request,
                            entry,
                            identification,
                            QueryApi::VendorSpecific,
                            Some(session),
                            snmp.system().cloned(),
                        );
                    }
                    Err(e) => {
                        debug!(
                            address = %address,
                            detector = detector.name(),
                            reason = %e,
                            "vendor API rejected"
                        );
                        rejections.push(Rejection::new(
                            detector.name(),
                            QueryApi::VendorSpecific,
                            e.to_string(),
                        ));
                    }
                }
            }

            if !supported.allows(QueryApi::Snmp) {
                continue;
            }
            let probe = match snmp.ensure(transport.as_ref()).await {
                Ok(Some(probe)) => probe.clone(),
                Ok(None) => continue,
                Err(reason) => {
                    rejections.push(Rejection::new(detector.name(), QueryApi::Snmp, reason));
                    continue;
                }
            };
            match detector.detect_snmp(transport.as_ref(), &probe).await {
                Ok(identification) => {
                    return build_handler(
                        catalog,
                        &request,
                        entry,
                        identification,
                        QueryApi::Snmp,
                        None,
                        Some(probe),
                    );
                }
                Err(DetectError::Transport(e)) if e.is_timeout() => {
                    debug!(
                        address = %address,
                        detector = detector.name(),
                        "SNMP timed out, no further SNMP probing"
                    );
                    snmp = SnmpAccess::TimedOut(e);
                }
                Err(e) => {
                    debug!(
                        address = %address,
                        detector = detector.name(),
                        reason = %e,
                        "SNMP rejected"
                    );
                    rejections.push(Rejection::new(detector.name(), QueryApi::Snmp, e.to_string()));
                }
            }
        }

        transport.set_protocol_version(request.requested_version);
        if let SnmpAccess::TimedOut(e) = snmp {
            return Err(CoreError::transport(address, e));
        }
        info!(address = %address, candidates = rejections.len(), "no detector matched");
        Err(CoreError::DetectionExhausted {
            address,
            rejections,
        })
    }
}

/// The shared SNMP baseline of one detection run, fetched on first use.
enum SnmpAccess {
    Disabled,
    Pending,
    Ready(SystemProbe),
    /// The exchange failed without timing out; every SNMP candidate is
    /// rejected with this reason.
    Failed(String),
    /// The agent never answered. Vendor-specific candidates still run.
    TimedOut(hamlink_api::Error),
}

impl SnmpAccess {
    fn system(&self) -> Option<&SystemProbe> {
        match self {
            Self::Ready(probe) => Some(probe),
            _ => None,
        }
    }

    /// `Ok(None)` when SNMP is off or already known to be dead.
    async fn ensure(
        &mut self,
        transport: &dyn SnmpTransport,
    ) -> Result<Option<&SystemProbe>, String> {
        if matches!(self, Self::Pending) {
            *self = match SystemProbe::fetch(transport).await {
                Ok(probe) => Self::Ready(probe),
                Err(e) if e.is_timeout() => Self::TimedOut(e),
                Err(e) => Self::Failed(format!("system group query failed: {e}")),
            };
        }
        match &*self {
            Self::Ready(probe) => Ok(Some(probe)),
            Self::Failed(reason) => Err(reason.clone()),
            Self::Disabled | Self::Pending | Self::TimedOut(_) => Ok(None),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_handler(
    catalog: &dyn DeviceCatalog,
    request: &DetectionRequest<'_>,
    entry: &Registration,
    identification: Identification,
    api: QueryApi,
    session: Option<Arc<dyn VendorSession>>,
    probe: Option<SystemProbe>,
) -> Result<Arc<dyn DeviceHandler>, CoreError> {
    let transport = Arc::clone(&request.transport);
    let address = DeviceAddress::new(transport.target());
    let resolved = match catalog.resolve(
        address,
        &identification.model,
        &identification.version,
        request.requested_version,
    ) {
        Ok(resolved) => resolved,
        Err(e) => {
            transport.set_protocol_version(request.requested_version);
            return Err(e);
        }
    };

    let lookup = resolved.lookup;
    let version = request
        .requested_version
        .min(lookup.maximum_protocol_version());
    transport.set_protocol_version(version);

    let descriptor = DeviceDescriptor {
        model: resolved.device.name,
        vendor: resolved.device.vendor,
        version: resolved.version,
        detected_by: entry.detector.name().to_owned(),
        api,
        minimum_protocol_version: lookup.minimum_protocol_version(),
        maximum_protocol_version: lookup.maximum_protocol_version(),
        lookup_tables: lookup.layer_ids(),
        features: resolved.device.features,
    };
    debug!(
        address = %address,
        model = %descriptor.model_and_version(),
        detector = %descriptor.detected_by,
        api = %api,
        protocol = %version,
        "device detected"
    );

    (entry.constructor)(HandlerParts {
        address,
        transport,
        vendor: session,
        descriptor,
        lookup,
        probe,
    })
}
