use std::sync::Arc;

use async_trait::async_trait;
use hamlink_api::SnmpTransport;

use super::{DetectError, DeviceDetector, Identification, SystemProbe};
use crate::config::QueryApis;
use crate::error::CoreError;
use crate::handler::{DeviceHandler, HandlerParts, PeerStrategy, SnmpDeviceHandler};
use crate::model::SoftwareVersion;

/// Generic net-snmp agent on Linux: interfaces only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxDetector;

#[async_trait]
impl DeviceDetector for LinuxDetector {
    fn name(&self) -> &'static str {
        "Linux"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn supported_apis(&self) -> QueryApis {
        QueryApis::SNMP
    }

    /// `sysDescr` is `uname -a`: kernel, host name, release, ...
    async fn detect_snmp(
        &self,
        _transport: &dyn SnmpTransport,
        probe: &SystemProbe,
    ) -> Result<Identification, DetectError> {
        if !probe.description_starts_with("Linux ") {
            return Err(DetectError::rejected("sysDescr does not start with 'Linux'"));
        }
        let release = probe
            .description
            .as_deref()
            .and_then(|d| d.split_whitespace().nth(2))
            .ok_or_else(|| DetectError::rejected("no kernel release in sysDescr"))?;
        let version = SoftwareVersion::parse_lenient(release).ok_or_else(|| {
            DetectError::rejected(format!("unparsable kernel release '{release}'"))
        })?;
        Ok(Identification::new("Linux", version))
    }
}

pub(super) fn construct(parts: HandlerParts) -> Result<Arc<dyn DeviceHandler>, CoreError> {
    Ok(Arc::new(SnmpDeviceHandler::new(parts, PeerStrategy::NoWireless)))
}
