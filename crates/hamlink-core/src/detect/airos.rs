// Ubiquiti radios. AirOS firmware changed its station MIB in 5.6, so
// old and new firmware are separate detectors over the same probe.

use std::sync::Arc;

use async_trait::async_trait;
use hamlink_api::{Oid, SnmpTransport};

use super::{DetectError, DeviceDetector, Identification, SystemProbe};
use crate::config::QueryApis;
use crate::error::CoreError;
use crate::handler::{DeviceHandler, HandlerParts, PeerStrategy, SnmpDeviceHandler};
use crate::model::SoftwareVersion;

const UBNT_ENTERPRISE: [u32; 7] = [1, 3, 6, 1, 4, 1, 41112];
const FROGFOOT_ENTERPRISE: [u32; 7] = [1, 3, 6, 1, 4, 1, 10002];
const DOT11_PRODUCT_NAME: [u32; 9] = [1, 2, 840, 10036, 3, 1, 2, 1, 3];
const DOT11_PRODUCT_VERSION: [u32; 9] = [1, 2, 840, 10036, 3, 1, 2, 1, 4];
const AIRFIBER_FIRMWARE: [u32; 13] = [1, 3, 6, 1, 4, 1, 41112, 1, 3, 2, 1, 40, 1];

fn station_mib_release() -> SoftwareVersion {
    SoftwareVersion::new([5, 6])
}

fn is_ubiquiti(probe: &SystemProbe) -> bool {
    probe.object_id_under(&UBNT_ENTERPRISE) || probe.object_id_under(&FROGFOOT_ENTERPRISE)
}

async fn first_text(
    transport: &dyn SnmpTransport,
    root: &[u32],
) -> Result<Option<String>, DetectError> {
    let rows = transport.walk(&Oid::from(root)).await?;
    Ok(rows
        .iter()
        .find_map(|vb| vb.value.as_text())
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty()))
}

async fn identify_airos(
    transport: &dyn SnmpTransport,
    probe: &SystemProbe,
) -> Result<Identification, DetectError> {
    if !is_ubiquiti(probe) {
        return Err(DetectError::rejected("sysObjectID is not a Ubiquiti agent"));
    }
    let model = first_text(transport, &DOT11_PRODUCT_NAME)
        .await?
        .ok_or_else(|| DetectError::rejected("no IEEE 802.11 product name"))?;
    let raw = first_text(transport, &DOT11_PRODUCT_VERSION)
        .await?
        .ok_or_else(|| DetectError::rejected("no IEEE 802.11 product version"))?;
    let version = SoftwareVersion::parse_lenient(&raw)
        .ok_or_else(|| DetectError::rejected(format!("unparsable firmware '{raw}'")))?;
    Ok(Identification::new(model, version))
}

/// AirOS 5.6 and later.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirOsDetector;

#[async_trait]
impl DeviceDetector for AirOsDetector {
    fn name(&self) -> &'static str {
        "Ubiquiti AirOS"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn supported_apis(&self) -> QueryApis {
        QueryApis::SNMP
    }

    async fn detect_snmp(
        &self,
        transport: &dyn SnmpTransport,
        probe: &SystemProbe,
    ) -> Result<Identification, DetectError> {
        let identification = identify_airos(transport, probe).await?;
        if identification.version < station_mib_release() {
            return Err(DetectError::rejected(format!(
                "firmware {} predates 5.6",
                identification.version
            )));
        }
        Ok(identification)
    }
}

/// AirOS before 5.6.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirOsLegacyDetector;

#[async_trait]
impl DeviceDetector for AirOsLegacyDetector {
    fn name(&self) -> &'static str {
        "Ubiquiti AirOS (pre 5.6)"
    }

    fn priority(&self) -> i32 {
        89
    }

    fn supported_apis(&self) -> QueryApis {
        QueryApis::SNMP
    }

    async fn detect_snmp(
        &self,
        transport: &dyn SnmpTransport,
        probe: &SystemProbe,
    ) -> Result<Identification, DetectError> {
        let identification = identify_airos(transport, probe).await?;
        if identification.version >= station_mib_release() {
            return Err(DetectError::rejected(format!(
                "firmware {} has the 5.6 station table",
                identification.version
            )));
        }
        Ok(identification)
    }
}

/// airFiber; model and firmware share one string such as `AF24.v4.1.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirFiberDetector;

#[async_trait]
impl DeviceDetector for AirFiberDetector {
    fn name(&self) -> &'static str {
        "Ubiquiti airFiber"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn supported_apis(&self) -> QueryApis {
        QueryApis::SNMP
    }

    async fn detect_snmp(
        &self,
        transport: &dyn SnmpTransport,
        probe: &SystemProbe,
    ) -> Result<Identification, DetectError> {
        if !is_ubiquiti(probe) {
            return Err(DetectError::rejected("sysObjectID is not a Ubiquiti agent"));
        }
        let raw = match transport
            .query_as_string(&Oid::from(&AIRFIBER_FIRMWARE[..]))
            .await
        {
            Ok(raw) => raw,
            Err(e) if e.is_no_data() => {
                return Err(DetectError::rejected("no airFiber firmware string"));
            }
            Err(e) => return Err(e.into()),
        };
        let model = raw
            .split('.')
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| DetectError::rejected(format!("no model in '{raw}'")))?;
        let version = SoftwareVersion::parse_lenient(&raw)
            .ok_or_else(|| DetectError::rejected(format!("unparsable firmware '{raw}'")))?;
        Ok(Identification::new(model, version))
    }
}

pub(super) fn construct_airos(parts: HandlerParts) -> Result<Arc<dyn DeviceHandler>, CoreError> {
    Ok(Arc::new(SnmpDeviceHandler::new(parts, PeerStrategy::UbiquitiAirOs)))
}

pub(super) fn construct_airos_legacy(
    parts: HandlerParts,
) -> Result<Arc<dyn DeviceHandler>, CoreError> {
    Ok(Arc::new(SnmpDeviceHandler::new(
        parts,
        PeerStrategy::UbiquitiAirOsLegacy,
    )))
}

pub(super) fn construct_airfiber(
    parts: HandlerParts,
) -> Result<Arc<dyn DeviceHandler>, CoreError> {
    Ok(Arc::new(SnmpDeviceHandler::new(parts, PeerStrategy::AirFiber)))
}
