use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hamlink_api::{Oid, SnmpTransport, VendorConnector, VendorSession};

use super::{DetectError, DeviceDetector, Identification, SystemProbe};
use crate::config::QueryApis;
use crate::error::CoreError;
use crate::handler::{
    DeviceHandler, HandlerParts, PeerStrategy, RouterOsApiHandler, SnmpDeviceHandler,
};
use crate::model::SoftwareVersion;

const BOARD_NAME: [u32; 12] = [1, 3, 6, 1, 4, 1, 14988, 1, 1, 7, 8, 0];
const FIRMWARE_VERSION: [u32; 12] = [1, 3, 6, 1, 4, 1, 14988, 1, 1, 4, 4, 0];

/// MikroTik RouterOS, over SNMP or the RouterOS API.
#[derive(Debug, Clone, Copy, Default)]
pub struct MikrotikDetector;

#[async_trait]
impl DeviceDetector for MikrotikDetector {
    fn name(&self) -> &'static str {
        "MikroTik RouterOS"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn supported_apis(&self) -> QueryApis {
        QueryApis::ALL
    }

    async fn detect_snmp(
        &self,
        transport: &dyn SnmpTransport,
        probe: &SystemProbe,
    ) -> Result<Identification, DetectError> {
        if !probe.description_starts_with("RouterOS") {
            return Err(DetectError::rejected("sysDescr does not start with 'RouterOS'"));
        }

        // sysDescr is "RouterOS <board>" on most firmware.
        let model = match transport.query_as_string(&Oid::from(&BOARD_NAME[..])).await {
            Ok(model) => model,
            Err(e) if e.is_no_data() => probe
                .description
                .as_deref()
                .and_then(|d| d.split_whitespace().nth(1))
                .map(str::to_owned)
                .ok_or_else(|| DetectError::rejected("no board name"))?,
            Err(e) => return Err(e.into()),
        };
        let raw = match transport
            .query_as_string(&Oid::from(&FIRMWARE_VERSION[..]))
            .await
        {
            Ok(raw) => raw,
            Err(e) if e.is_no_data() => return Err(DetectError::rejected("no firmware version")),
            Err(e) => return Err(e.into()),
        };
        let version = SoftwareVersion::parse_lenient(&raw)
            .ok_or_else(|| DetectError::rejected(format!("unparsable firmware version '{raw}'")))?;
        Ok(Identification::new(model.trim(), version))
    }

    async fn detect_vendor_specific(
        &self,
        address: IpAddr,
        connector: &dyn VendorConnector,
    ) -> Result<(Identification, Arc<dyn VendorSession>), DetectError> {
        let session = connector.connect(address).await?;
        let resource = session
            .run(&["/system/resource/print"])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DetectError::rejected("empty /system/resource reply"))?;

        let model = resource
            .get("board-name")
            .ok_or_else(|| DetectError::rejected("no board-name"))?;
        let raw = resource
            .get("version")
            .ok_or_else(|| DetectError::rejected("no version"))?;
        let version = SoftwareVersion::parse_lenient(raw)
            .ok_or_else(|| DetectError::rejected(format!("unparsable version '{raw}'")))?;
        Ok((Identification::new(model.trim(), version), session))
    }
}

pub(super) fn construct(parts: HandlerParts) -> Result<Arc<dyn DeviceHandler>, CoreError> {
    if parts.vendor.is_some() {
        return Ok(Arc::new(RouterOsApiHandler::new(parts)?));
    }
    Ok(Arc::new(SnmpDeviceHandler::new(parts, PeerStrategy::Mikrotik)))
}
