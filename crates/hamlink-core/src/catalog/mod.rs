// ── Device catalog ──
//
// Read-only registry of known device models, their firmware version
// ranges and the lookup tables that apply to each range. Detection only
// yields a model string and a version; everything else comes from here.

mod toml_catalog;

use std::sync::Arc;

use hamlink_api::SnmpVersion;

use crate::error::CoreError;
use crate::model::{DeviceAddress, DeviceFeatures, SoftwareVersion, VersionRange};
use crate::oid_table::{LayeredLookup, LookupTable};

pub use toml_catalog::TomlCatalog;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub id: u32,
    pub name: String,
    pub vendor: String,
    pub features: DeviceFeatures,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionRecord {
    pub device_id: u32,
    pub range: VersionRange,
    /// Highest precedence first.
    pub lookup_table_ids: Vec<u32>,
}

/// A device fully resolved against the catalog.
#[derive(Debug, Clone)]
pub struct ResolvedDevice {
    pub device: DeviceRecord,
    pub version: SoftwareVersion,
    pub lookup: Arc<LayeredLookup>,
}

/// Why a table could not be handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLookupFailure {
    Missing,
    ProtocolMismatch,
}

pub trait DeviceCatalog: Send + Sync + std::fmt::Debug {
    /// Case-insensitive model name lookup.
    fn find_device_id(&self, name: &str) -> Option<u32>;

    fn find_device(&self, id: u32) -> Option<DeviceRecord>;

    /// The unique version row whose `[minimum, maximum)` contains `version`.
    fn find_version_range(&self, device_id: u32, version: &SoftwareVersion)
    -> Option<VersionRecord>;

    fn find_lookup_table_ids(&self, record: &VersionRecord) -> Vec<u32> {
        record.lookup_table_ids.clone()
    }

    /// Table `id`, provided its protocol band overlaps `[minimum, maximum]`.
    fn find_lookup_table(
        &self,
        id: u32,
        minimum: SnmpVersion,
        maximum: SnmpVersion,
    ) -> Result<Arc<LookupTable>, TableLookupFailure>;

    /// Runs the four lookups for a detected device. Every failure names
    /// what could not be resolved.
    fn resolve(
        &self,
        address: DeviceAddress,
        model: &str,
        version: &SoftwareVersion,
        requested: SnmpVersion,
    ) -> Result<ResolvedDevice, CoreError> {
        let device = self
            .find_device_id(model)
            .and_then(|id| self.find_device(id))
            .ok_or_else(|| CoreError::UnknownDevice {
                address,
                model: model.to_owned(),
            })?;
        let record = self
            .find_version_range(device.id, version)
            .ok_or_else(|| CoreError::UnsupportedVersion {
                address,
                model: device.name.clone(),
                version: version.to_string(),
            })?;

        let ids = self.find_lookup_table_ids(&record);
        if ids.is_empty() {
            return Err(CoreError::NoLookupTables {
                address,
                model: device.name,
                version: version.to_string(),
            });
        }

        let mut layers = Vec::with_capacity(ids.len());
        for table_id in ids {
            let table = self
                .find_lookup_table(table_id, SnmpVersion::V1, requested)
                .map_err(|failure| match failure {
                    TableLookupFailure::Missing => CoreError::MissingLookupTable {
                        address,
                        model: device.name.clone(),
                        version: version.to_string(),
                        table_id,
                    },
                    TableLookupFailure::ProtocolMismatch => CoreError::ProtocolMismatch {
                        address,
                        model: device.name.clone(),
                        version: version.to_string(),
                        table_id,
                        requested: requested.to_string(),
                    },
                })?;
            layers.push(table);
        }

        Ok(ResolvedDevice {
            device,
            version: version.clone(),
            lookup: Arc::new(LayeredLookup::new(layers)),
        })
    }
}
