use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use hamlink_api::SnmpVersion;
use serde::Deserialize;
use tracing::debug;

use super::{DeviceCatalog, DeviceRecord, TableLookupFailure, VersionRecord};
use crate::error::CoreError;
use crate::model::{DeviceFeatures, SoftwareVersion, ValueMeaning, VersionRange};
use crate::oid_table::{LookupEntry, LookupTable};

const BUILTIN: &str = include_str!("devices.toml");

// ── File format ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    tables: Vec<TableSpec>,
    #[serde(default)]
    families: Vec<FamilySpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableSpec {
    id: u32,
    name: String,
    minimum_protocol_version: SnmpVersion,
    maximum_protocol_version: SnmpVersion,
    #[serde(default)]
    entries: HashMap<String, LookupEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FamilySpec {
    vendor: String,
    models: Vec<String>,
    #[serde(default)]
    features: Vec<String>,
    versions: Vec<VersionSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VersionSpec {
    minimum: SoftwareVersion,
    maximum: SoftwareVersion,
    lookup_tables: Vec<u32>,
}

// ── Catalog ─────────────────────────────────────────────────────────

/// Device catalog loaded from TOML.
///
/// Tables are validated at load time but only turned into
/// [`LookupTable`]s when first requested; built tables are shared.
#[derive(Debug)]
pub struct TomlCatalog {
    devices: Vec<DeviceRecord>,
    names: HashMap<String, u32>,
    versions: HashMap<u32, Vec<VersionRecord>>,
    specs: HashMap<u32, TableSpec>,
    built: DashMap<u32, Arc<LookupTable>>,
}

impl TomlCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_toml(BUILTIN)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            message: format!("cannot read device catalog {}: {e}", path.display()),
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, CoreError> {
        let file: CatalogFile = toml::from_str(text).map_err(|e| CoreError::Config {
            message: format!("invalid device catalog: {e}"),
        })?;

        let mut specs = HashMap::new();
        for table in file.tables {
            for key in table.entries.keys() {
                key.parse::<ValueMeaning>().map_err(|_| CoreError::Config {
                    message: format!("table {}: unknown value meaning '{key}'", table.id),
                })?;
            }
            if table.minimum_protocol_version > table.maximum_protocol_version {
                return Err(CoreError::Config {
                    message: format!("table {}: empty protocol version band", table.id),
                });
            }
            let id = table.id;
            if specs.insert(id, table).is_some() {
                return Err(CoreError::Config {
                    message: format!("duplicate lookup table id {id}"),
                });
            }
        }

        let mut devices = Vec::new();
        let mut names = HashMap::new();
        let mut versions = HashMap::new();
        for family in file.families {
            let features = parse_features(&family.features)?;
            let rows: Vec<(VersionRange, Vec<u32>)> = family
                .versions
                .into_iter()
                .map(|v| (VersionRange::new(v.minimum, v.maximum), v.lookup_tables))
                .collect();
            check_ranges(&family.vendor, &rows)?;

            for model in family.models {
                let id = u32::try_from(devices.len()).map_err(|_| CoreError::Config {
                    message: "too many device models".into(),
                })?;
                if names.insert(model.to_lowercase(), id).is_some() {
                    return Err(CoreError::Config {
                        message: format!("model '{model}' listed twice"),
                    });
                }
                versions.insert(
                    id,
                    rows.iter()
                        .map(|(range, tables)| VersionRecord {
                            device_id: id,
                            range: range.clone(),
                            lookup_table_ids: tables.clone(),
                        })
                        .collect(),
                );
                devices.push(DeviceRecord {
                    id,
                    name: model,
                    vendor: family.vendor.clone(),
                    features,
                });
            }
        }

        debug!(
            devices = devices.len(),
            tables = specs.len(),
            "device catalog loaded"
        );
        Ok(Self {
            devices,
            names,
            versions,
            specs,
            built: DashMap::new(),
        })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn build(spec: &TableSpec) -> LookupTable {
        LookupTable {
            id: spec.id,
            name: spec.name.clone(),
            minimum_protocol_version: spec.minimum_protocol_version,
            maximum_protocol_version: spec.maximum_protocol_version,
            entries: spec
                .entries
                .iter()
                .filter_map(|(key, entry)| Some((key.parse().ok()?, entry.clone())))
                .collect(),
        }
    }
}

fn parse_features(names: &[String]) -> Result<DeviceFeatures, CoreError> {
    names
        .iter()
        .try_fold(DeviceFeatures::NONE, |acc, name| {
            match name.to_ascii_lowercase().as_str() {
                "rssi" => Ok(acc | DeviceFeatures::RSSI),
                "bgp" => Ok(acc | DeviceFeatures::BGP),
                other => Err(CoreError::Config {
                    message: format!("unknown device feature '{other}'"),
                }),
            }
        })
}

/// Version rows of one family must not overlap, or a version would match
/// more than one row.
fn check_ranges(vendor: &str, rows: &[(VersionRange, Vec<u32>)]) -> Result<(), CoreError> {
    for (idx, (a, _)) in rows.iter().enumerate() {
        if a.minimum >= a.maximum {
            return Err(CoreError::Config {
                message: format!("{vendor}: empty version range {a}"),
            });
        }
        for (b, _) in &rows[idx + 1..] {
            if a.minimum < b.maximum && b.minimum < a.maximum {
                return Err(CoreError::Config {
                    message: format!("{vendor}: version ranges {a} and {b} overlap"),
                });
            }
        }
    }
    Ok(())
}

impl DeviceCatalog for TomlCatalog {
    fn find_device_id(&self, name: &str) -> Option<u32> {
        self.names.get(&name.trim().to_lowercase()).copied()
    }

    fn find_device(&self, id: u32) -> Option<DeviceRecord> {
        self.devices.iter().find(|d| d.id == id).cloned()
    }

    fn find_version_range(
        &self,
        device_id: u32,
        version: &SoftwareVersion,
    ) -> Option<VersionRecord> {
        self.versions
            .get(&device_id)?
            .iter()
            .find(|record| record.range.contains(version))
            .cloned()
    }

    fn find_lookup_table(
        &self,
        id: u32,
        minimum: SnmpVersion,
        maximum: SnmpVersion,
    ) -> Result<Arc<LookupTable>, TableLookupFailure> {
        let cached = self.built.get(&id).map(|t| Arc::clone(t.value()));
        let table = match cached {
            Some(table) => table,
            None => {
                let spec = self.specs.get(&id).ok_or(TableLookupFailure::Missing)?;
                Arc::clone(
                    self.built
                        .entry(id)
                        .or_insert_with(|| Arc::new(Self::build(spec)))
                        .value(),
                )
            }
        };

        let overlaps = table.minimum_protocol_version <= maximum
            && minimum <= table.maximum_protocol_version;
        if overlaps {
            Ok(table)
        } else {
            Err(TableLookupFailure::ProtocolMismatch)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn v(s: &str) -> SoftwareVersion {
        s.parse().unwrap()
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = TomlCatalog::builtin().unwrap();
        assert!(catalog.device_count() > 20);
        assert!(catalog.find_device_id("rocket m5").is_some());
        assert!(catalog.find_device_id("ROCKET M5").is_some());
        assert!(catalog.find_device_id("Rocket M9").is_none());
    }

    #[test]
    fn version_rows_select_table_stacks() {
        let catalog = TomlCatalog::builtin().unwrap();
        let id = catalog.find_device_id("RB912UAG-5HPnD").unwrap();

        let old = catalog.find_version_range(id, &v("6.39.3")).unwrap();
        assert_eq!(catalog.find_lookup_table_ids(&old), vec![2, 1]);
        let new = catalog.find_version_range(id, &v("6.45.9 (long-term)")).unwrap();
        assert_eq!(catalog.find_lookup_table_ids(&new), vec![3, 2, 1]);
        assert!(catalog.find_version_range(id, &v("5.26")).is_none());
    }

    #[test]
    fn tables_are_built_once_and_shared() {
        let catalog = TomlCatalog::builtin().unwrap();
        let a = catalog
            .find_lookup_table(1, SnmpVersion::V1, SnmpVersion::V2c)
            .unwrap();
        let b = catalog
            .find_lookup_table(1, SnmpVersion::V1, SnmpVersion::V2c)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(
            catalog.find_lookup_table(99, SnmpVersion::V1, SnmpVersion::V3),
            Err(TableLookupFailure::Missing)
        );
        assert_eq!(
            catalog.find_lookup_table(2, SnmpVersion::V3, SnmpVersion::V3),
            Err(TableLookupFailure::ProtocolMismatch)
        );
    }

    #[test]
    fn rejects_overlapping_version_rows() {
        let text = r#"
            [[families]]
            vendor = "Test"
            models = ["X"]
            versions = [
                { minimum = "1.0", maximum = "2.0", lookup_tables = [] },
                { minimum = "1.5", maximum = "3.0", lookup_tables = [] },
            ]
        "#;
        let err = TomlCatalog::from_toml(text).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn rejects_unknown_meanings() {
        let text = r#"
            [[tables]]
            id = 1
            name = "bad"
            minimum_protocol_version = "v1"
            maximum_protocol_version = "v2c"
            entries = { SignalToNoise = { oid = "1.2.3" } }
        "#;
        let err = TomlCatalog::from_toml(text).unwrap_err();
        assert!(err.to_string().contains("SignalToNoise"));
    }
}
