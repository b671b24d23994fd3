// ── OID resolution ──
//
// A lookup table binds value meanings to concrete OIDs for one device
// model and version range. Devices usually need several tables (vendor
// specifics over a generic MIB-II table); they are consulted in priority
// order and the first table holding a meaning wins outright.

use std::collections::HashMap;
use std::sync::Arc;

use hamlink_api::{Oid, SnmpVersion};
use serde::{Deserialize, Serialize};

use crate::model::ValueMeaning;

/// Query path for one meaning, with an optional factor applied to numeric
/// results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub oid: Oid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<f64>,
}

impl LookupEntry {
    pub fn new(oid: Oid) -> Self {
        Self { oid, scaling: None }
    }

    pub fn scaled(oid: Oid, scaling: f64) -> Self {
        Self {
            oid,
            scaling: Some(scaling),
        }
    }
}

/// Anything that can answer `resolve(meaning)`.
pub trait LookupSource {
    fn lookup(&self, meaning: ValueMeaning) -> Option<&LookupEntry>;
}

/// Returns the entry of the first source that knows `meaning`.
pub fn resolve_first<'a, S>(
    meaning: ValueMeaning,
    sources: impl IntoIterator<Item = &'a S>,
) -> Option<&'a LookupEntry>
where
    S: LookupSource + ?Sized + 'a,
{
    sources.into_iter().find_map(|source| source.lookup(meaning))
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    pub id: u32,
    pub name: String,
    pub minimum_protocol_version: SnmpVersion,
    pub maximum_protocol_version: SnmpVersion,
    pub entries: HashMap<ValueMeaning, LookupEntry>,
}

impl LookupTable {
    pub fn supports(&self, version: SnmpVersion) -> bool {
        self.minimum_protocol_version <= version && version <= self.maximum_protocol_version
    }
}

impl LookupSource for LookupTable {
    fn lookup(&self, meaning: ValueMeaning) -> Option<&LookupEntry> {
        self.entries.get(&meaning)
    }
}

impl LookupSource for Arc<LookupTable> {
    fn lookup(&self, meaning: ValueMeaning) -> Option<&LookupEntry> {
        self.entries.get(&meaning)
    }
}

/// Ordered stack of tables, highest precedence first.
#[derive(Debug, Clone, Default)]
pub struct LayeredLookup {
    layers: Vec<Arc<LookupTable>>,
}

impl LayeredLookup {
    pub fn new(layers: Vec<Arc<LookupTable>>) -> Self {
        Self { layers }
    }

    pub fn resolve(&self, meaning: ValueMeaning) -> Option<&LookupEntry> {
        resolve_first(meaning, &self.layers)
    }

    pub fn contains(&self, meaning: ValueMeaning) -> bool {
        self.resolve(meaning).is_some()
    }

    /// Lowest version every layer supports.
    pub fn minimum_protocol_version(&self) -> SnmpVersion {
        self.layers
            .iter()
            .map(|l| l.minimum_protocol_version)
            .max()
            .unwrap_or(SnmpVersion::V1)
    }

    /// Highest version every layer supports.
    pub fn maximum_protocol_version(&self) -> SnmpVersion {
        self.layers
            .iter()
            .map(|l| l.maximum_protocol_version)
            .min()
            .unwrap_or(SnmpVersion::V3)
    }

    pub fn layer_ids(&self) -> Vec<u32> {
        self.layers.iter().map(|l| l.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table(
        id: u32,
        min: SnmpVersion,
        max: SnmpVersion,
        entries: &[(ValueMeaning, &str)],
    ) -> Arc<LookupTable> {
        Arc::new(LookupTable {
            id,
            name: format!("T{id}"),
            minimum_protocol_version: min,
            maximum_protocol_version: max,
            entries: entries
                .iter()
                .map(|(m, oid)| (*m, LookupEntry::new(oid.parse().unwrap())))
                .collect(),
        })
    }

    #[test]
    fn earlier_layer_wins() {
        let t3 = table(
            3,
            SnmpVersion::V1,
            SnmpVersion::V2c,
            &[(ValueMeaning::InterfaceNameWalkRoot, "1.3.6.1.2.1.31.1.1.1.1")],
        );
        let t1 = table(
            1,
            SnmpVersion::V1,
            SnmpVersion::V3,
            &[
                (ValueMeaning::InterfaceNameWalkRoot, "1.3.6.1.2.1.2.2.1.2"),
                (ValueMeaning::InterfaceIdWalkRoot, "1.3.6.1.2.1.2.2.1.1"),
            ],
        );
        let lookup = LayeredLookup::new(vec![t3, t1]);

        let name = lookup.resolve(ValueMeaning::InterfaceNameWalkRoot).unwrap();
        assert_eq!(name.oid.to_string(), "1.3.6.1.2.1.31.1.1.1.1");
        let id = lookup.resolve(ValueMeaning::InterfaceIdWalkRoot).unwrap();
        assert_eq!(id.oid.to_string(), "1.3.6.1.2.1.2.2.1.1");
        assert!(lookup.resolve(ValueMeaning::CcqImmediate).is_none());
        assert_eq!(lookup.layer_ids(), vec![3, 1]);
    }

    #[test]
    fn protocol_band_is_the_intersection() {
        let lookup = LayeredLookup::new(vec![
            table(2, SnmpVersion::V2c, SnmpVersion::V3, &[]),
            table(1, SnmpVersion::V1, SnmpVersion::V2c, &[]),
        ]);
        assert_eq!(lookup.minimum_protocol_version(), SnmpVersion::V2c);
        assert_eq!(lookup.maximum_protocol_version(), SnmpVersion::V2c);
    }

    #[test]
    fn resolve_first_over_plain_tables() {
        let a = table(1, SnmpVersion::V1, SnmpVersion::V3, &[]);
        let b = table(2, SnmpVersion::V1, SnmpVersion::V3, &[(ValueMeaning::ModelString, "1.2.3")]);
        let hit = resolve_first(ValueMeaning::ModelString, [a.as_ref(), b.as_ref()]);
        assert_eq!(hit.map(|e| e.oid.to_string()).as_deref(), Some("1.2.3"));
    }
}
