// ── Network interfaces ──
//
// The id list is walked when the container is built; type, MAC and name
// are lazy per interface. A missing attribute leaves that attribute
// unavailable and never fails the list.

use std::collections::HashMap;
use std::time::Duration;

use hamlink_api::{Oid, SnmpValue};
use serde::{Deserialize, Serialize};

use super::lazy::LazyValue;
use super::query::ValueQuery;
use super::source::FieldSource;
use crate::error::CoreError;
use crate::model::{InterfaceType, MacAddress, ValueMeaning};
use crate::oid_table::LayeredLookup;

/// Settled view of one interface; also the cached form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSnapshot {
    pub id: u32,
    #[serde(rename = "type")]
    pub if_type: Option<InterfaceType>,
    pub mac: Option<MacAddress>,
    pub name: Option<String>,
}

#[derive(Debug)]
struct InterfaceQueries {
    if_type: ValueQuery,
    mac: ValueQuery,
    name: ValueQuery,
}

#[derive(Debug)]
pub struct InterfaceDetail {
    id: u32,
    source: FieldSource,
    queries: InterfaceQueries,
    if_type: LazyValue<InterfaceType>,
    mac: LazyValue<MacAddress>,
    name: LazyValue<String>,
}

impl InterfaceDetail {
    fn live(source: FieldSource, lookup: &LayeredLookup, id: u32) -> Self {
        Self {
            id,
            source,
            queries: InterfaceQueries {
                if_type: ValueQuery::resolve(lookup, ValueMeaning::InterfaceTypeWalkRoot, &[id]),
                mac: ValueQuery::resolve(lookup, ValueMeaning::InterfaceMacWalkRoot, &[id]),
                name: ValueQuery::resolve(lookup, ValueMeaning::InterfaceNameWalkRoot, &[id]),
            },
            if_type: LazyValue::new(),
            mac: LazyValue::new(),
            name: LazyValue::new(),
        }
    }

    fn resolved(source: FieldSource, snapshot: InterfaceSnapshot) -> Self {
        Self {
            id: snapshot.id,
            source,
            queries: InterfaceQueries {
                if_type: ValueQuery::Unsupported,
                mac: ValueQuery::Unsupported,
                name: ValueQuery::Unsupported,
            },
            if_type: LazyValue::resolved(snapshot.if_type),
            mac: LazyValue::resolved(snapshot.mac),
            name: LazyValue::resolved(snapshot.name),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub async fn if_type(&self) -> Option<InterfaceType> {
        self.if_type
            .get_or_fetch(|| {
                self.source
                    .fetch("interface_type", &self.queries.if_type, |q, v| {
                        q.decode_int(v).map(InterfaceType::from)
                    })
            })
            .await
            .copied()
    }

    pub async fn mac(&self) -> Option<MacAddress> {
        self.mac
            .get_or_fetch(|| {
                self.source
                    .fetch("interface_mac", &self.queries.mac, ValueQuery::decode_mac)
            })
            .await
            .copied()
    }

    pub async fn name(&self) -> Option<String> {
        self.name
            .get_or_fetch(|| {
                self.source
                    .fetch("interface_name", &self.queries.name, ValueQuery::decode_text)
            })
            .await
            .cloned()
    }

    /// Settled MAC without fetching.
    pub fn known_mac(&self) -> Option<MacAddress> {
        self.mac.peek().copied()
    }

    pub fn known_name(&self) -> Option<&str> {
        self.name.peek().map(String::as_str)
    }

    pub fn known_type(&self) -> Option<InterfaceType> {
        self.if_type.peek().copied()
    }

    /// Radio interface by type, or by the names vendors give them.
    pub fn looks_wireless(&self) -> bool {
        if self.known_type().is_some_and(InterfaceType::is_wireless) {
            return true;
        }
        self.known_name().is_some_and(|name| {
            let name = name.to_ascii_lowercase();
            ["wlan", "ath", "air", "wifi"]
                .iter()
                .any(|prefix| name.starts_with(prefix))
        })
    }

    fn pending(&self) -> Vec<Oid> {
        let mut oids = Vec::new();
        if !self.if_type.is_fetched() {
            oids.extend(self.queries.if_type.oids());
        }
        if !self.mac.is_fetched() {
            oids.extend(self.queries.mac.oids());
        }
        if !self.name.is_fetched() {
            oids.extend(self.queries.name.oids());
        }
        oids
    }

    fn settle(&self, values: &HashMap<Oid, SnmpValue>) {
        self.if_type
            .fill(self.queries.if_type.decode_int(values).map(InterfaceType::from));
        self.mac.fill(self.queries.mac.decode_mac(values));
        self.name.fill(self.queries.name.decode_text(values));
    }

    pub fn snapshot(&self) -> InterfaceSnapshot {
        InterfaceSnapshot {
            id: self.id,
            if_type: self.known_type(),
            mac: self.known_mac(),
            name: self.name.peek().cloned(),
        }
    }
}

#[derive(Debug)]
pub struct InterfaceDetails {
    source: FieldSource,
    details: Vec<InterfaceDetail>,
}

impl InterfaceDetails {
    /// Walks the interface id column. A device without one has no
    /// interfaces; a failing walk fails the container.
    pub async fn load(source: FieldSource, lookup: &LayeredLookup) -> Result<Self, CoreError> {
        let Some(root) = lookup.resolve(ValueMeaning::InterfaceIdWalkRoot) else {
            return Ok(Self {
                source,
                details: Vec::new(),
            });
        };
        let root = root.oid.clone();
        let rows = source.walk(&root).await?;

        let mut ids: Vec<u32> = rows
            .iter()
            .filter_map(|vb| {
                vb.value
                    .as_i64()
                    .and_then(|id| u32::try_from(id).ok())
                    .or_else(|| match vb.oid.suffix_after(&root)? {
                        [id] => Some(*id),
                        _ => None,
                    })
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let details = ids
            .into_iter()
            .map(|id| InterfaceDetail::live(source.clone(), lookup, id))
            .collect();
        Ok(Self { source, details })
    }

    pub fn resolved(source: FieldSource, snapshots: Vec<InterfaceSnapshot>) -> Self {
        let details = snapshots
            .into_iter()
            .map(|snapshot| InterfaceDetail::resolved(source.clone(), snapshot))
            .collect();
        Self { source, details }
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterfaceDetail> {
        self.details.iter()
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn find_by_id(&self, id: u32) -> Option<&InterfaceDetail> {
        self.details.iter().find(|d| d.id == id)
    }

    /// Only considers MACs already settled.
    pub fn find_by_mac(&self, mac: MacAddress) -> Option<&InterfaceDetail> {
        self.details.iter().find(|d| d.known_mac() == Some(mac))
    }

    pub fn query_duration(&self) -> Duration {
        self.source.timer().total()
    }

    /// Settles every attribute of every interface in batched requests.
    pub async fn force_evaluate_all(&self) {
        let oids: Vec<Oid> = self.details.iter().flat_map(InterfaceDetail::pending).collect();
        let values = if oids.is_empty() {
            HashMap::new()
        } else {
            match self.source.values(&oids).await {
                Ok(values) => values,
                Err(e) => {
                    self.source.log_failure("interfaces", &e);
                    HashMap::new()
                }
            }
        };
        for detail in &self.details {
            detail.settle(&values);
        }
    }

    pub fn snapshots(&self) -> Vec<InterfaceSnapshot> {
        self.details.iter().map(InterfaceDetail::snapshot).collect()
    }
}
