// ── System data ──
//
// Identity of one device. The descriptor is settled by detection; the
// MIB-II system group is read lazily. Uptime is volatile and is never
// written to the cache.

use std::time::Duration;

use hamlink_api::Oid;
use serde::{Deserialize, Serialize};

use super::lazy::LazyValue;
use super::query::ValueQuery;
use super::source::FieldSource;
use crate::detect::SystemProbe;
use crate::model::{DeviceAddress, DeviceDescriptor};

pub(crate) mod mib {
    pub const SYS_DESCR: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 1, 0];
    pub const SYS_OBJECT_ID: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 2, 0];
    pub const SYS_UPTIME: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 3, 0];
    pub const SYS_CONTACT: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 4, 0];
    pub const SYS_NAME: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 5, 0];
    pub const SYS_LOCATION: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 6, 0];
}

fn scalar(arcs: &[u32]) -> ValueQuery {
    ValueQuery::Scalar {
        oid: Oid::from(arcs),
        scaling: None,
    }
}

/// Non-volatile part of [`SystemData`], as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub descriptor: DeviceDescriptor,
    pub description: Option<String>,
    pub object_id: Option<Oid>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub location: Option<String>,
}

/// Fully evaluated view for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub address: DeviceAddress,
    #[serde(flatten)]
    pub record: SystemRecord,
    pub uptime_secs: Option<u64>,
}

#[derive(Debug)]
pub struct SystemData {
    source: FieldSource,
    descriptor: DeviceDescriptor,
    description: LazyValue<String>,
    object_id: LazyValue<Oid>,
    name: LazyValue<String>,
    contact: LazyValue<String>,
    location: LazyValue<String>,
    uptime: LazyValue<Duration>,
}

impl SystemData {
    /// Live container; description and object id come from the detection
    /// probe when one was taken.
    pub fn live(
        source: FieldSource,
        descriptor: DeviceDescriptor,
        probe: Option<&SystemProbe>,
    ) -> Self {
        let data = Self {
            source,
            descriptor,
            description: LazyValue::new(),
            object_id: LazyValue::new(),
            name: LazyValue::new(),
            contact: LazyValue::new(),
            location: LazyValue::new(),
            uptime: LazyValue::new(),
        };
        if let Some(probe) = probe {
            data.description.fill(probe.description.clone());
            data.object_id.fill(probe.object_id.clone());
        }
        data
    }

    /// Restores a cached record. Uptime is still read live through
    /// `source` when it has a transport.
    pub fn from_record(source: FieldSource, record: SystemRecord) -> Self {
        Self {
            source,
            descriptor: record.descriptor,
            description: LazyValue::resolved(record.description),
            object_id: LazyValue::resolved(record.object_id),
            name: LazyValue::resolved(record.name),
            contact: LazyValue::resolved(record.contact),
            location: LazyValue::resolved(record.location),
            uptime: LazyValue::new(),
        }
    }

    /// Every field known up front.
    pub fn resolved(
        source: FieldSource,
        record: SystemRecord,
        uptime: Option<Duration>,
    ) -> Self {
        let data = Self::from_record(source, record);
        data.uptime.fill(uptime);
        data
    }

    pub fn address(&self) -> DeviceAddress {
        self.source.address()
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn model(&self) -> &str {
        &self.descriptor.model
    }

    pub fn model_and_version(&self) -> String {
        self.descriptor.model_and_version()
    }

    pub fn query_duration(&self) -> Duration {
        self.source.timer().total()
    }

    // ── Lazy fields ─────────────────────────────────────────────────

    async fn text(
        &self,
        field: &'static str,
        slot: &LazyValue<String>,
        arcs: &[u32],
    ) -> Option<String> {
        slot.get_or_fetch(|| async move {
            let query = scalar(arcs);
            self.source.fetch(field, &query, ValueQuery::decode_text).await
        })
        .await
        .cloned()
    }

    pub async fn description(&self) -> Option<String> {
        self.text("description", &self.description, &mib::SYS_DESCR).await
    }

    pub async fn name(&self) -> Option<String> {
        self.text("name", &self.name, &mib::SYS_NAME).await
    }

    pub async fn contact(&self) -> Option<String> {
        self.text("contact", &self.contact, &mib::SYS_CONTACT).await
    }

    pub async fn location(&self) -> Option<String> {
        self.text("location", &self.location, &mib::SYS_LOCATION).await
    }

    pub async fn object_id(&self) -> Option<Oid> {
        self.object_id
            .get_or_fetch(|| async {
                let query = scalar(&mib::SYS_OBJECT_ID);
                self.source.fetch("object_id", &query, ValueQuery::decode_oid).await
            })
            .await
            .cloned()
    }

    /// `Duration::ZERO` when the device does not report it.
    pub async fn uptime(&self) -> Duration {
        self.uptime
            .get_or_fetch(|| async {
                let query = scalar(&mib::SYS_UPTIME);
                self.source.fetch("uptime", &query, ValueQuery::decode_duration).await
            })
            .await
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Settles every unfetched field with one batched request.
    pub async fn force_evaluate_all(&self) {
        let texts: [(&'static str, &LazyValue<String>, &[u32]); 4] = [
            ("description", &self.description, &mib::SYS_DESCR),
            ("name", &self.name, &mib::SYS_NAME),
            ("contact", &self.contact, &mib::SYS_CONTACT),
            ("location", &self.location, &mib::SYS_LOCATION),
        ];
        let mut oids: Vec<Oid> = texts
            .iter()
            .filter(|(_, slot, _)| !slot.is_fetched())
            .map(|(_, _, arcs)| Oid::from(*arcs))
            .collect();
        if !self.object_id.is_fetched() {
            oids.push(Oid::from(&mib::SYS_OBJECT_ID[..]));
        }
        if !self.uptime.is_fetched() {
            oids.push(Oid::from(&mib::SYS_UPTIME[..]));
        }
        if oids.is_empty() {
            return;
        }

        let values = match self.source.values(&oids).await {
            Ok(values) => values,
            Err(e) => {
                self.source.log_failure("system", &e);
                Default::default()
            }
        };
        for (_, slot, arcs) in texts {
            slot.fill(scalar(arcs).decode_text(&values));
        }
        self.object_id
            .fill(scalar(&mib::SYS_OBJECT_ID).decode_oid(&values));
        self.uptime
            .fill(scalar(&mib::SYS_UPTIME).decode_duration(&values));
    }

    /// Non-volatile fields as currently settled.
    pub fn to_record(&self) -> SystemRecord {
        SystemRecord {
            descriptor: self.descriptor.clone(),
            description: self.description.peek().cloned(),
            object_id: self.object_id.peek().cloned(),
            name: self.name.peek().cloned(),
            contact: self.contact.peek().cloned(),
            location: self.location.peek().cloned(),
        }
    }

    pub async fn snapshot(&self) -> SystemSnapshot {
        self.force_evaluate_all().await;
        SystemSnapshot {
            address: self.address(),
            record: self.to_record(),
            uptime_secs: self.uptime.peek().map(Duration::as_secs),
        }
    }
}
