// ── Recorded transport ──
//
// Answers queries from an in-memory OID tree, typically loaded from an
// `snmpwalk -On` dump. Used for offline replay and as the agent stand-in
// for tests; every exchange is counted.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::ops::Bound;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use crate::error::Error;
use crate::oid::Oid;
use crate::transport::{QueryLimits, SnmpTransport, VarBind};
use crate::value::SnmpValue;
use crate::version::SnmpVersion;

#[derive(Debug)]
pub struct RecordedTransport {
    target: IpAddr,
    values: RwLock<BTreeMap<Oid, SnmpValue>>,
    version: AtomicU8,
    limits: QueryLimits,
    unreachable: bool,
    exchanges: AtomicUsize,
    gets: Mutex<HashMap<Oid, usize>>,
}

impl RecordedTransport {
    pub fn new(target: IpAddr) -> Self {
        Self {
            target,
            values: RwLock::new(BTreeMap::new()),
            version: AtomicU8::new(SnmpVersion::V2c.to_u8()),
            limits: QueryLimits::default(),
            unreachable: false,
            exchanges: AtomicUsize::new(0),
            gets: Mutex::new(HashMap::new()),
        }
    }

    /// Loads an `snmpwalk -On` dump: one `.oid = TYPE: value` per line.
    /// Blank lines and `#` comments are skipped.
    pub fn from_snmpwalk(target: IpAddr, dump: &str) -> Result<Self, Error> {
        let mut values = BTreeMap::new();
        for (idx, line) in dump.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let recording = |reason: String| Error::Recording {
                line: idx + 1,
                reason,
            };
            let (oid, value) = line
                .split_once(" = ")
                .ok_or_else(|| recording("expected '<oid> = <value>'".into()))?;
            let oid: Oid = oid.parse().map_err(|e: Error| recording(e.to_string()))?;
            let value: SnmpValue = value.parse().map_err(recording)?;
            values.insert(oid, value);
        }
        Ok(Self {
            values: RwLock::new(values),
            ..Self::new(target)
        })
    }

    /// Adds or replaces one value.
    pub fn with(self, oid: Oid, value: impl Into<SnmpValue>) -> Self {
        self.set(oid, value);
        self
    }

    pub fn with_version(self, version: SnmpVersion) -> Self {
        self.set_protocol_version(version);
        self
    }

    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Every exchange times out, as if the device were offline.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn set(&self, oid: Oid, value: impl Into<SnmpValue>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(oid, value.into());
        }
    }

    pub fn remove(&self, oid: &Oid) {
        if let Ok(mut values) = self.values.write() {
            values.remove(oid);
        }
    }

    /// Total exchanges answered (or timed out) so far.
    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// How many times `oid` was requested through GET.
    pub fn get_count(&self, oid: &Oid) -> usize {
        self.gets
            .lock()
            .map(|gets| gets.get(oid).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn begin(&self) -> Result<(), Error> {
        self.exchanges.fetch_add(1, Ordering::Relaxed);
        if self.unreachable {
            return Err(Error::Timeout {
                target: self.target,
                attempts: 1,
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<Oid, SnmpValue>>, Error> {
        self.values.read().map_err(|_| Error::Request {
            target: self.target,
            message: "recorded tree poisoned".into(),
        })
    }
}

#[async_trait]
impl SnmpTransport for RecordedTransport {
    fn target(&self) -> IpAddr {
        self.target
    }

    fn protocol_version(&self) -> SnmpVersion {
        SnmpVersion::from_u8(self.version.load(Ordering::Acquire))
    }

    fn set_protocol_version(&self, version: SnmpVersion) {
        self.version.store(version.to_u8(), Ordering::Release);
    }

    fn limits(&self) -> QueryLimits {
        self.limits
    }

    async fn get_request(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        self.begin()?;
        if let Ok(mut gets) = self.gets.lock() {
            for oid in oids {
                *gets.entry(oid.clone()).or_default() += 1;
            }
        }
        let values = self.read()?;
        Ok(oids
            .iter()
            .map(|oid| VarBind {
                oid: oid.clone(),
                value: values
                    .get(oid)
                    .cloned()
                    .unwrap_or(SnmpValue::NoSuchInstance),
            })
            .collect())
    }

    async fn get_next_request(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        self.begin()?;
        let values = self.read()?;
        Ok(oids
            .iter()
            .map(|oid| {
                values
                    .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
                    .next()
                    .map_or_else(
                        || VarBind::new(oid.clone(), SnmpValue::EndOfMibView),
                        |(next, value)| VarBind::new(next.clone(), value.clone()),
                    )
            })
            .collect())
    }

    async fn get_bulk_request(
        &self,
        oid: &Oid,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>, Error> {
        self.begin()?;
        if !self.protocol_version().supports_bulk() {
            return Err(Error::Request {
                target: self.target,
                message: "GETBULK is not available in SNMP v1".into(),
            });
        }
        let values = self.read()?;
        let take = usize::try_from(max_repetitions).unwrap_or(usize::MAX);
        let mut out: Vec<VarBind> = values
            .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
            .take(take)
            .map(|(next, value)| VarBind::new(next.clone(), value.clone()))
            .collect();
        if out.len() < take {
            let last = out.last().map_or_else(|| oid.clone(), |vb| vb.oid.clone());
            out.push(VarBind::new(last, SnmpValue::EndOfMibView));
        }
        Ok(out)
    }
}
