use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use hamlink_api::{Oid, SnmpTransport, SnmpValue, VarBind};
use tracing::{debug, warn};

use super::lazy::QueryTimer;
use super::query::ValueQuery;
use crate::error::CoreError;
use crate::model::DeviceAddress;

/// Where a container's lazy fields come from.
///
/// Containers restored from the cache or built from the RouterOS API have
/// no transport; their unsettled fields resolve as unavailable.
#[derive(Clone)]
pub struct FieldSource {
    address: DeviceAddress,
    transport: Option<Arc<dyn SnmpTransport>>,
    timer: Arc<QueryTimer>,
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSource")
            .field("address", &self.address)
            .field("live", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl FieldSource {
    pub fn live(address: DeviceAddress, transport: Arc<dyn SnmpTransport>) -> Self {
        Self {
            address,
            transport: Some(transport),
            timer: Arc::new(QueryTimer::default()),
        }
    }

    pub fn offline(address: DeviceAddress) -> Self {
        Self {
            address,
            transport: None,
            timer: Arc::new(QueryTimer::default()),
        }
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn timer(&self) -> &QueryTimer {
        &self.timer
    }

    fn transport(&self) -> Result<&Arc<dyn SnmpTransport>, CoreError> {
        self.transport.as_ref().ok_or_else(|| {
            CoreError::Internal(format!("{}: container has no live transport", self.address))
        })
    }

    /// Batched GET; exception values are dropped from the result.
    pub async fn values(&self, oids: &[Oid]) -> Result<HashMap<Oid, SnmpValue>, CoreError> {
        if oids.is_empty() {
            return Ok(HashMap::new());
        }
        let transport = self.transport()?;
        let started = Instant::now();
        let result = transport.get(oids).await;
        self.timer.record(started.elapsed());
        let varbinds = result.map_err(|e| CoreError::transport(self.address, e))?;
        Ok(varbinds
            .into_iter()
            .filter(|vb| !vb.value.is_exception())
            .map(|vb| (vb.oid, vb.value))
            .collect())
    }

    pub async fn walk(&self, root: &Oid) -> Result<Vec<VarBind>, CoreError> {
        let transport = self.transport()?;
        let started = Instant::now();
        let result = transport.walk(root).await;
        self.timer.record(started.elapsed());
        result.map_err(|e| CoreError::transport(self.address, e))
    }

    pub async fn value(&self, oid: &Oid) -> Result<SnmpValue, CoreError> {
        let transport = self.transport()?;
        let started = Instant::now();
        let result = transport.get_one(oid).await;
        self.timer.record(started.elapsed());
        result.map_err(|e| CoreError::transport(self.address, e))
    }

    /// Fetches one field. Every failure is absorbed and logged; the field
    /// then settles as unavailable.
    pub async fn fetch<T>(
        &self,
        field: &'static str,
        query: &ValueQuery,
        decode: impl FnOnce(&ValueQuery, &HashMap<Oid, SnmpValue>) -> Option<T>,
    ) -> Option<T> {
        if !query.is_supported() {
            debug!(address = %self.address, field, "no query path on this device");
            return None;
        }
        if self.transport.is_none() {
            return None;
        }
        match self.values(&query.oids()).await {
            Ok(values) => {
                let decoded = decode(query, &values);
                if decoded.is_none() {
                    debug!(address = %self.address, field, "device returned no usable value");
                }
                decoded
            }
            Err(e) => {
                self.log_failure(field, &e);
                None
            }
        }
    }

    pub fn log_failure(&self, field: &'static str, error: &CoreError) {
        if error.is_timeout() {
            warn!(address = %self.address, field, error = %error, "field query timed out");
        } else {
            debug!(address = %self.address, field, error = %error, "field unavailable");
        }
    }
}
