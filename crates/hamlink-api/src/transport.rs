// Shared transport configuration and the SNMP query surface.
//
// Every device handler talks to its agent through `SnmpTransport`. The
// trait exposes three raw exchanges; batching, typed conversion and
// subtree walks are provided on top of them so that the UDP session and
// the recorded replay transport behave identically.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::error::Error;
use crate::oid::Oid;
use crate::value::SnmpValue;
use crate::version::SnmpVersion;

/// Request sizing limits applied by the provided query operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum OIDs per GET exchange; larger batches are split.
    pub max_values_per_request: usize,
    /// Maximum exchanges a single walk may issue before it stops.
    pub max_requests_per_walk: usize,
    /// GETBULK `max-repetitions`.
    pub max_repetitions: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_values_per_request: 10,
            max_requests_per_walk: 50,
            max_repetitions: 10,
        }
    }
}

/// Shared transport configuration for building SNMP sessions.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub port: u16,
    pub version: SnmpVersion,
    pub community: SecretString,
    pub timeout: Duration,
    pub retries: u32,
    pub limits: QueryLimits,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 161,
            version: SnmpVersion::V2c,
            community: SecretString::from("public"),
            timeout: Duration::from_secs(2),
            retries: 2,
            limits: QueryLimits::default(),
        }
    }
}

/// One OID/value pair of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: SnmpValue,
}

impl VarBind {
    pub fn new(oid: Oid, value: impl Into<SnmpValue>) -> Self {
        Self {
            oid,
            value: value.into(),
        }
    }
}

/// Query surface of one SNMP agent.
///
/// Implementors supply the raw exchanges. The protocol version is interior
/// mutable because detection probes at the lowest version and then raises
/// it to what the device's lookup table supports.
#[async_trait]
pub trait SnmpTransport: Send + Sync + fmt::Debug {
    fn target(&self) -> IpAddr;

    fn protocol_version(&self) -> SnmpVersion;

    fn set_protocol_version(&self, version: SnmpVersion);

    fn limits(&self) -> QueryLimits;

    /// One GET exchange. Missing instances come back as exception values.
    async fn get_request(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error>;

    /// One GETNEXT exchange.
    async fn get_next_request(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error>;

    /// One GETBULK exchange (v2c and later).
    async fn get_bulk_request(
        &self,
        oid: &Oid,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>, Error>;

    // ── Provided operations ─────────────────────────────────────────

    /// Batched GET, split into exchanges of at most
    /// `max_values_per_request` OIDs. Results keep request order.
    async fn get(&self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        let chunk = self.limits().max_values_per_request.max(1);
        let mut out = Vec::with_capacity(oids.len());
        for batch in oids.chunks(chunk) {
            out.extend(self.get_request(batch).await?);
        }
        Ok(out)
    }

    /// GET of a single OID; exception values become `Error::NoSuchValue`.
    async fn get_one(&self, oid: &Oid) -> Result<SnmpValue, Error> {
        let varbinds = self.get_request(std::slice::from_ref(oid)).await?;
        match varbinds.into_iter().next() {
            Some(vb) if !vb.value.is_exception() => Ok(vb.value),
            _ => Err(Error::NoSuchValue { oid: oid.clone() }),
        }
    }

    async fn query_as_string(&self, oid: &Oid) -> Result<String, Error> {
        let value = self.get_one(oid).await?;
        value.as_text().ok_or_else(|| Error::UnexpectedType {
            oid: oid.clone(),
            expected: "a string",
            found: value.to_string(),
        })
    }

    async fn query_as_int(&self, oid: &Oid) -> Result<i64, Error> {
        let value = self.get_one(oid).await?;
        value.as_i64().ok_or_else(|| Error::UnexpectedType {
            oid: oid.clone(),
            expected: "an integer",
            found: value.to_string(),
        })
    }

    async fn query_as_oid(&self, oid: &Oid) -> Result<Oid, Error> {
        let value = self.get_one(oid).await?;
        value.as_oid().cloned().ok_or_else(|| Error::UnexpectedType {
            oid: oid.clone(),
            expected: "an object identifier",
            found: value.to_string(),
        })
    }

    async fn query_as_duration(&self, oid: &Oid) -> Result<Duration, Error> {
        let value = self.get_one(oid).await?;
        value.as_duration().ok_or_else(|| Error::UnexpectedType {
            oid: oid.clone(),
            expected: "TimeTicks",
            found: value.to_string(),
        })
    }

    /// Walks the subtree under `root`.
    ///
    /// Uses GETBULK when the current version allows it, GETNEXT otherwise.
    /// Stops when a returned OID leaves the subtree, on `endOfMibView`, on
    /// a non-increasing OID, or after `max_requests_per_walk` exchanges (in
    /// which case the partial result is returned).
    async fn walk(&self, root: &Oid) -> Result<Vec<VarBind>, Error> {
        let limits = self.limits();
        let bulk = self.protocol_version().supports_bulk();
        let mut cursor = root.clone();
        let mut out = Vec::new();

        for _ in 0..limits.max_requests_per_walk {
            let batch = if bulk {
                self.get_bulk_request(&cursor, limits.max_repetitions.max(1))
                    .await?
            } else {
                self.get_next_request(std::slice::from_ref(&cursor)).await?
            };
            if batch.is_empty() {
                return Ok(out);
            }
            for vb in batch {
                if vb.value.is_exception() || !vb.oid.starts_with(root) || vb.oid <= cursor {
                    debug!(root = %root, rows = out.len(), "walk finished");
                    return Ok(out);
                }
                cursor = vb.oid.clone();
                out.push(vb);
            }
        }

        warn!(
            root = %root,
            rows = out.len(),
            limit = limits.max_requests_per_walk,
            "walk stopped at request limit"
        );
        Ok(out)
    }
}
