// ── Core error types ──
//
// Errors that reach callers of hamlink-core. Transport errors are always
// tagged with the device address; catalog failures name the model,
// version or table id that could not be resolved.

use std::fmt;

use thiserror::Error;

use crate::config::QueryApi;
use crate::model::DeviceAddress;

/// Why one detector declined a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub detector: String,
    pub api: QueryApi,
    pub reason: String,
}

impl Rejection {
    pub fn new(detector: impl Into<String>, api: QueryApi, reason: impl Into<String>) -> Self {
        Self {
            detector: detector.into(),
            api,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.detector, self.api, self.reason)
    }
}

fn join_rejections(rejections: &[Rejection]) -> String {
    if rejections.is_empty() {
        return "no detector registered".into();
    }
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transport ────────────────────────────────────────────────────
    #[error("{address}: {source}")]
    Transport {
        address: DeviceAddress,
        #[source]
        source: hamlink_api::Error,
    },

    // ── Catalog resolution ───────────────────────────────────────────
    #[error("{address}: device '{model}' is not in the device catalog")]
    UnknownDevice { address: DeviceAddress, model: String },

    #[error("{address}: no catalog entry for {model} version {version}")]
    UnsupportedVersion {
        address: DeviceAddress,
        model: String,
        version: String,
    },

    #[error("{address}: {model} v{version} has no lookup tables")]
    NoLookupTables {
        address: DeviceAddress,
        model: String,
        version: String,
    },

    #[error("{address}: lookup table {table_id} for {model} v{version} is missing")]
    MissingLookupTable {
        address: DeviceAddress,
        model: String,
        version: String,
        table_id: u32,
    },

    #[error(
        "{address}: lookup table {table_id} for {model} v{version} does not support SNMP {requested}"
    )]
    ProtocolMismatch {
        address: DeviceAddress,
        model: String,
        version: String,
        table_id: u32,
        requested: String,
    },

    // ── Detection ────────────────────────────────────────────────────
    #[error("{address}: no device detector matched ({})", join_rejections(.rejections))]
    DetectionExhausted {
        address: DeviceAddress,
        rejections: Vec<Rejection>,
    },

    // ── Operations ───────────────────────────────────────────────────
    #[error("{address}: {operation} is not supported by {model}")]
    Unsupported {
        address: DeviceAddress,
        model: String,
        operation: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Cache ────────────────────────────────────────────────────────
    #[error("Cache error: {message}")]
    Cache { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Tags a transport error with the device it came from.
    pub fn transport(address: impl Into<DeviceAddress>, source: hamlink_api::Error) -> Self {
        Self::Transport {
            address: address.into(),
            source,
        }
    }

    /// Device address this error concerns, if any.
    pub fn address(&self) -> Option<&DeviceAddress> {
        match self {
            Self::Transport { address, .. }
            | Self::UnknownDevice { address, .. }
            | Self::UnsupportedVersion { address, .. }
            | Self::NoLookupTables { address, .. }
            | Self::MissingLookupTable { address, .. }
            | Self::ProtocolMismatch { address, .. }
            | Self::DetectionExhausted { address, .. }
            | Self::Unsupported { address, .. } => Some(address),
            Self::ValidationFailed { .. }
            | Self::Cache { .. }
            | Self::Config { .. }
            | Self::Internal(_) => None,
        }
    }

    /// Returns `true` for transport timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    /// Returns `true` if the device was reached but the queried value does
    /// not exist on it.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_no_data())
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Cache {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Cache {
            message: format!("cannot (de)serialize cache section: {err}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn exhaustion_lists_every_rejection() {
        let err = CoreError::DetectionExhausted {
            address: "10.0.0.1".parse().unwrap(),
            rejections: vec![
                Rejection::new("MikroTik", QueryApi::Snmp, "sysDescr is 'Linux'"),
                Rejection::new("AirOS", QueryApi::Snmp, "no model string"),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("10.0.0.1:"));
        assert!(text.contains("MikroTik (snmp): sysDescr is 'Linux'"));
        assert!(text.contains("AirOS (snmp): no model string"));
    }

    #[test]
    fn transport_errors_keep_their_class() {
        let err = CoreError::transport(
            DeviceAddress::new([192, 0, 2, 1].into()),
            hamlink_api::Error::Timeout {
                target: [192, 0, 2, 1].into(),
                attempts: 3,
            },
        );
        assert!(err.is_timeout());
        assert!(!err.is_no_data());
        assert_eq!(err.address().map(ToString::to_string).as_deref(), Some("192.0.2.1"));
    }
}
