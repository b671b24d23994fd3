//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use hamlink_config::ConfigError;
use hamlink_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_DETECTED: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const DEVICE: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device access ────────────────────────────────────────────────
    #[error("{address} did not answer")]
    #[diagnostic(
        code(hamlink::timeout),
        help(
            "Check that the device is reachable and SNMP is enabled.\n\
             Raise --timeout or --retries for slow links, or verify --community."
        )
    )]
    Timeout { address: String },

    #[error("Query to {address} failed: {message}")]
    #[diagnostic(code(hamlink::device))]
    Device { address: String, message: String },

    // ── Detection & catalog ──────────────────────────────────────────
    #[error("Could not identify the device at {address}")]
    #[diagnostic(
        code(hamlink::not_detected),
        help(
            "Detectors tried: {rejections}\n\
             Run with -vv to see each probe."
        )
    )]
    NotDetected { address: String, rejections: String },

    #[error("{message}")]
    #[diagnostic(
        code(hamlink::catalog),
        help(
            "The device was identified but its model or firmware is not in the\n\
             device catalog. Add it to a catalog file and set catalog_path."
        )
    )]
    Catalog { message: String },

    #[error("{operation} is not supported by {model} at {address}")]
    #[diagnostic(
        code(hamlink::unsupported),
        help("BGP sessions are only available through the RouterOS API (--allowed-apis all --login-user ...).")
    )]
    Unsupported {
        address: String,
        model: String,
        operation: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hamlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(hamlink::config),
        help("Inspect the effective configuration with: hamlink config show")
    )]
    Config(#[from] ConfigError),

    #[error("No links configured")]
    #[diagnostic(
        code(hamlink::no_links),
        help(
            "Add [[links]] entries (name, a, b) to the configuration file.\n\
             Expected at: {path}"
        )
    )]
    NoLinks { path: String },

    #[error("Cannot read replay file {path}: {reason}")]
    #[diagnostic(code(hamlink::replay), help("Replay files are `snmpwalk -On` dumps."))]
    Replay { path: String, reason: String },

    // ── Cache ────────────────────────────────────────────────────────
    #[error("Cache error: {message}")]
    #[diagnostic(
        code(hamlink::cache),
        help("Check --cache-db, or bypass the cache with --no-cache.")
    )]
    Cache { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(hamlink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts, or --dry-run to preview.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(hamlink::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot render JSON: {0}")]
    #[diagnostic(code(hamlink::json))]
    Json(#[from] serde_json::Error),

    #[error("Cannot render YAML: {0}")]
    #[diagnostic(code(hamlink::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Device { .. } => exit_code::DEVICE,
            Self::NotDetected { .. } | Self::Catalog { .. } => exit_code::NOT_DETECTED,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let address = err.address().map(ToString::to_string).unwrap_or_default();
        if err.is_timeout() {
            return CliError::Timeout { address };
        }
        match err {
            CoreError::Transport { source, .. } => CliError::Device {
                address,
                message: source.to_string(),
            },

            CoreError::DetectionExhausted { rejections, .. } => CliError::NotDetected {
                address,
                rejections: if rejections.is_empty() {
                    "none".into()
                } else {
                    rejections
                        .iter()
                        .map(|r| format!("\n  - {r}"))
                        .collect::<String>()
                },
            },

            e @ (CoreError::UnknownDevice { .. }
            | CoreError::UnsupportedVersion { .. }
            | CoreError::NoLookupTables { .. }
            | CoreError::MissingLookupTable { .. }
            | CoreError::ProtocolMismatch { .. }) => CliError::Catalog {
                message: e.to_string(),
            },

            CoreError::Unsupported {
                model, operation, ..
            } => CliError::Unsupported {
                address,
                model,
                operation,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Cache { message } => CliError::Cache { message },

            CoreError::Config { message } | CoreError::Internal(message) => {
                CliError::Internal(message)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hamlink_core::{QueryApi, Rejection};

    use super::*;

    #[test]
    fn transport_timeouts_get_the_timeout_code() {
        let address: hamlink_core::DeviceAddress = "44.130.7.1".parse().unwrap();
        let err = CoreError::transport(
            address,
            hamlink_api::Error::Timeout {
                target: address.ip(),
                attempts: 3,
            },
        );
        let cli: CliError = err.into();
        assert_eq!(cli.exit_code(), exit_code::TIMEOUT);
        assert!(cli.to_string().contains("44.130.7.1"));
    }

    #[test]
    fn exhaustion_lists_rejections() {
        let err = CoreError::DetectionExhausted {
            address: "44.130.7.9".parse().unwrap(),
            rejections: vec![Rejection::new("Linux", QueryApi::Snmp, "sysDescr is 'RouterOS'")],
        };
        let cli: CliError = err.into();
        assert_eq!(cli.exit_code(), exit_code::NOT_DETECTED);
        let CliError::NotDetected { rejections, .. } = cli else {
            panic!("expected NotDetected");
        };
        assert!(rejections.contains("Linux (snmp)"));
    }
}
