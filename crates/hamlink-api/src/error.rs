use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::oid::Oid;
use crate::version::SnmpVersion;

/// Top-level error type for the `hamlink-api` crate.
///
/// Covers SNMP sessions, value decoding, recorded walks and the RouterOS
/// API side channel. `hamlink-core` tags these with the device address
/// before they reach users.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// Socket could not be opened or bound.
    #[error("Cannot open SNMP session to {target}: {source}")]
    Session {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Protocol version has no session implementation.
    #[error("SNMP {version} sessions are not supported")]
    UnsupportedVersion { version: SnmpVersion },

    // ── Exchange ────────────────────────────────────────────────────
    /// No response within the configured timeout, after all retries.
    #[error("SNMP request to {target} timed out after {attempts} attempt(s)")]
    Timeout { target: IpAddr, attempts: u32 },

    /// The agent answered but the exchange failed (decode error, bad PDU).
    #[error("SNMP request to {target} failed: {message}")]
    Request { target: IpAddr, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// `noSuchObject`, `noSuchInstance`, `endOfMibView` or `NULL`.
    #[error("No value at {oid}")]
    NoSuchValue { oid: Oid },

    /// Value present but of a type the caller cannot use.
    #[error("Value at {oid} is not {expected}: {found}")]
    UnexpectedType {
        oid: Oid,
        expected: &'static str,
        found: String,
    },

    #[error("Invalid OID '{input}'")]
    InvalidOid { input: String },

    /// A recorded walk line could not be parsed.
    #[error("Invalid recorded value on line {line}: {reason}")]
    Recording { line: usize, reason: String },

    // ── RouterOS API ────────────────────────────────────────────────
    /// TCP connect to the API port failed.
    #[error("Cannot connect to RouterOS API at {target}: {source}")]
    VendorConnect {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// API exchange did not complete within the configured timeout.
    #[error("RouterOS API at {target} timed out")]
    VendorTimeout { target: SocketAddr },

    #[error("RouterOS API I/O error: {0}")]
    VendorIo(#[from] std::io::Error),

    /// Login was refused (wrong credentials, API disabled for the user).
    #[error("RouterOS API login rejected: {message}")]
    VendorLogin { message: String },

    /// A command produced a `!trap` reply.
    #[error("RouterOS API command '{command}' failed: {message}")]
    VendorTrap { command: String, message: String },

    /// Malformed sentence or unexpected reply word.
    #[error("RouterOS API protocol error: {0}")]
    VendorProtocol(String),
}

impl Error {
    /// Returns `true` if the device never answered in time.
    ///
    /// Device detection treats this as terminal for the whole address.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::VendorTimeout { .. })
    }

    /// Returns `true` if the agent answered without data for the queried OID.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoSuchValue { .. })
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::VendorTimeout { .. }
                | Self::Request { .. }
                | Self::VendorConnect { .. }
                | Self::Session { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_transient_but_missing_values_are_not() {
        let timeout = Error::Timeout {
            target: "44.130.7.1".parse().unwrap(),
            attempts: 3,
        };
        assert!(timeout.is_timeout());
        assert!(timeout.is_transient());
        assert!(!timeout.is_no_data());

        let missing = Error::NoSuchValue {
            oid: "1.3.6.1.2.1.1.1.0".parse().unwrap(),
        };
        assert!(missing.is_no_data());
        assert!(!missing.is_transient());
    }

    #[test]
    fn login_rejection_is_permanent() {
        let err = Error::VendorLogin {
            message: "invalid user name or password".into(),
        };
        assert!(!err.is_timeout());
        assert!(!err.is_transient());
    }
}
