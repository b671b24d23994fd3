// ── Query configuration ──
//
// Runtime options for talking to devices. Built by the config crate or
// the CLI and handed to the querier; core never reads files or the
// environment itself.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use hamlink_api::{QueryLimits, RouterOsConnector, SnmpVersion, TransportConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One way of querying a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryApi {
    Snmp,
    VendorSpecific,
}

impl fmt::Display for QueryApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snmp => f.write_str("snmp"),
            Self::VendorSpecific => f.write_str("vendor"),
        }
    }
}

/// Set of query APIs a caller permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueryApis(u8);

impl QueryApis {
    pub const NONE: Self = Self(0);
    pub const SNMP: Self = Self(1);
    pub const VENDOR_SPECIFIC: Self = Self(1 << 1);
    pub const ALL: Self = Self(0b11);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn allows(self, api: QueryApi) -> bool {
        self.contains(api.into())
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for QueryApis {
    fn default() -> Self {
        Self::SNMP
    }
}

impl From<QueryApi> for QueryApis {
    fn from(api: QueryApi) -> Self {
        match api {
            QueryApi::Snmp => Self::SNMP,
            QueryApi::VendorSpecific => Self::VENDOR_SPECIFIC,
        }
    }
}

impl std::ops::BitOr for QueryApis {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for QueryApis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("none"),
            Self::ALL => f.write_str("all"),
            Self::SNMP => f.write_str("snmp"),
            _ => f.write_str("vendor"),
        }
    }
}

impl FromStr for QueryApis {
    type Err = CoreError;

    /// Accepts `all`, `none`, or a comma list of `snmp` / `vendor`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut apis = Self::NONE;
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            apis = apis
                | match token.to_ascii_lowercase().as_str() {
                    "all" => Self::ALL,
                    "none" => Self::NONE,
                    "snmp" => Self::SNMP,
                    "vendor" | "vendor-specific" | "vendor_specific" | "api" => {
                        Self::VENDOR_SPECIFIC
                    }
                    _ => {
                        return Err(CoreError::ValidationFailed {
                            message: format!(
                                "unknown query API '{token}' (expected snmp, vendor, all or none)"
                            ),
                        });
                    }
                };
        }
        Ok(apis)
    }
}

impl TryFrom<String> for QueryApis {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<QueryApis> for String {
    fn from(apis: QueryApis) -> Self {
        apis.to_string()
    }
}

/// Every option the querier recognizes.
#[derive(Debug, Clone)]
pub struct QuerierOptions {
    pub port: u16,
    pub protocol_version: SnmpVersion,
    pub community: SecretString,
    pub timeout: Duration,
    /// Additional attempts after the first; 0 means exactly one attempt.
    pub retries: u32,
    pub max_values_per_batch_request: usize,
    pub max_batch_requests_per_walk: usize,
    pub enable_caching: bool,
    /// Age after which a cache entry is rebuilt from a live device.
    pub cache_validity: Duration,
    pub login_user: Option<String>,
    pub login_password: Option<SecretString>,
    pub allowed_apis: QueryApis,
    pub vendor_api_port: u16,
}

impl Default for QuerierOptions {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            port: transport.port,
            protocol_version: transport.version,
            community: transport.community,
            timeout: transport.timeout,
            retries: transport.retries,
            max_values_per_batch_request: transport.limits.max_values_per_request,
            max_batch_requests_per_walk: transport.limits.max_requests_per_walk,
            enable_caching: true,
            cache_validity: Duration::from_secs(7 * 24 * 3600),
            login_user: None,
            login_password: None,
            allowed_apis: QueryApis::SNMP,
            vendor_api_port: RouterOsConnector::DEFAULT_PORT,
        }
    }
}

impl QuerierOptions {
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            port: self.port,
            version: self.protocol_version,
            community: self.community.clone(),
            timeout: self.timeout,
            retries: self.retries,
            limits: QueryLimits {
                max_values_per_request: self.max_values_per_batch_request,
                max_requests_per_walk: self.max_batch_requests_per_walk,
                ..QueryLimits::default()
            },
        }
    }

    /// RouterOS API connector, if vendor access is allowed and a login user
    /// is configured.
    pub fn vendor_connector(&self) -> Option<RouterOsConnector> {
        if !self.allowed_apis.allows(QueryApi::VendorSpecific) {
            return None;
        }
        let user = self.login_user.as_deref()?;
        let password = self
            .login_password
            .clone()
            .unwrap_or_else(|| SecretString::from(""));
        Some(RouterOsConnector {
            port: self.vendor_api_port,
            timeout: self.timeout.saturating_mul(self.retries.saturating_add(1)),
            ..RouterOsConnector::new(user, password)
        })
    }

    /// APIs detection may actually use: vendor access needs a login user.
    pub fn effective_apis(&self) -> QueryApis {
        if self.login_user.is_some() {
            self.allowed_apis
        } else {
            self.allowed_apis.intersection(QueryApis::SNMP)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_lists() {
        assert_eq!("snmp".parse::<QueryApis>().unwrap(), QueryApis::SNMP);
        assert_eq!("snmp, vendor".parse::<QueryApis>().unwrap(), QueryApis::ALL);
        assert_eq!("all".parse::<QueryApis>().unwrap(), QueryApis::ALL);
        assert!("telnet".parse::<QueryApis>().is_err());
    }

    #[test]
    fn vendor_connector_requires_permission_and_user() {
        let mut options = QuerierOptions::default();
        options.login_user = Some("monitor".into());
        assert!(options.vendor_connector().is_none());

        options.allowed_apis = QueryApis::ALL;
        options.vendor_api_port = 8729;
        let connector = options.vendor_connector().unwrap();
        assert_eq!(connector.port, 8729);
        assert_eq!(connector.user, "monitor");
    }

    #[test]
    fn transport_config_carries_limits() {
        let options = QuerierOptions {
            max_values_per_batch_request: 3,
            retries: 0,
            ..QuerierOptions::default()
        };
        let config = options.transport_config();
        assert_eq!(config.limits.max_values_per_request, 3);
        assert_eq!(config.retries, 0);
    }
}
