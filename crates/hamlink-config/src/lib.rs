//! Configuration for hamlink.
//!
//! TOML file plus `HAMLINK_*` environment overrides, credential resolution
//! (env + keyring + plaintext), and translation to
//! `hamlink_core::QuerierOptions`. The core never reads files or the
//! environment itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use hamlink_api::SnmpVersion;
use hamlink_core::sweep::DEFAULT_POOL_WIDTH;
use hamlink_core::{DeviceAddress, LinkTarget, QuerierOptions, QueryApis};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEYRING_SERVICE: &str = "hamlink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn parse_duration(field: &str, text: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(text.trim()).map_err(|e| invalid(field, format!("'{text}': {e}")))
}

fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// External device catalog replacing the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub query: QuerySection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub sweep: SweepSection,

    /// Links polled by `hamlink sweep`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkSection>,
}

/// Device query options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySection {
    pub port: u16,
    pub protocol_version: SnmpVersion,

    /// SNMP community (plaintext; prefer `community_env`).
    pub community: String,

    /// Environment variable holding the community.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_env: Option<String>,

    /// Per-exchange timeout, e.g. "2s".
    pub timeout: String,

    /// Retries after the first attempt.
    pub retries: u32,

    pub max_values_per_batch_request: usize,
    pub max_batch_requests_per_walk: usize,
    pub enable_caching: bool,

    /// RouterOS API user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_user: Option<String>,

    /// RouterOS API password (plaintext; prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_password: Option<String>,

    /// Environment variable holding the RouterOS API password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_password_env: Option<String>,

    /// "snmp", "vendor", "all" or a comma-separated list.
    pub allowed_apis: QueryApis,

    pub vendor_api_port: u16,
}

impl Default for QuerySection {
    fn default() -> Self {
        let options = QuerierOptions::default();
        Self {
            port: options.port,
            protocol_version: options.protocol_version,
            community: options.community.expose_secret().to_owned(),
            community_env: None,
            timeout: format_duration(options.timeout),
            retries: options.retries,
            max_values_per_batch_request: options.max_values_per_batch_request,
            max_batch_requests_per_walk: options.max_batch_requests_per_walk,
            enable_caching: options.enable_caching,
            login_user: None,
            login_password: None,
            login_password_env: None,
            allowed_apis: options.allowed_apis,
            vendor_api_port: options.vendor_api_port,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSection {
    /// SQLite database; defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Age after which an entry is rebuilt, e.g. "7days".
    pub validity: String,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: None,
            validity: format_duration(QuerierOptions::default().cache_validity),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepSection {
    /// Time between sweep starts, e.g. "5m".
    pub interval: String,

    /// Links polled in parallel.
    pub pool_width: usize,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            interval: "5m".into(),
            pool_width: DEFAULT_POOL_WIDTH,
        }
    }
}

/// A named link: one device and the candidates at the far end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkSection {
    pub name: String,
    pub a: String,
    pub b: Vec<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "hamlink", "hamlink")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default cache database location.
pub fn default_cache_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("cache.db"),
        |dirs| dirs.data_dir().join("cache.db"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hamlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from `path` (or the canonical path) plus environment.
///
/// Nested keys use a double underscore: `HAMLINK_QUERY__COMMUNITY`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("HAMLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default(path: Option<&Path>) -> Config {
    load_config(path).unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// SNMP community: `community_env` first, then the plaintext value.
pub fn resolve_community(query: &QuerySection) -> SecretString {
    if let Some(val) = query
        .community_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return SecretString::from(val);
    }
    SecretString::from(query.community.clone())
}

/// RouterOS API password for the configured user.
///
/// Order: `login_password_env`, system keyring, plaintext.
pub fn resolve_login_password(query: &QuerySection) -> Option<SecretString> {
    let user = query.login_user.as_deref()?;

    // 1. Env var
    if let Some(val) = query
        .login_password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Some(SecretString::from(val));
    }

    // 2. Keyring
    if let Ok(pw) = keyring::Entry::new(KEYRING_SERVICE, &format!("{user}/password"))
        .and_then(|entry| entry.get_password())
    {
        return Some(SecretString::from(pw));
    }

    // 3. Plaintext in config
    query.login_password.clone().map(SecretString::from)
}

/// Store the RouterOS API password for `user` in the system keyring.
pub fn store_login_password(user: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{user}/password"))?
        .set_password(password.expose_secret())?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Options for `hamlink_core::Querier`, credentials resolved.
    pub fn querier_options(&self) -> Result<QuerierOptions, ConfigError> {
        let q = &self.query;
        if q.max_values_per_batch_request == 0 {
            return Err(invalid("query.max_values_per_batch_request", "must be at least 1"));
        }
        if q.max_batch_requests_per_walk == 0 {
            return Err(invalid("query.max_batch_requests_per_walk", "must be at least 1"));
        }
        Ok(QuerierOptions {
            port: q.port,
            protocol_version: q.protocol_version,
            community: resolve_community(q),
            timeout: parse_duration("query.timeout", &q.timeout)?,
            retries: q.retries,
            max_values_per_batch_request: q.max_values_per_batch_request,
            max_batch_requests_per_walk: q.max_batch_requests_per_walk,
            enable_caching: q.enable_caching,
            cache_validity: self.cache_validity()?,
            login_user: q.login_user.clone(),
            login_password: resolve_login_password(q),
            allowed_apis: q.allowed_apis,
            vendor_api_port: q.vendor_api_port,
        })
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache.path.clone().unwrap_or_else(default_cache_path)
    }

    pub fn cache_validity(&self) -> Result<Duration, ConfigError> {
        parse_duration("cache.validity", &self.cache.validity)
    }

    pub fn sweep_interval(&self) -> Result<Duration, ConfigError> {
        let interval = parse_duration("sweep.interval", &self.sweep.interval)?;
        if interval.is_zero() {
            return Err(invalid("sweep.interval", "must be positive"));
        }
        Ok(interval)
    }

    /// Configured links with their addresses parsed.
    pub fn link_targets(&self) -> Result<Vec<LinkTarget>, ConfigError> {
        let parse = |field: &str, text: &str| {
            text.parse::<DeviceAddress>()
                .map_err(|e| invalid(field, e.to_string()))
        };
        self.links
            .iter()
            .map(|link| {
                if link.b.is_empty() {
                    return Err(invalid(
                        "links.b",
                        format!("link '{}' has no far-end devices", link.name),
                    ));
                }
                Ok(LinkTarget {
                    name: link.name.clone(),
                    a: parse("links.a", &link.a)?,
                    bs: link
                        .b
                        .iter()
                        .map(|b| parse("links.b", b))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_options() {
        let options = Config::default().querier_options().unwrap();
        let core = QuerierOptions::default();
        assert_eq!(options.port, core.port);
        assert_eq!(options.timeout, core.timeout);
        assert_eq!(options.cache_validity, core.cache_validity);
        assert_eq!(options.allowed_apis, core.allowed_apis);
        assert!(options.login_password.is_none());
    }

    #[test]
    fn rejects_bad_durations() {
        let mut cfg = Config::default();
        cfg.query.timeout = "soon".into();
        let err = cfg.querier_options().unwrap_err();
        assert!(err.to_string().contains("query.timeout"));

        cfg.sweep.interval = "0s".into();
        assert!(cfg.sweep_interval().is_err());
    }

    #[test]
    fn links_need_a_far_end() {
        let cfg = Config {
            links: vec![LinkSection {
                name: "lonely".into(),
                a: "44.1.1.1".into(),
                b: Vec::new(),
            }],
            ..Config::default()
        };
        assert!(cfg.link_targets().is_err());
    }
}
