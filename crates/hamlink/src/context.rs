//! Builds the `Querier` from configuration plus command-line overrides.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use hamlink_api::{RecordedTransport, SnmpTransport};
use hamlink_config::Config;
use hamlink_core::{
    CacheDatabase, CoreError, DetectorRegistry, DeviceAddress, DeviceCatalog, Querier,
    QuerierOptions, TomlCatalog, TransportFactory, UdpTransportFactory,
};
use secrecy::SecretString;
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Query options from the config file with command-line flags applied.
pub fn querier_options(cfg: &Config, global: &GlobalOpts) -> Result<QuerierOptions, CliError> {
    let mut options = cfg.querier_options()?;
    if let Some(ref community) = global.community {
        options.community = SecretString::from(community.clone());
    }
    if let Some(port) = global.port {
        options.port = port;
    }
    if let Some(version) = global.snmp_version {
        options.protocol_version = version;
    }
    if let Some(timeout) = global.timeout {
        options.timeout = timeout;
    }
    if let Some(retries) = global.retries {
        options.retries = retries;
    }
    if let Some(apis) = global.allowed_apis {
        options.allowed_apis = apis;
    }
    if let Some(ref user) = global.login_user {
        options.login_user = Some(user.clone());
    }
    if global.no_cache {
        options.enable_caching = false;
    }
    Ok(options)
}

/// Assemble a querier. The cache database is opened when caching is
/// enabled or `force_cache` is set (cache maintenance commands).
pub fn build_querier(
    cfg: &Config,
    global: &GlobalOpts,
    force_cache: bool,
) -> Result<Querier, CliError> {
    let options = querier_options(cfg, global)?;

    let catalog: Arc<dyn DeviceCatalog> = match cfg.catalog_path {
        Some(ref path) => Arc::new(TomlCatalog::from_file(path)?),
        None => Arc::new(TomlCatalog::builtin()?),
    };

    let transports: Arc<dyn TransportFactory> = if global.replay.is_empty() {
        Arc::new(UdpTransportFactory::new(options.transport_config()))
    } else {
        Arc::new(ReplayFactory::load(&global.replay)?)
    };

    let open_cache = options.enable_caching || force_cache;
    let mut querier = Querier::new(options, DetectorRegistry::with_defaults(), catalog, transports);
    if open_cache {
        let path = global.cache_db.clone().unwrap_or_else(|| cfg.cache_path());
        debug!(path = %path.display(), "opening cache database");
        querier = querier.with_cache(CacheDatabase::open(&path)?);
    }
    Ok(querier)
}

// ── Replay ───────────────────────────────────────────────────────────

/// Serves devices from `snmpwalk -On` dumps instead of the network.
#[derive(Debug, Default)]
pub struct ReplayFactory {
    dumps: HashMap<DeviceAddress, Arc<str>>,
    fallback: Option<Arc<str>>,
}

impl ReplayFactory {
    /// Each spec is `ADDR=FILE` or a bare `FILE` used for any other address.
    pub fn load(specs: &[String]) -> Result<Self, CliError> {
        let mut factory = Self::default();
        for spec in specs {
            let (address, path) = match spec.split_once('=') {
                Some((addr, path)) => {
                    let address = addr.parse::<DeviceAddress>().map_err(|e| CliError::Validation {
                        field: "replay".into(),
                        reason: e.to_string(),
                    })?;
                    (Some(address), path)
                }
                None => (None, spec.as_str()),
            };
            let dump: Arc<str> = read_dump(Path::new(path))?.into();
            match address {
                Some(address) => {
                    factory.dumps.insert(address, dump);
                }
                None => factory.fallback = Some(dump),
            }
        }
        Ok(factory)
    }
}

fn read_dump(path: &Path) -> Result<String, CliError> {
    let dump = std::fs::read_to_string(path).map_err(|e| CliError::Replay {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    // Validate up front so a bad line is reported against its file.
    RecordedTransport::from_snmpwalk(std::net::Ipv4Addr::UNSPECIFIED.into(), &dump).map_err(
        |e| CliError::Replay {
            path: path.display().to_string(),
            reason: e.to_string(),
        },
    )?;
    Ok(dump)
}

impl TransportFactory for ReplayFactory {
    fn create(&self, address: DeviceAddress) -> Result<Arc<dyn SnmpTransport>, CoreError> {
        let Some(dump) = self.dumps.get(&address).or(self.fallback.as_ref()) else {
            return Ok(Arc::new(RecordedTransport::new(address.ip()).unreachable()));
        };
        let transport = RecordedTransport::from_snmpwalk(address.ip(), dump)
            .map_err(|e| CoreError::transport(address, e))?;
        Ok(Arc::new(transport))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn unbound_addresses_time_out() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ".1.3.6.1.2.1.1.5.0 = STRING: \"gw\"").unwrap();
        let spec = format!("44.130.7.1={}", file.path().display());

        let factory = ReplayFactory::load(&[spec]).unwrap();
        let bound = factory.create("44.130.7.1".parse().unwrap()).unwrap();
        let sys_name = "1.3.6.1.2.1.1.5.0".parse().unwrap();
        assert_eq!(bound.query_as_string(&sys_name).await.unwrap(), "gw");

        let other = factory.create("44.130.7.2".parse().unwrap()).unwrap();
        let err = other.query_as_string(&sys_name).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn malformed_dump_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "garbage").unwrap();
        let err = ReplayFactory::load(&[file.path().display().to_string()]).unwrap_err();
        assert!(matches!(err, CliError::Replay { .. }));
    }
}
