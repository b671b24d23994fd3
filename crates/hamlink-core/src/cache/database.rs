// ── SQLite cache store ──
//
// One row per device address, each section a JSON column. Every write is
// a short transaction on one row; nothing here waits on the network.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::entry::{CacheEntry, CacheStatistics};
use crate::config::QueryApi;
use crate::containers::{InterfaceSnapshot, PeerRecord, SystemRecord};
use crate::error::CoreError;
use crate::model::DeviceAddress;

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS cache_data (
        address TEXT PRIMARY KEY NOT NULL,
        system_data TEXT,
        interface_details TEXT,
        wireless_peer_infos TEXT,
        api_used TEXT,
        last_modification TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_cache_data_modified
        ON cache_data (last_modification);
";

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::Cache {
            message: format!("bad timestamp '{text}': {e}"),
        })
}

fn api_name(api: QueryApi) -> &'static str {
    match api {
        QueryApi::Snmp => "snmp",
        QueryApi::VendorSpecific => "vendor",
    }
}

fn parse_api(text: &str) -> Option<QueryApi> {
    match text {
        "snmp" => Some(QueryApi::Snmp),
        "vendor" => Some(QueryApi::VendorSpecific),
        _ => None,
    }
}

fn section<T: DeserializeOwned>(text: Option<String>) -> Result<Option<T>, CoreError> {
    text.map(|json| serde_json::from_str(&json)).transpose().map_err(Into::into)
}

/// How a section write treats the rest of the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Keep the other sections.
    Merge,
    /// Drop the whole row first, in the same transaction as the write.
    Replace,
}

/// Cache database handle; clones share one connection.
#[derive(Debug, Clone)]
pub struct CacheDatabase {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl CacheDatabase {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Cache {
                message: format!("cannot create {}: {e}", parent.display()),
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, path.to_path_buf())
    }

    pub fn in_memory() -> Result<Self, CoreError> {
        Self::init(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self, CoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "cache database ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::Cache {
            message: "cache connection lock poisoned".into(),
        })
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn load(&self, address: DeviceAddress) -> Result<Option<CacheEntry>, CoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT system_data, interface_details, wireless_peer_infos, api_used, last_modification
                 FROM cache_data WHERE address = ?1",
                params![address.to_string()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        let Some((system, interfaces, peers, api, modified)) = row else {
            return Ok(None);
        };
        Ok(Some(CacheEntry {
            address,
            system: section(system)?,
            interfaces: section(interfaces)?,
            peers: section(peers)?,
            api_used: api.as_deref().and_then(parse_api),
            last_modification: parse_timestamp(&modified)?,
        }))
    }

    /// The entry for `address` if it is younger than `validity` at `now`.
    pub fn load_fresh(
        &self,
        address: DeviceAddress,
        validity: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CoreError> {
        Ok(self
            .load(address)?
            .filter(|entry| entry.is_fresh(validity, now)))
    }

    pub fn addresses(&self) -> Result<Vec<DeviceAddress>, CoreError> {
        self.addresses_where("SELECT address FROM cache_data ORDER BY address", [])
    }

    /// Addresses last modified before `cutoff`.
    pub fn addresses_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DeviceAddress>, CoreError> {
        self.addresses_where(
            "SELECT address FROM cache_data WHERE last_modification < ?1 ORDER BY address",
            [timestamp(cutoff)],
        )
    }

    fn addresses_where<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<DeviceAddress>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.parse()?);
        }
        Ok(out)
    }

    pub fn statistics(&self) -> Result<CacheStatistics, CoreError> {
        let conn = self.lock()?;
        let (unique, system, interfaces, peers, vendor, oldest, newest) = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(system_data),
                    COUNT(interface_details),
                    COUNT(wireless_peer_infos),
                    COALESCE(SUM(api_used = 'vendor'), 0),
                    MIN(last_modification),
                    MAX(last_modification)
             FROM cache_data",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            },
        )?;
        drop(conn);

        let count = |n: i64| usize::try_from(n).unwrap_or(0);
        Ok(CacheStatistics {
            unique_entries: count(unique),
            with_system_data: count(system),
            with_interfaces: count(interfaces),
            with_peers: count(peers),
            via_vendor_api: count(vendor),
            oldest: oldest.as_deref().map(parse_timestamp).transpose()?,
            newest: newest.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    // ── Writes ──────────────────────────────────────────────────────

    fn upsert<T: Serialize + ?Sized>(
        &self,
        address: DeviceAddress,
        column: &'static str,
        value: &T,
        api: Option<QueryApi>,
        mode: StoreMode,
    ) -> Result<(), CoreError> {
        let json = serde_json::to_string(value)?;
        let now = timestamp(Utc::now());
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if mode == StoreMode::Replace {
            tx.execute(
                "DELETE FROM cache_data WHERE address = ?1",
                params![address.to_string()],
            )?;
        }
        tx.execute(
            &format!(
                "INSERT INTO cache_data (address, {column}, api_used, last_modification)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(address) DO UPDATE SET
                     {column} = excluded.{column},
                     api_used = COALESCE(excluded.api_used, cache_data.api_used),
                     last_modification = excluded.last_modification"
            ),
            params![address.to_string(), json, api.map(api_name), now],
        )?;
        tx.commit()?;
        debug!(address = %address, section = column, ?mode, "cache section stored");
        Ok(())
    }

    pub fn store_system(
        &self,
        address: DeviceAddress,
        record: &SystemRecord,
        mode: StoreMode,
    ) -> Result<(), CoreError> {
        self.upsert(address, "system_data", record, Some(record.descriptor.api), mode)
    }

    pub fn store_interfaces(
        &self,
        address: DeviceAddress,
        interfaces: &[InterfaceSnapshot],
        mode: StoreMode,
    ) -> Result<(), CoreError> {
        self.upsert(address, "interface_details", interfaces, None, mode)
    }

    pub fn store_peers(
        &self,
        address: DeviceAddress,
        peers: &[PeerRecord],
        mode: StoreMode,
    ) -> Result<(), CoreError> {
        self.upsert(address, "wireless_peer_infos", peers, None, mode)
    }

    /// Overrides the modification time of an entry.
    pub fn set_last_modification(
        &self,
        address: DeviceAddress,
        at: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE cache_data SET last_modification = ?2 WHERE address = ?1",
            params![address.to_string(), timestamp(at)],
        )?;
        Ok(changed > 0)
    }

    /// Deletes the given entries in one transaction; returns how many existed.
    pub fn delete(&self, addresses: &[DeviceAddress]) -> Result<usize, CoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM cache_data WHERE address = ?1")?;
            for address in addresses {
                removed += stmt.execute(params![address.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }
}
