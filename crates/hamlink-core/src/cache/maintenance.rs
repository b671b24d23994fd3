use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::database::CacheDatabase;
use super::entry::CacheStatistics;
use crate::error::CoreError;
use crate::model::DeviceAddress;

/// What a maintenance run removed, or would remove in dry-run mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub dry_run: bool,
    pub addresses: Vec<DeviceAddress>,
}

impl MaintenanceReport {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Operator-facing cache housekeeping.
#[derive(Debug, Clone)]
pub struct CacheMaintenance {
    db: CacheDatabase,
}

impl CacheMaintenance {
    pub fn new(db: CacheDatabase) -> Self {
        Self { db }
    }

    /// Removes entries last modified more than `age` ago.
    pub fn purge_older_than(
        &self,
        age: Duration,
        dry_run: bool,
    ) -> Result<MaintenanceReport, CoreError> {
        let age = chrono::Duration::from_std(age).map_err(|e| CoreError::ValidationFailed {
            message: format!("purge age out of range: {e}"),
        })?;
        let cutoff = Utc::now() - age;
        let addresses = self.db.addresses_older_than(cutoff)?;
        if !dry_run && !addresses.is_empty() {
            let removed = self.db.delete(&addresses)?;
            info!(removed, cutoff = %cutoff, "purged stale cache entries");
        }
        Ok(MaintenanceReport { dry_run, addresses })
    }

    /// Forgets the given devices. Addresses without an entry are ignored.
    pub fn invalidate(
        &self,
        addresses: &[DeviceAddress],
        dry_run: bool,
    ) -> Result<MaintenanceReport, CoreError> {
        let mut present = Vec::new();
        for &address in addresses {
            if self.db.load(address)?.is_some() && !present.contains(&address) {
                present.push(address);
            }
        }
        if !dry_run && !present.is_empty() {
            let removed = self.db.delete(&present)?;
            info!(removed, "invalidated cache entries");
        }
        Ok(MaintenanceReport {
            dry_run,
            addresses: present,
        })
    }

    pub fn statistics(&self) -> Result<CacheStatistics, CoreError> {
        self.db.statistics()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cache::StoreMode;
    use crate::containers::InterfaceSnapshot;

    fn addr(s: &str) -> DeviceAddress {
        s.parse().unwrap()
    }

    fn seeded() -> CacheDatabase {
        let db = CacheDatabase::in_memory().unwrap();
        for a in ["44.1.1.1", "44.1.1.2", "44.1.1.3"] {
            db.store_interfaces(addr(a), &Vec::<InterfaceSnapshot>::new(), StoreMode::Merge)
                .unwrap();
        }
        db.set_last_modification(addr("44.1.1.1"), Utc::now() - ChronoDuration::days(10))
            .unwrap();
        db
    }

    #[test]
    fn dry_run_purge_reports_without_deleting() {
        let maintenance = CacheMaintenance::new(seeded());
        let report = maintenance
            .purge_older_than(Duration::from_secs(7 * 24 * 3600), true)
            .unwrap();
        assert_eq!(report.addresses, vec![addr("44.1.1.1")]);
        assert!(report.dry_run);
        assert_eq!(maintenance.statistics().unwrap().unique_entries, 3);
    }

    #[test]
    fn purge_removes_only_stale_entries() {
        let maintenance = CacheMaintenance::new(seeded());
        let report = maintenance
            .purge_older_than(Duration::from_secs(7 * 24 * 3600), false)
            .unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(maintenance.statistics().unwrap().unique_entries, 2);
    }

    #[test]
    fn invalidate_ignores_unknown_addresses() {
        let maintenance = CacheMaintenance::new(seeded());
        let report = maintenance
            .invalidate(&[addr("44.1.1.2"), addr("10.0.0.1")], false)
            .unwrap();
        assert_eq!(report.addresses, vec![addr("44.1.1.2")]);
        assert_eq!(maintenance.statistics().unwrap().unique_entries, 2);
    }
}
