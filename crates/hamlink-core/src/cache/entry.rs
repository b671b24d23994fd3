use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::QueryApi;
use crate::containers::{InterfaceSnapshot, PeerRecord, SystemRecord};
use crate::model::DeviceAddress;

/// Persisted, non-volatile knowledge about one device.
///
/// Each section is written independently; `None` means that section has
/// not been captured since the row was last reset.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub address: DeviceAddress,
    pub system: Option<SystemRecord>,
    pub interfaces: Option<Vec<InterfaceSnapshot>>,
    pub peers: Option<Vec<PeerRecord>>,
    pub api_used: Option<QueryApi>,
    pub last_modification: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_modification).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, validity: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) < validity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub unique_entries: usize,
    pub with_system_data: usize,
    pub with_interfaces: usize,
    pub with_peers: usize,
    pub via_vendor_api: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
