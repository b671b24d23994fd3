// ── Cache layer ──
//
// Persists the non-volatile parts of each device's data so detection and
// table resolution run once per validity window. Volatile readings are
// always re-queried through the cached query recipes.

mod database;
mod entry;
mod handler;
mod maintenance;

pub use database::{CacheDatabase, StoreMode};
pub use entry::{CacheEntry, CacheStatistics};
pub use handler::{CachingDeviceHandler, HandlerSource};
pub use maintenance::{CacheMaintenance, MaintenanceReport};
