//! Device abstraction, link correlation and caching for hamnet radio link
//! monitoring.
//!
//! This crate sits between the transports in `hamlink-api` and the CLI:
//!
//! - **[`Querier`]**: Facade exposing every query operation. It opens a
//!   transport per device, runs detection, and wraps the resulting handler
//!   in the cache layer when caching is enabled.
//!
//! - **Detection** ([`detect`]): An explicitly constructed
//!   [`DetectorRegistry`] of vendor detectors ordered by priority. The first
//!   match resolves its lookup tables through the [`DeviceCatalog`] and
//!   builds a [`DeviceHandler`]. Exhaustion reports every rejection.
//!
//! - **OID resolution** ([`oid_table`], [`catalog`]): Per-version layered
//!   lookup tables mapping each [`ValueMeaning`] to a concrete OID.
//!
//! - **Containers** ([`containers`]): Lazily evaluated, memoised views of
//!   system data, interfaces and wireless peers. Unavailable fields settle
//!   once and are never re-fetched.
//!
//! - **Link correlation** ([`link`]): Merges two devices' views into
//!   [`LinkDetails`] by matching peer MACs against interface MACs.
//!
//! - **Cache** ([`cache`]): SQLite persistence of non-volatile data with
//!   validity-window expiry and dry-run maintenance.
//!
//! - **Sweeps** ([`sweep`]): Bounded worker pool polling configured links,
//!   guarded so sweeps never overlap.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod containers;
pub mod detect;
pub mod error;
pub mod handler;
pub mod link;
pub mod model;
pub mod oid_table;
pub mod querier;
pub mod sweep;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{
    CacheDatabase, CacheMaintenance, CacheStatistics, CachingDeviceHandler, MaintenanceReport,
    StoreMode,
};
pub use catalog::{DeviceCatalog, TomlCatalog};
pub use config::{QuerierOptions, QueryApi, QueryApis};
pub use containers::{
    BgpPeer, BgpPeers, FieldState, InterfaceDetail, InterfaceDetails, SystemData, WirelessPeerInfo,
    WirelessPeerInfos,
};
pub use detect::{DetectorRegistry, DeviceDetector};
pub use error::{CoreError, Rejection};
pub use handler::DeviceHandler;
pub use link::{LinkDetail, LinkDetails, correlate};
pub use model::{
    DeviceAddress, DeviceDescriptor, DeviceFeatures, InterfaceType, MacAddress, SoftwareVersion,
    ValueMeaning, VersionRange,
};
pub use oid_table::{LayeredLookup, LookupEntry, LookupTable};
pub use querier::{Querier, TransportFactory, UdpTransportFactory};
pub use sweep::{LinkTarget, SweepOutcome, SweepReport, SweepRunner};
