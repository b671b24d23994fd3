// hamlink-api: Async SNMP and RouterOS API transports for radio link monitoring

pub mod error;
pub mod oid;
pub mod recorded;
pub mod routeros;
pub mod session;
pub mod transport;
pub mod value;
pub mod version;

pub use error::Error;
pub use oid::Oid;
pub use recorded::RecordedTransport;
pub use routeros::{RouterOsClient, RouterOsConnector, VendorConnector, VendorRecord, VendorSession};
pub use session::UdpTransport;
pub use transport::{QueryLimits, SnmpTransport, TransportConfig, VarBind};
pub use value::SnmpValue;
pub use version::SnmpVersion;
