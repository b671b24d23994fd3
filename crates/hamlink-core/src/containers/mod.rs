pub mod bgp;
pub mod decibel;
pub mod interfaces;
pub mod lazy;
pub mod peers;
pub mod query;
pub mod source;
pub mod system;

pub use bgp::{BgpPeer, BgpPeers};
pub use interfaces::{InterfaceDetail, InterfaceDetails, InterfaceSnapshot};
pub use lazy::{FieldState, LazyValue, QueryTimer};
pub use peers::{
    PeerRecord, PeerSnapshot, PeerValues, VolatileQueries, WirelessPeerInfo, WirelessPeerInfos,
};
pub use query::ValueQuery;
pub use source::FieldSource;
pub use system::{SystemData, SystemRecord, SystemSnapshot};
