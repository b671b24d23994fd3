// RouterOS API side channel (TCP 8728).
//
// The vendor-specific path for MikroTik devices: login, then print-style
// commands returning attribute records. Device handlers only see the
// `VendorSession` trait so tests can substitute scripted sessions.

mod client;
pub mod codec;

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;

pub use client::{RouterOsClient, RouterOsConnector};

/// One `!re` reply: attribute name to raw value.
pub type VendorRecord = BTreeMap<String, String>;

/// An authenticated vendor API session.
#[async_trait]
pub trait VendorSession: Send + Sync + fmt::Debug {
    /// Runs one command (`words[0]`, followed by attribute or query words)
    /// and returns every record of the reply.
    async fn run(&self, words: &[&str]) -> Result<Vec<VendorRecord>, Error>;
}

/// Opens authenticated sessions to devices.
#[async_trait]
pub trait VendorConnector: Send + Sync + fmt::Debug {
    async fn connect(&self, address: IpAddr) -> Result<Arc<dyn VendorSession>, Error>;
}
