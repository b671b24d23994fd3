use std::fmt;

use hamlink_api::SnmpVersion;
use serde::{Deserialize, Serialize};

use super::software_version::SoftwareVersion;
use crate::config::QueryApi;

/// Optional capabilities a device may expose beyond the common surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFeatures(u8);

impl DeviceFeatures {
    pub const NONE: Self = Self(0);
    pub const RSSI: Self = Self(1);
    pub const BGP: Self = Self(1 << 1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for DeviceFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for DeviceFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::RSSI) {
            names.push("rssi");
        }
        if self.contains(Self::BGP) {
            names.push("bgp");
        }
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}

/// What detection concluded about a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub model: String,
    pub vendor: String,
    pub version: SoftwareVersion,
    /// Name of the detector that identified the device.
    pub detected_by: String,
    pub api: QueryApi,
    pub minimum_protocol_version: SnmpVersion,
    pub maximum_protocol_version: SnmpVersion,
    /// Lookup table ids, highest precedence first.
    pub lookup_tables: Vec<u32>,
    #[serde(default)]
    pub features: DeviceFeatures,
}

impl DeviceDescriptor {
    pub fn model_and_version(&self) -> String {
        format!("{} v{}", self.model, self.version)
    }
}
