// ── Core identity types ──
//
// DeviceAddress keys every cache entry and detection result; MacAddress
// is what link correlation matches on. Both are normalized on
// construction so equality is byte equality.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── DeviceAddress ───────────────────────────────────────────────────

/// Management address of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(IpAddr);

impl DeviceAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<IpAddr>()
            .map(Self)
            .map_err(|_| CoreError::ValidationFailed {
                message: format!("'{s}' is not an IP address"),
            })
    }
}

impl From<IpAddr> for DeviceAddress {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, displayed in lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw interface address as reported in `ifPhysAddress`; anything other
    /// than six bytes (tunnels, loopback) has no MAC.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        <[u8; 6]>::try_from(bytes).ok().map(Self)
    }

    /// MAC encoded as six OID arcs, as used in table indexes.
    pub fn from_arcs(arcs: &[u32]) -> Option<Self> {
        let octets: Vec<u8> = arcs
            .iter()
            .map(|&arc| u8::try_from(arc).ok())
            .collect::<Option<_>>()?;
        Self::from_bytes(&octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = CoreError;

    /// Accepts colon-separated, dash-separated, or bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::ValidationFailed {
            message: format!("'{s}' is not a MAC address"),
        };
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
            .collect();
        if hex.len() != 12 || !hex.is_ascii() {
            return Err(invalid());
        }
        let mut octets = [0u8; 6];
        for (slot, pair) in octets.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *slot = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn device_address_from_str() {
        let addr: DeviceAddress = "44.225.56.1".parse().unwrap();
        assert_eq!(addr.to_string(), "44.225.56.1");
        assert!("router.example".parse::<DeviceAddress>().is_err());
    }

    #[test]
    fn mac_address_normalizes_dashes() {
        let mac: MacAddress = "AA-BB-CC-DD-EE-FF".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_address_normalizes_case() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_address_bare_hex() {
        let mac: MacAddress = "000c42aabb01".parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x0c, 0x42, 0xaa, 0xbb, 0x01]);
    }

    #[test]
    fn mac_address_rejects_wrong_length() {
        assert!("aa:bb:cc".parse::<MacAddress>().is_err());
        assert!(MacAddress::from_bytes(&[1, 2, 3]).is_none());
    }

    #[test]
    fn mac_address_from_index_arcs() {
        let mac = MacAddress::from_arcs(&[0, 39, 34, 1, 2, 3]).unwrap();
        assert_eq!(mac.to_string(), "00:27:22:01:02:03");
        assert!(MacAddress::from_arcs(&[0, 39, 34, 1, 2, 300]).is_none());
    }
}
