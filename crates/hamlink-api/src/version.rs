use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// SNMP protocol version, ordered from oldest to newest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SnmpVersion {
    V1,
    #[default]
    V2c,
    V3,
}

impl SnmpVersion {
    /// Whether GETBULK is available; v1 walks fall back to GETNEXT.
    pub fn supports_bulk(self) -> bool {
        self >= Self::V2c
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2c => 2,
            Self::V3 => 3,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::V1,
            3 => Self::V3,
            _ => Self::V2c,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("V2C".parse::<SnmpVersion>().unwrap(), SnmpVersion::V2c);
        assert_eq!("v1".parse::<SnmpVersion>().unwrap(), SnmpVersion::V1);
        assert_eq!(SnmpVersion::V3.to_string(), "v3");
    }

    #[test]
    fn ordering_oldest_first() {
        assert!(SnmpVersion::V1 < SnmpVersion::V2c);
        assert_eq!(SnmpVersion::V3.min(SnmpVersion::V2c), SnmpVersion::V2c);
        assert!(!SnmpVersion::V1.supports_bulk());
    }

    #[test]
    fn u8_round_trip_is_stable() {
        for v in [SnmpVersion::V1, SnmpVersion::V2c, SnmpVersion::V3] {
            assert_eq!(SnmpVersion::from_u8(v.to_u8()), v);
        }
    }
}
