use std::fmt;

use serde::{Deserialize, Serialize};

/// IANA `ifType` values seen on the devices this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum InterfaceType {
    Other,
    EthernetCsmacd,
    Ppp,
    SoftwareLoopback,
    Ieee80211,
    Tunnel,
    L2Vlan,
    Bridge,
    Unknown(i64),
}

impl InterfaceType {
    pub fn code(self) -> i64 {
        match self {
            Self::Other => 1,
            Self::EthernetCsmacd => 6,
            Self::Ppp => 23,
            Self::SoftwareLoopback => 24,
            Self::Ieee80211 => 71,
            Self::Tunnel => 131,
            Self::L2Vlan => 135,
            Self::Bridge => 209,
            Self::Unknown(code) => code,
        }
    }

    pub fn is_wireless(self) -> bool {
        self == Self::Ieee80211
    }
}

impl From<i64> for InterfaceType {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Other,
            6 => Self::EthernetCsmacd,
            23 => Self::Ppp,
            24 => Self::SoftwareLoopback,
            71 => Self::Ieee80211,
            131 => Self::Tunnel,
            135 => Self::L2Vlan,
            209 => Self::Bridge,
            other => Self::Unknown(other),
        }
    }
}

impl From<InterfaceType> for i64 {
    fn from(t: InterfaceType) -> Self {
        t.code()
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other => f.write_str("other"),
            Self::EthernetCsmacd => f.write_str("ethernet"),
            Self::Ppp => f.write_str("ppp"),
            Self::SoftwareLoopback => f.write_str("loopback"),
            Self::Ieee80211 => f.write_str("ieee80211"),
            Self::Tunnel => f.write_str("tunnel"),
            Self::L2Vlan => f.write_str("vlan"),
            Self::Bridge => f.write_str("bridge"),
            Self::Unknown(code) => write!(f, "type-{code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(InterfaceType::from(71), InterfaceType::Ieee80211);
        assert_eq!(InterfaceType::from(4711), InterfaceType::Unknown(4711));
        assert_eq!(i64::from(InterfaceType::Bridge), 209);
    }
}
