use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Abstract name of one retrievable fact.
///
/// Lookup tables bind these to concrete OIDs per device model and version.
/// Adding a device means adding table rows, never a variant here.
///
/// Suffix conventions for the resolved OID:
/// - `…WalkRoot`: table column, walked; rows are keyed by the index suffix.
/// - `…AppendInterfaceId`: the interface id is appended.
/// - `…AppendPeerIndex`: the full row index of a wireless peer is appended.
/// - `…Immediate`: the OID is queried as-is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum ValueMeaning {
    // ── Identity ──
    ModelString,
    SoftwareVersionString,

    // ── Interfaces ──
    InterfaceIdWalkRoot,
    InterfaceTypeWalkRoot,
    InterfaceMacWalkRoot,
    InterfaceNameWalkRoot,

    // ── Wireless peers, table indexed ──
    WirelessRemoteMacWalkRoot,
    RxSignalStrengthAppendPeerIndex,
    TxSignalStrengthAppendPeerIndex,
    RxSignalStrengthCh0AppendPeerIndex,
    RxSignalStrengthCh1AppendPeerIndex,
    RxSignalStrengthCh2AppendPeerIndex,
    TxSignalStrengthCh0AppendPeerIndex,
    TxSignalStrengthCh1AppendPeerIndex,
    TxSignalStrengthCh2AppendPeerIndex,
    LinkUptimeAppendPeerIndex,
    CcqAppendPeerIndex,

    // ── Wireless, per interface ──
    WirelessClientCountAppendInterfaceId,
    OverallCcqAppendInterfaceId,

    // ── Wireless, single link ──
    WirelessRemoteMacImmediate,
    RxSignalStrengthImmediate,
    TxSignalStrengthImmediate,
    RxSignalStrengthCh0Immediate,
    RxSignalStrengthCh1Immediate,
    TxSignalStrengthCh0Immediate,
    TxSignalStrengthCh1Immediate,
    LinkUptimeImmediate,
    CcqImmediate,
    WirelessModeImmediate,
    WirelessClientCountImmediate,
}

impl ValueMeaning {
    pub const RX_STREAMS_PER_PEER: [Self; 3] = [
        Self::RxSignalStrengthCh0AppendPeerIndex,
        Self::RxSignalStrengthCh1AppendPeerIndex,
        Self::RxSignalStrengthCh2AppendPeerIndex,
    ];

    pub const TX_STREAMS_PER_PEER: [Self; 3] = [
        Self::TxSignalStrengthCh0AppendPeerIndex,
        Self::TxSignalStrengthCh1AppendPeerIndex,
        Self::TxSignalStrengthCh2AppendPeerIndex,
    ];

    pub const RX_STREAMS_IMMEDIATE: [Self; 2] = [
        Self::RxSignalStrengthCh0Immediate,
        Self::RxSignalStrengthCh1Immediate,
    ];

    pub const TX_STREAMS_IMMEDIATE: [Self; 2] = [
        Self::TxSignalStrengthCh0Immediate,
        Self::TxSignalStrengthCh1Immediate,
    ];
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_round_trip_through_strings() {
        for meaning in ValueMeaning::iter() {
            let parsed: ValueMeaning = meaning.to_string().parse().unwrap();
            assert_eq!(parsed, meaning);
        }
    }
}
