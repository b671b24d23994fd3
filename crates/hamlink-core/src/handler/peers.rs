// ── Wireless roster strategies ──
//
// Vendors expose associations either as a table indexed by interface and
// MAC (in one order or the other) or as a single set of scalars for the
// one link a point-to-point radio has. The strategy decides which, and
// how the local radio's role is read.

use std::collections::HashMap;

use tracing::debug;

use crate::containers::query::decode_mac_value;
use crate::containers::{FieldSource, InterfaceDetails, PeerRecord, ValueQuery, VolatileQueries};
use crate::error::CoreError;
use crate::model::{MacAddress, ValueMeaning};
use crate::oid_table::LayeredLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStrategy {
    /// AirOS 5.6 and later: station table indexed `ifIndex.mac`.
    UbiquitiAirOs,
    /// AirOS before 5.6: one link, station mode only.
    UbiquitiAirOsLegacy,
    /// airFiber: one point-to-point link.
    AirFiber,
    /// RouterOS registration table indexed `mac.ifIndex`.
    Mikrotik,
    NoWireless,
}

pub(crate) struct PeerContext<'a> {
    pub source: &'a FieldSource,
    pub lookup: &'a LayeredLookup,
    pub interfaces: Option<&'a InterfaceDetails>,
}

#[derive(Debug, Clone, Copy)]
enum IndexLayout {
    InterfaceThenMac,
    MacThenInterface,
}

#[derive(Debug, Clone, Copy)]
enum RoleSource {
    /// Radio mode 1 is station; 2, 3 and 4 are access point variants.
    AirOsRadioMode,
    /// Link mode 1 is master.
    AirFiberLinkMode,
    /// An interface with an AP client count is an access point.
    MikrotikApTable,
}

#[derive(Debug, Clone, Copy, Default)]
struct Role {
    is_access_point: Option<bool>,
    client_count: Option<u32>,
}

impl PeerStrategy {
    pub(crate) fn needs_interfaces(self) -> bool {
        matches!(self, Self::UbiquitiAirOsLegacy | Self::AirFiber)
    }

    /// Ubiquiti multi-client radios report a CCQ that does not belong to
    /// any single station.
    fn drops_shared_ccq(self) -> bool {
        matches!(self, Self::UbiquitiAirOs | Self::UbiquitiAirOsLegacy)
    }

    pub(crate) async fn load_roster(
        self,
        ctx: &PeerContext<'_>,
    ) -> Result<Vec<PeerRecord>, CoreError> {
        match self {
            Self::UbiquitiAirOs => {
                self.indexed(ctx, IndexLayout::InterfaceThenMac, RoleSource::AirOsRadioMode)
                    .await
            }
            Self::Mikrotik => {
                self.indexed(ctx, IndexLayout::MacThenInterface, RoleSource::MikrotikApTable)
                    .await
            }
            Self::UbiquitiAirOsLegacy => {
                self.single_link(ctx, RoleSource::AirOsRadioMode, true).await
            }
            Self::AirFiber => self.single_link(ctx, RoleSource::AirFiberLinkMode, false).await,
            Self::NoWireless => Ok(Vec::new()),
        }
    }

    // ── Table layout ────────────────────────────────────────────────

    async fn indexed(
        self,
        ctx: &PeerContext<'_>,
        layout: IndexLayout,
        role_source: RoleSource,
    ) -> Result<Vec<PeerRecord>, CoreError> {
        let Some(root) = ctx.lookup.resolve(ValueMeaning::WirelessRemoteMacWalkRoot) else {
            return Ok(Vec::new());
        };
        let root = root.oid.clone();
        let rows = ctx.source.walk(&root).await?;

        let mut roles: HashMap<Option<u32>, Role> = HashMap::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(index) = row.oid.suffix_after(&root) else {
                continue;
            };
            let (interface_id, mac_arcs) = match layout {
                IndexLayout::InterfaceThenMac => match index.split_first() {
                    Some((iface, mac)) => (Some(*iface), mac),
                    None => continue,
                },
                IndexLayout::MacThenInterface => {
                    let (mac, iface) = index.split_at(index.len().min(6));
                    (iface.first().copied(), mac)
                }
            };
            let Some(remote_mac) =
                decode_mac_value(&row.value).or_else(|| MacAddress::from_arcs(mac_arcs))
            else {
                debug!(address = %ctx.source.address(), index = ?index, "peer row without MAC");
                continue;
            };

            let role = match roles.get(&interface_id) {
                Some(role) => *role,
                None => {
                    let role = read_role(ctx, role_source, interface_id).await;
                    roles.insert(interface_id, role);
                    role
                }
            };

            let per_peer = |meaning| ValueQuery::resolve(ctx.lookup, meaning, index);
            let mut ccq = per_peer(ValueMeaning::CcqAppendPeerIndex);
            if !ccq.is_supported() && role.client_count == Some(1) {
                if let Some(iface) = interface_id {
                    ccq = ValueQuery::resolve(
                        ctx.lookup,
                        ValueMeaning::OverallCcqAppendInterfaceId,
                        &[iface],
                    );
                }
            }

            let queries = VolatileQueries {
                rx_signal: ValueQuery::streams(
                    ctx.lookup,
                    &ValueMeaning::RX_STREAMS_PER_PEER,
                    ValueMeaning::RxSignalStrengthAppendPeerIndex,
                    index,
                ),
                tx_signal: ValueQuery::streams(
                    ctx.lookup,
                    &ValueMeaning::TX_STREAMS_PER_PEER,
                    ValueMeaning::TxSignalStrengthAppendPeerIndex,
                    index,
                ),
                link_uptime: per_peer(ValueMeaning::LinkUptimeAppendPeerIndex),
                ccq,
            };
            records.push(self.finish(remote_mac, interface_id, role, queries));
        }
        Ok(records)
    }

    // ── Single link ─────────────────────────────────────────────────

    async fn single_link(
        self,
        ctx: &PeerContext<'_>,
        role_source: RoleSource,
        stations_only: bool,
    ) -> Result<Vec<PeerRecord>, CoreError> {
        let Some(entry) = ctx.lookup.resolve(ValueMeaning::WirelessRemoteMacImmediate) else {
            return Ok(Vec::new());
        };
        let remote_mac = match ctx.source.value(&entry.oid).await {
            Ok(value) => decode_mac_value(&value),
            Err(e) if e.is_no_data() => None,
            Err(e) => return Err(e),
        };
        let Some(remote_mac) = remote_mac else {
            debug!(address = %ctx.source.address(), "radio not associated");
            return Ok(Vec::new());
        };

        let role = read_role(ctx, role_source, None).await;
        if stations_only && role.is_access_point == Some(true) {
            debug!(
                address = %ctx.source.address(),
                "access point mode has no station roster on this firmware"
            );
            return Ok(Vec::new());
        }

        let interface_id = ctx
            .interfaces
            .and_then(|ifaces| ifaces.iter().find(|i| i.looks_wireless()))
            .map(|i| i.id());
        let immediate = |meaning| ValueQuery::resolve(ctx.lookup, meaning, &[]);
        let queries = VolatileQueries {
            rx_signal: ValueQuery::streams(
                ctx.lookup,
                &ValueMeaning::RX_STREAMS_IMMEDIATE,
                ValueMeaning::RxSignalStrengthImmediate,
                &[],
            ),
            tx_signal: ValueQuery::streams(
                ctx.lookup,
                &ValueMeaning::TX_STREAMS_IMMEDIATE,
                ValueMeaning::TxSignalStrengthImmediate,
                &[],
            ),
            link_uptime: immediate(ValueMeaning::LinkUptimeImmediate),
            ccq: immediate(ValueMeaning::CcqImmediate),
        };
        Ok(vec![self.finish(remote_mac, interface_id, role, queries)])
    }

    fn finish(
        self,
        remote_mac: MacAddress,
        interface_id: Option<u32>,
        role: Role,
        mut queries: VolatileQueries,
    ) -> PeerRecord {
        if self.drops_shared_ccq() && role.client_count.is_some_and(|count| count > 1) {
            queries.ccq = ValueQuery::Unsupported;
        }
        PeerRecord {
            remote_mac,
            interface_id,
            is_access_point: role.is_access_point,
            client_count: role.client_count,
            queries,
        }
    }
}

async fn read_int(ctx: &PeerContext<'_>, meaning: ValueMeaning, suffix: &[u32]) -> Option<i64> {
    let entry = ctx.lookup.resolve(meaning)?;
    match ctx.source.value(&entry.oid.join(suffix)).await {
        Ok(value) => value.as_i64(),
        Err(e) => {
            ctx.source.log_failure("wireless_role", &e);
            None
        }
    }
}

fn count(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

async fn read_role(ctx: &PeerContext<'_>, source: RoleSource, interface_id: Option<u32>) -> Role {
    match source {
        RoleSource::AirOsRadioMode => Role {
            is_access_point: match read_int(ctx, ValueMeaning::WirelessModeImmediate, &[]).await {
                Some(1) => Some(false),
                Some(2..=4) => Some(true),
                _ => None,
            },
            client_count: count(
                read_int(ctx, ValueMeaning::WirelessClientCountImmediate, &[]).await,
            ),
        },
        RoleSource::AirFiberLinkMode => Role {
            is_access_point: match read_int(ctx, ValueMeaning::WirelessModeImmediate, &[]).await {
                Some(1) => Some(true),
                Some(2) => Some(false),
                _ => None,
            },
            client_count: None,
        },
        RoleSource::MikrotikApTable => {
            let Some(iface) = interface_id else {
                return Role::default();
            };
            let Some(entry) = ctx
                .lookup
                .resolve(ValueMeaning::WirelessClientCountAppendInterfaceId)
            else {
                return Role::default();
            };
            match ctx.source.value(&entry.oid.child(iface)).await {
                Ok(value) => Role {
                    is_access_point: Some(true),
                    client_count: count(value.as_i64()),
                },
                Err(e) if e.is_no_data() => Role {
                    is_access_point: Some(false),
                    client_count: None,
                },
                Err(e) => {
                    ctx.source.log_failure("wireless_role", &e);
                    Role::default()
                }
            }
        }
    }
}
