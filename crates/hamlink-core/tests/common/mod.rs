// Shared fixtures: recorded devices and a transport factory over them.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use hamlink_api::{Oid, RecordedTransport, SnmpTransport, SnmpValue};
use hamlink_core::{CoreError, DeviceAddress, TransportFactory};

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn addr(s: &str) -> DeviceAddress {
    s.parse().unwrap()
}

pub fn oid(s: &str) -> Oid {
    s.parse().unwrap()
}

pub fn mac_bytes(last: u8) -> [u8; 6] {
    [0x02, 0x00, 0x5e, 0x10, 0x00, last]
}

fn with_suffix(root: &str, suffix: &[u32]) -> Oid {
    oid(root).join(suffix)
}

pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";
pub const SYS_OBJECT_ID: &str = "1.3.6.1.2.1.1.2.0";
pub const SYS_NAME: &str = "1.3.6.1.2.1.1.5.0";
pub const MT_REGISTRATION: &str = "1.3.6.1.4.1.14988.1.1.1.2.1";
pub const MT_CLIENT_COUNT: &str = "1.3.6.1.4.1.14988.1.1.1.3.1.6";

/// One wireless association seen by a MikroTik radio.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub remote: [u8; 6],
    pub rx: i64,
    pub tx: i64,
    pub uptime_ticks: u32,
}

/// MikroTik RouterOS 6.30 with `ether1` (ifIndex 1) and `wlan1` (ifIndex 2).
pub fn mikrotik(
    target: &str,
    wlan_mac: [u8; 6],
    access_point: bool,
    registrations: &[Registration],
) -> RecordedTransport {
    let mut t = RecordedTransport::new(ip(target))
        .with(oid(SYS_DESCR), "RouterOS RB912UAG-5HPnD")
        .with(oid(SYS_OBJECT_ID), oid("1.3.6.1.4.1.14988.1"))
        .with(oid(SYS_NAME), format!("mt-{target}").as_str())
        .with(oid("1.3.6.1.4.1.14988.1.1.7.8.0"), "RB912UAG-5HPnD")
        .with(oid("1.3.6.1.4.1.14988.1.1.4.4.0"), "6.30.4");

    t = interfaces(t, wlan_mac, "1.3.6.1.2.1.31.1.1.1.1");
    if access_point {
        t = t.with(
            with_suffix(MT_CLIENT_COUNT, &[2]),
            i64::try_from(registrations.len()).unwrap(),
        );
    }
    for reg in registrations {
        let mut index: Vec<u32> = reg.remote.iter().map(|&b| u32::from(b)).collect();
        index.push(2);
        t = t
            .with(
                with_suffix(MT_REGISTRATION, &[1]).join(&index),
                SnmpValue::OctetString(reg.remote.to_vec()),
            )
            .with(with_suffix(MT_REGISTRATION, &[3]).join(&index), reg.rx)
            .with(with_suffix(MT_REGISTRATION, &[19]).join(&index), reg.tx)
            .with(
                with_suffix(MT_REGISTRATION, &[11]).join(&index),
                SnmpValue::TimeTicks(reg.uptime_ticks),
            );
    }
    t
}

pub const UBNT_STATION: &str = "1.3.6.1.4.1.41112.1.4.7.1";
pub const AIROS_FIRMWARE: &str = "XW.ar934x.v6.1.7.32555.180523.1754";
pub const AIROS_LEGACY_FIRMWARE: &str = "XM.ar7240.v5.5.10.24241.141001.1649";

/// One station associated with an AirOS access point.
#[derive(Debug, Clone, Copy)]
pub struct Station {
    pub remote: [u8; 6],
    pub signal: i64,
    pub ccq: i64,
}

/// NanoStation M5 in access point mode, wireless on ifIndex 2.
pub fn airos(
    target: &str,
    firmware: &str,
    wlan_mac: [u8; 6],
    stations: &[Station],
) -> RecordedTransport {
    let mut t = RecordedTransport::new(ip(target))
        .with(oid(SYS_DESCR), "Linux 2.6.32.68 #1 Fri May 25 17:52:10 EEST 2018 mips")
        .with(oid(SYS_OBJECT_ID), oid("1.3.6.1.4.1.10002.1"))
        .with(oid(SYS_NAME), format!("ubnt-{target}").as_str())
        .with(oid("1.2.840.10036.3.1.2.1.3.2"), "NanoStation M5")
        .with(oid("1.2.840.10036.3.1.2.1.4.2"), firmware)
        .with(oid("1.3.6.1.4.1.41112.1.4.1.1.2.1"), 2_i64)
        .with(
            oid("1.3.6.1.4.1.41112.1.4.5.1.15.1"),
            i64::try_from(stations.len()).unwrap(),
        );
    t = interfaces(t, wlan_mac, "1.3.6.1.2.1.2.2.1.2");
    for station in stations {
        let mut index = vec![2];
        index.extend(station.remote.iter().map(|&b| u32::from(b)));
        t = t
            .with(
                with_suffix(UBNT_STATION, &[1]).join(&index),
                SnmpValue::OctetString(station.remote.to_vec()),
            )
            .with(with_suffix(UBNT_STATION, &[3]).join(&index), station.signal)
            .with(with_suffix(UBNT_STATION, &[6]).join(&index), station.ccq);
    }
    t
}

/// airFiber 24 running firmware 4.1.0.
pub fn airfiber(target: &str) -> RecordedTransport {
    let t = RecordedTransport::new(ip(target))
        .with(oid(SYS_DESCR), "Linux 3.10.20 armv7l")
        .with(oid(SYS_OBJECT_ID), oid("1.3.6.1.4.1.41112.1.3"))
        .with(oid("1.3.6.1.4.1.41112.1.3.2.1.40.1"), "AF24.v4.1.0");
    interfaces(t, mac_bytes(0xaf), "1.3.6.1.2.1.2.2.1.2")
}

/// Generic Linux host with a single ethernet interface.
pub fn linux(target: &str) -> RecordedTransport {
    let t = RecordedTransport::new(ip(target)).with(
        oid(SYS_DESCR),
        "Linux gw 5.10.0-21-amd64 #1 SMP Debian 5.10.162-1 x86_64",
    );
    interfaces(t, mac_bytes(0xee), "1.3.6.1.2.1.2.2.1.2")
}

fn interfaces(t: RecordedTransport, wlan_mac: [u8; 6], name_root: &str) -> RecordedTransport {
    let mut ether = wlan_mac;
    ether[0] = 0x06;
    t.with(oid("1.3.6.1.2.1.2.2.1.1.1"), 1_i64)
        .with(oid("1.3.6.1.2.1.2.2.1.1.2"), 2_i64)
        .with(oid("1.3.6.1.2.1.2.2.1.3.1"), 6_i64)
        .with(oid("1.3.6.1.2.1.2.2.1.3.2"), 71_i64)
        .with(oid("1.3.6.1.2.1.2.2.1.6.1"), SnmpValue::OctetString(ether.to_vec()))
        .with(oid("1.3.6.1.2.1.2.2.1.6.2"), SnmpValue::OctetString(wlan_mac.to_vec()))
        .with(with_suffix(name_root, &[1]), "ether1")
        .with(with_suffix(name_root, &[2]), "wlan1")
}

/// Hands out pre-recorded transports by address.
#[derive(Debug, Default)]
pub struct RecordedFactory {
    devices: HashMap<DeviceAddress, Arc<RecordedTransport>>,
}

impl RecordedFactory {
    pub fn with(mut self, transport: RecordedTransport) -> Self {
        let address = DeviceAddress::new(transport.target());
        self.devices.insert(address, Arc::new(transport));
        self
    }

    pub fn device(&self, address: DeviceAddress) -> Arc<RecordedTransport> {
        Arc::clone(&self.devices[&address])
    }
}

impl TransportFactory for RecordedFactory {
    fn create(&self, address: DeviceAddress) -> Result<Arc<dyn SnmpTransport>, CoreError> {
        let transport = self
            .devices
            .get(&address)
            .cloned()
            .unwrap_or_else(|| Arc::new(RecordedTransport::new(address.ip()).unreachable()));
        Ok(transport)
    }
}
