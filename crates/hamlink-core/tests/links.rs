#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordedFactory, Registration, addr, mac_bytes, mikrotik};
use hamlink_core::{
    DetectorRegistry, MacAddress, Querier, QuerierOptions, TomlCatalog, correlate,
};
use pretty_assertions::assert_eq;

const AP: &str = "44.130.7.1";
const STATION: &str = "44.130.7.2";

fn querier(factory: RecordedFactory) -> Querier {
    let options = QuerierOptions {
        enable_caching: false,
        ..QuerierOptions::default()
    };
    Querier::new(
        options,
        DetectorRegistry::with_defaults(),
        Arc::new(TomlCatalog::builtin().unwrap()),
        Arc::new(factory),
    )
}

fn ap_side(registrations: &[Registration]) -> hamlink_api::RecordedTransport {
    mikrotik(AP, mac_bytes(0xa1), true, registrations)
}

fn station_side(registrations: &[Registration]) -> hamlink_api::RecordedTransport {
    mikrotik(STATION, mac_bytes(0xb1), false, registrations)
}

fn towards_station() -> Registration {
    Registration {
        remote: mac_bytes(0xb1),
        rx: -58,
        tx: -63,
        uptime_ticks: 90_000,
    }
}

fn towards_ap() -> Registration {
    Registration {
        remote: mac_bytes(0xa1),
        rx: -61,
        tx: -57,
        uptime_ticks: 120_000,
    }
}

// ── Correlation ─────────────────────────────────────────────────────

#[tokio::test]
async fn both_sides_matched() {
    let factory = RecordedFactory::default()
        .with(ap_side(&[towards_station()]))
        .with(station_side(&[towards_ap()]));
    let details = querier(factory)
        .fetch_link_details(addr(AP), &[addr(STATION)])
        .await
        .unwrap();

    assert_eq!(details.details.len(), 1);
    let link = &details.details[0];
    assert_eq!(link.address1, addr(AP));
    assert_eq!(link.address2, addr(STATION));
    assert_eq!(link.mac1, Some(MacAddress::from_octets(mac_bytes(0xa1))));
    assert_eq!(link.mac2, Some(MacAddress::from_octets(mac_bytes(0xb1))));
    assert_eq!(link.interface_name1.as_deref(), Some("wlan1"));
    assert_eq!(link.interface_name2.as_deref(), Some("wlan1"));
    assert!((link.rx_level_1at2 - -58.0).abs() < f64::EPSILON);
    assert!((link.rx_level_2at1 - -63.0).abs() < f64::EPSILON);
    assert_eq!(link.link_uptime, Duration::from_secs(1200));
    assert_eq!(link.side_of_access_point, Some(1));
    assert_eq!(link.model_and_version1, "RB912UAG-5HPnD v6.30.4");
}

#[tokio::test]
async fn side_one_levels_do_not_depend_on_side_two() {
    // The station has no registration towards the AP.
    let factory = RecordedFactory::default()
        .with(ap_side(&[towards_station()]))
        .with(station_side(&[]));
    let details = querier(factory)
        .fetch_link_details(addr(AP), &[addr(STATION)])
        .await
        .unwrap();

    let link = &details.details[0];
    assert!((link.rx_level_1at2 - -58.0).abs() < f64::EPSILON);
    assert!((link.rx_level_2at1 - -63.0).abs() < f64::EPSILON);
    assert_eq!(link.link_uptime, Duration::from_secs(900));
    assert_eq!(link.ccq2, None);
}

#[tokio::test]
async fn station_view_fills_missing_ap_data() {
    let factory = RecordedFactory::default()
        .with(ap_side(&[]))
        .with(station_side(&[towards_ap()]));
    let details = querier(factory)
        .fetch_link_details(addr(AP), &[addr(STATION)])
        .await
        .unwrap();

    let link = &details.details[0];
    // Received at the AP as reported by the station's transmit side.
    assert!((link.rx_level_1at2 - -57.0).abs() < f64::EPSILON);
    assert!((link.rx_level_2at1 - -61.0).abs() < f64::EPSILON);
    assert_eq!(link.side_of_access_point, None);
}

#[tokio::test]
async fn unrelated_devices_yield_no_details() {
    let stranger = Registration {
        remote: mac_bytes(0xcc),
        ..towards_station()
    };
    let factory = RecordedFactory::default()
        .with(ap_side(&[stranger]))
        .with(station_side(&[]));
    let querier = querier(factory);
    let a = querier.handler(addr(AP)).await.unwrap();
    let b = querier.handler(addr(STATION)).await.unwrap();
    let details = correlate(a.as_ref(), b.as_ref()).await.unwrap();
    assert!(details.is_empty());
}

#[tokio::test]
async fn one_unreachable_candidate_does_not_fail_the_link() {
    let factory = RecordedFactory::default()
        .with(ap_side(&[towards_station()]))
        .with(station_side(&[towards_ap()]));
    let details = querier(factory)
        .fetch_link_details(addr(AP), &[addr("44.130.7.99"), addr(STATION)])
        .await
        .unwrap();
    assert_eq!(details.details.len(), 1);
    assert_eq!(details.details[0].address2, addr(STATION));
}

#[tokio::test]
async fn every_candidate_failing_is_an_error() {
    let factory = RecordedFactory::default().with(ap_side(&[towards_station()]));
    let err = querier(factory)
        .fetch_link_details(addr(AP), &[addr("44.130.7.99")])
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("44.130.7.99"));
}
