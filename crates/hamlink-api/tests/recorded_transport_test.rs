#![allow(clippy::unwrap_used)]
// Walk and batching behaviour of the provided `SnmpTransport` operations,
// exercised through `RecordedTransport`.

use std::time::Duration;

use pretty_assertions::assert_eq;

use hamlink_api::{
    Error, Oid, QueryLimits, RecordedTransport, SnmpTransport, SnmpValue, SnmpVersion,
};

fn oid(s: &str) -> Oid {
    s.parse().unwrap()
}

const DUMP: &str = r#"
# ifTable excerpt
.1.3.6.1.2.1.1.1.0 = STRING: "RouterOS RB912UAG-5HPnD"
.1.3.6.1.2.1.1.3.0 = Timeticks: (360000) 1:00:00.00
.1.3.6.1.2.1.2.2.1.1.1 = INTEGER: 1
.1.3.6.1.2.1.2.2.1.1.2 = INTEGER: 2
.1.3.6.1.2.1.2.2.1.1.3 = INTEGER: 3
.1.3.6.1.2.1.2.2.1.2.1 = STRING: "ether1"
.1.3.6.1.2.1.2.2.1.2.2 = STRING: "wlan1"
.1.3.6.1.2.1.2.2.1.2.3 = STRING: "bridge"
"#;

fn recorded() -> RecordedTransport {
    RecordedTransport::from_snmpwalk("192.0.2.1".parse().unwrap(), DUMP).unwrap()
}

#[tokio::test]
async fn test_typed_queries() {
    let t = recorded();
    assert_eq!(
        t.query_as_string(&oid("1.3.6.1.2.1.1.1.0")).await.unwrap(),
        "RouterOS RB912UAG-5HPnD"
    );
    assert_eq!(
        t.query_as_duration(&oid("1.3.6.1.2.1.1.3.0")).await.unwrap(),
        Duration::from_secs(3600)
    );
    assert_eq!(t.query_as_int(&oid("1.3.6.1.2.1.2.2.1.1.2")).await.unwrap(), 2);

    let missing = t.query_as_string(&oid("1.3.6.1.2.1.1.4.0")).await.unwrap_err();
    assert!(missing.is_no_data());

    let wrong = t.query_as_duration(&oid("1.3.6.1.2.1.1.1.0")).await.unwrap_err();
    assert!(matches!(wrong, Error::UnexpectedType { .. }));
}

#[tokio::test]
async fn test_walk_stays_inside_subtree_with_bulk() {
    let t = recorded();
    let rows = t.walk(&oid("1.3.6.1.2.1.2.2.1.1")).await.unwrap();
    let values: Vec<_> = rows.iter().map(|vb| vb.value.clone()).collect();
    assert_eq!(
        values,
        vec![SnmpValue::Integer(1), SnmpValue::Integer(2), SnmpValue::Integer(3)]
    );
}

#[tokio::test]
async fn test_walk_uses_getnext_on_v1() {
    let t = recorded().with_version(SnmpVersion::V1);
    let rows = t.walk(&oid("1.3.6.1.2.1.2.2.1.2")).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].value.as_text().as_deref(), Some("wlan1"));
    // Three rows plus the exchange that left the subtree.
    assert_eq!(t.exchange_count(), 4);
}

#[tokio::test]
async fn test_walk_stops_at_request_limit() {
    let t = recorded()
        .with_version(SnmpVersion::V1)
        .with_limits(QueryLimits {
            max_requests_per_walk: 2,
            ..QueryLimits::default()
        });
    let rows = t.walk(&oid("1.3.6.1.2.1.2.2.1.1")).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(t.exchange_count(), 2);
}

#[tokio::test]
async fn test_batched_get_is_split() {
    let t = recorded().with_limits(QueryLimits {
        max_values_per_request: 2,
        ..QueryLimits::default()
    });
    let oids: Vec<Oid> = (1..=5)
        .map(|i| oid("1.3.6.1.2.1.2.2.1.2").child(i))
        .collect();
    let values = t.get(&oids).await.unwrap();

    assert_eq!(values.len(), 5);
    assert_eq!(values[2].value.as_text().as_deref(), Some("bridge"));
    assert_eq!(values[4].value, SnmpValue::NoSuchInstance);
    assert_eq!(t.exchange_count(), 3);
}

#[tokio::test]
async fn test_unreachable_device_times_out() {
    let t = recorded().unreachable();
    let err = t.get_one(&oid("1.3.6.1.2.1.1.1.0")).await.unwrap_err();
    assert!(err.is_timeout());
}

#[test]
fn test_bad_dump_reports_line() {
    let err = RecordedTransport::from_snmpwalk(
        "192.0.2.1".parse().unwrap(),
        ".1.3.6.1.2.1.1.1.0 = STRING: \"ok\"\nnot a line\n",
    )
    .unwrap_err();
    assert!(matches!(err, Error::Recording { line: 2, .. }));
}
