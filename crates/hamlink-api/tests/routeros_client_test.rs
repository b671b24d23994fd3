#![allow(clippy::unwrap_used)]
// Integration tests for `RouterOsClient` against a scripted API server.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use hamlink_api::routeros::codec::{encode_sentence, read_sentence};
use hamlink_api::{Error, RouterOsClient, VendorSession};

// ── Helpers ─────────────────────────────────────────────────────────

/// One scripted exchange: the command word we expect, then the reply
/// sentences to send back.
type Script = Vec<(&'static str, Vec<Vec<&'static str>>)>;

async fn serve(script: Script) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        for (expected, replies) in script {
            let sentence = read_sentence(&mut socket).await.unwrap();
            assert_eq!(sentence.first().map(String::as_str), Some(expected));
            for reply in replies {
                socket.write_all(&encode_sentence(&reply)).await.unwrap();
            }
        }
    });
    addr
}

fn password() -> SecretString {
    SecretString::from("s3cret")
}

async fn connect(addr: SocketAddr) -> Result<RouterOsClient, Error> {
    RouterOsClient::connect(addr, "monitor", &password(), Duration::from_secs(2)).await
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let addr = serve(vec![("/login", vec![vec!["!done"]])]).await;
    let client = connect(addr).await.unwrap();
    assert_eq!(client.target(), addr);
}

#[tokio::test]
async fn test_login_trap_is_login_error() {
    let addr = serve(vec![(
        "/login",
        vec![
            vec!["!trap", "=message=invalid user name or password (6)"],
            vec!["!done"],
        ],
    )])
    .await;

    let result = connect(addr).await;
    assert!(
        matches!(&result, Err(Error::VendorLogin { message }) if message.contains("invalid user")),
        "expected VendorLogin, got: {result:?}"
    );
}

#[tokio::test]
async fn test_challenge_login_is_refused() {
    let addr = serve(vec![(
        "/login",
        vec![vec!["!done", "=ret=ebddd18303a54111e2dea05a92ab46b4"]],
    )])
    .await;

    let result = connect(addr).await;
    assert!(matches!(result, Err(Error::VendorLogin { .. })));
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_print_collects_records() {
    let addr = serve(vec![
        ("/login", vec![vec!["!done"]]),
        (
            "/interface/wireless/registration-table/print",
            vec![
                vec![
                    "!re",
                    "=.id=*1",
                    "=interface=wlan1",
                    "=mac-address=00:0C:42:AA:BB:01",
                    "=signal-strength=-64dBm@6Mbps",
                ],
                vec!["!re", "=.id=*2", "=interface=wlan1", "=mac-address=00:0C:42:AA:BB:02"],
                vec!["!done"],
            ],
        ),
    ])
    .await;

    let client = connect(addr).await.unwrap();
    let records = client
        .run(&["/interface/wireless/registration-table/print"])
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["interface"], "wlan1");
    assert_eq!(records[0]["signal-strength"], "-64dBm@6Mbps");
    assert_eq!(records[1]["mac-address"], "00:0C:42:AA:BB:02");
}

#[tokio::test]
async fn test_trap_surfaces_after_done() {
    let addr = serve(vec![
        ("/login", vec![vec!["!done"]]),
        (
            "/routing/bgp/peer/print",
            vec![vec!["!trap", "=message=no such command prefix"], vec!["!done"]],
        ),
    ])
    .await;

    let client = connect(addr).await.unwrap();
    let err = client.run(&["/routing/bgp/peer/print"]).await.unwrap_err();
    match err {
        Error::VendorTrap { command, message } => {
            assert_eq!(command, "/routing/bgp/peer/print");
            assert_eq!(message, "no such command prefix");
        }
        other => panic!("expected VendorTrap, got {other:?}"),
    }
}

#[tokio::test]
async fn test_silent_device_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let result =
        RouterOsClient::connect(addr, "monitor", &password(), Duration::from_millis(100)).await;
    let err = result.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}
