//! Integration tests for the `hamlink` CLI binary.
//!
//! Devices are served from `snmpwalk -On` dumps through `--replay`, so no
//! test touches the network or the user's configuration.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const LINUX: &str = "44.130.7.9";
const AP: &str = "44.130.7.1";
const STATION: &str = "44.130.7.2";

/// Build a command for the `hamlink` binary with env isolation.
///
/// Clears all `HAMLINK_*` env vars and points config and data directories
/// at a nonexistent path.
fn hamlink_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hamlink");
    cmd.env("HOME", "/tmp/hamlink-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/hamlink-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/hamlink-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("HAMLINK_CONFIG")
        .env_remove("HAMLINK_COMMUNITY")
        .env_remove("HAMLINK_LOGIN_USER")
        .env_remove("HAMLINK_CACHE_DB")
        .env_remove("HAMLINK_OUTPUT");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn replay(address: &str, name: &str) -> String {
    format!("--replay={address}={}", fixture(name).display())
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = hamlink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    hamlink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("radio")
            .and(predicate::str::contains("system"))
            .and(predicate::str::contains("link"))
            .and(predicate::str::contains("sweep")),
    );
}

#[test]
fn test_version_flag() {
    hamlink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hamlink"));
}

#[test]
fn test_completions_zsh() {
    hamlink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_address_is_a_usage_error() {
    let output = hamlink_cmd().args(["system", "gw.local"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("not an IP address"));
}

// ── Device views ────────────────────────────────────────────────────

#[test]
fn test_system_from_replay() {
    hamlink_cmd()
        .args(["--no-cache", &replay(LINUX, "linux-gw.walk"), "system", LINUX])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Linux")
                .and(predicate::str::contains("5.10.0"))
                .and(predicate::str::contains("JO62QM")),
        );
}

#[test]
fn test_system_plain_prints_model_and_version() {
    hamlink_cmd()
        .args(["--no-cache", &replay(LINUX, "linux-gw.walk"), "-o", "plain"])
        .args(["system", LINUX])
        .assert()
        .success()
        .stdout("Linux v5.10.0\n");
}

#[test]
fn test_interfaces_plain_lists_names() {
    hamlink_cmd()
        .args(["--no-cache", &replay(LINUX, "linux-gw.walk"), "-o", "plain"])
        .args(["interfaces", LINUX])
        .assert()
        .success()
        .stdout("ether1\nwlan1\n");
}

#[test]
fn test_peers_json_reports_registration() {
    let output = hamlink_cmd()
        .args(["--no-cache", &replay(AP, "mikrotik-ap.walk"), "-o", "json"])
        .args(["peers", AP])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let peers: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(peers[0]["remote_mac"], "02:00:5e:10:00:b1");
    assert_eq!(peers[0]["rx_signal"], -58.0);
    assert_eq!(peers[0]["link_uptime_secs"], 1200);
}

#[test]
fn test_bgp_over_snmp_is_unsupported() {
    let output = hamlink_cmd()
        .args(["--no-cache", &replay(LINUX, "linux-gw.walk"), "bgp", LINUX])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
}

#[test]
fn test_unreachable_device_times_out() {
    let output = hamlink_cmd()
        .args(["--no-cache", &replay(LINUX, "linux-gw.walk"), "system", "44.130.7.77"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(8), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("44.130.7.77"));
}

// ── Links ───────────────────────────────────────────────────────────

#[test]
fn test_link_correlates_both_ends() {
    let output = hamlink_cmd()
        .args([
            "--no-cache",
            &replay(AP, "mikrotik-ap.walk"),
            &replay(STATION, "mikrotik-station.walk"),
            "-o",
            "json",
        ])
        .args(["link", AP, STATION])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let links: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(links.as_array().unwrap().len(), 1);
    assert_eq!(links[0]["rx_level_1at2"], -58.0);
    assert_eq!(links[0]["rx_level_2at1"], -63.0);
    assert_eq!(links[0]["interface_name1"], "wlan1");
    assert_eq!(links[0]["side_of_access_point"], 1);
}

#[test]
fn test_link_requires_a_far_end() {
    let output = hamlink_cmd().args(["link", AP]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Cache ───────────────────────────────────────────────────────────

#[test]
fn test_cache_roundtrip_and_invalidate() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cache.db");
    let db_arg = format!("--cache-db={}", db.display());

    hamlink_cmd()
        .args([db_arg.as_str(), &replay(LINUX, "linux-gw.walk"), "system", LINUX])
        .assert()
        .success();

    let output = hamlink_cmd()
        .args([db_arg.as_str(), "-o", "json", "cache", "stats"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["unique_entries"], 1);
    assert_eq!(stats["with_system_data"], 1);

    hamlink_cmd()
        .args([db_arg.as_str(), "cache", "invalidate", LINUX, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove 1 cache entry"));

    // Without --yes and without a terminal the deletion is refused.
    let output = hamlink_cmd()
        .args([db_arg.as_str(), "cache", "invalidate", LINUX])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("requires confirmation"));

    hamlink_cmd()
        .args([db_arg.as_str(), "-y", "cache", "invalidate", LINUX])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 cache entry"));

    hamlink_cmd()
        .args([db_arg.as_str(), "-o", "plain", "cache", "stats"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_cache_purge_dry_run_on_empty_cache() {
    let dir = tempfile::tempdir().unwrap();
    let db_arg = format!("--cache-db={}", dir.path().join("cache.db").display());
    hamlink_cmd()
        .args([db_arg.as_str(), "cache", "purge", "--older-than", "1day", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove 0 cache entries"));
}

// ── Sweep ───────────────────────────────────────────────────────────

#[test]
fn test_sweep_without_links_fails() {
    hamlink_cmd()
        .args(["--no-cache", "sweep", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No links configured"));
}

#[test]
fn test_sweep_once_polls_configured_links() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "[[links]]\nname = \"db0abc-db0xyz\"\na = \"{AP}\"\nb = [\"{STATION}\"]\n\n\
             [[links]]\nname = \"dead\"\na = \"44.130.7.50\"\nb = [\"44.130.7.51\"]\n"
        ),
    )
    .unwrap();

    let output = hamlink_cmd()
        .args([
            &format!("--config={}", config.display()),
            "--no-cache",
            &replay(AP, "mikrotik-ap.walk"),
            &replay(STATION, "mikrotik-station.walk"),
            "-o",
            "json",
            "sweep",
            "--once",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);

    let ok = results.iter().find(|r| r["name"] == "db0abc-db0xyz").unwrap();
    assert_eq!(ok["details"]["details"][0]["rx_level_1at2"], -58.0);
    let dead = results.iter().find(|r| r["name"] == "dead").unwrap();
    assert!(dead["error"].as_str().unwrap().contains("44.130.7.50"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    hamlink_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[query]"));
}

#[test]
fn test_config_path_honours_flag() {
    hamlink_cmd()
        .args(["--config", "/tmp/somewhere/hamlink.toml", "config", "path"])
        .assert()
        .success()
        .stdout("/tmp/somewhere/hamlink.toml\n");
}

#[test]
fn test_config_show_redacts_password() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[query]\nlogin_user = \"monitor\"\nlogin_password = \"hunter2\"\n")
        .unwrap();
    hamlink_cmd()
        .args([&format!("--config={}", config.display()), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}
