//! Integration tests for the `homegate` CLI binary.
//!
//! Argument parsing, help output, completions and error exits run without
//! a gateway; the live tests point the binary at a local mock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `homegate` binary with env isolation.
///
/// Clears all `HOMEGATE_*` env vars and points config and data
/// directories at `home` so tests never touch the user's real state.
fn homegate_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("homegate");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("HOMEGATE_PROFILE")
        .env_remove("HOMEGATE_ADDRESS")
        .env_remove("HOMEGATE_USERNAME")
        .env_remove("HOMEGATE_PASSWORD")
        .env_remove("HOMEGATE_MOCK")
        .env_remove("HOMEGATE_OUTPUT")
        .env_remove("HOMEGATE_TIMEOUT")
        .env_remove("HOMEGATE_ENVIRONMENT");
    cmd
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
    let home = TempDir::new().unwrap();
    let output = homegate_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("home gateway")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("restart"))
            .and(predicate::str::contains("advice")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("homegate"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("homegate"));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .arg("frobnicate")
        .assert()
        .code(2);
}

// ── Mock mode ───────────────────────────────────────────────────────

#[test]
fn test_mock_devices_list_json() {
    let home = TempDir::new().unwrap();
    let output = homegate_cmd(home.path())
        .args(["--mock", "devices", "list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["hostname"].as_str().unwrap())
        .collect();
    assert_eq!(names.first(), Some(&"Alpha-Laptop"));
    assert!(names.contains(&"old-tablet"));
}

#[test]
fn test_mock_devices_list_plain_prints_macs() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "devices", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^([0-9a-f]{2}:){5}[0-9a-f]{2}$").unwrap());
}

#[test]
fn test_mock_status_json() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "status", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TG1682G"));
}

#[test]
fn test_mock_advice_mentions_mock_mode() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "advice", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mock mode"));
}

#[test]
fn test_restart_without_yes_refuses_non_interactive() {
    let home = TempDir::new().unwrap();
    let output = homegate_cmd(home.path())
        .args(["--mock", "restart"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_mock_restart_with_yes() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "restart", "-y"])
        .assert()
        .success()
        .stderr(predicate::str::contains("90s"));
}

#[test]
fn test_mock_block_known_device() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "devices", "block", "a4:83:e7:5c:10:9d", "-y"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Blocked a4:83:e7:5c:10:9d"));
}

#[test]
fn test_invalid_mac_is_usage_error() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "devices", "traffic", "not-a-mac"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a MAC address"));
}

#[test]
fn test_traffic_for_unknown_device_is_not_found() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "devices", "traffic", "00:00:00:00:00:01"])
        .assert()
        .code(4);
}

// ── Block schedule ──────────────────────────────────────────────────

#[test]
fn test_schedule_add_list_remove_persists_in_state_file() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args([
            "devices", "schedule", "add", "A4-83-E7-5C-10-9D", "--from", "22:00", "--until", "06:30",
            "--days", "fri,sat",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Block a4:83:e7:5c:10:9d during 22:00-06:30 (Fri,Sat)"));

    let output = homegate_cmd(home.path())
        .args(["devices", "schedule", "list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entry = &entries.as_array().unwrap()[0];
    assert_eq!(entry["mac"], "a4:83:e7:5c:10:9d");
    assert_eq!(entry["start"], "22:00:00");
    assert_eq!(entry["days"], serde_json::json!(["Fri", "Sat"]));

    homegate_cmd(home.path())
        .args(["devices", "schedule", "remove", "a4:83:e7:5c:10:9d"])
        .assert()
        .success();
    homegate_cmd(home.path())
        .args(["devices", "schedule", "remove", "a4:83:e7:5c:10:9d"])
        .assert()
        .code(4);
}

#[test]
fn test_schedule_rejects_bad_time() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["devices", "schedule", "add", "a4:83:e7:5c:10:9d", "--from", "late", "--until", "06:00"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("HH:MM"));
}

#[test]
fn test_mock_schedule_apply_with_nothing_scheduled() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["--mock", "devices", "schedule", "apply"])
        .assert()
        .success()
        .stderr(predicate::str::contains("already in place"));
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_unknown_profile_is_not_found() {
    let home = TempDir::new().unwrap();
    let output = homegate_cmd(home.path())
        .args(["--profile", "nope", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("nope"));
}

#[test]
fn test_config_path_points_into_config_home() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_profiles_read_from_file() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("config").join("homegate");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        r#"
default_profile = "home"

[profiles.home]
address = "http://10.0.0.1/"
mock = true

[profiles.cabin]
address = "http://192.168.1.1/"
"#,
    )
    .unwrap();

    homegate_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("home *").and(predicate::str::contains("cabin")));

    // The mock profile serves fixtures without --mock.
    homegate_cmd(home.path())
        .args(["status", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TG1682G"));
}

// ── Restricted environment ──────────────────────────────────────────

#[test]
fn test_restricted_environment_falls_back_with_warning() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .env("HOMEGATE_ENVIRONMENT", "restricted-browser")
        .args(["devices", "list", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alpha-Laptop"))
        .stderr(predicate::str::contains("sample data"));
}

#[test]
fn test_restricted_environment_check_fails() {
    let home = TempDir::new().unwrap();
    homegate_cmd(home.path())
        .env("HOMEGATE_ENVIRONMENT", "restricted-browser")
        .arg("check")
        .assert()
        .code(7);
}

// ── Live gateway ────────────────────────────────────────────────────

fn devices_page() -> String {
    r##"<html><body><div id="online-private"><table>
<tr><th>Host Name</th><th>DHCP/Reserved IP</th><th>Connection Type</th><th>RSSI Level</th><th>&nbsp;</th></tr>
<tr>
  <td headers="host-name"><a href="javascript:void(0)" class="label device-name">Den-Speaker</a>
    <div class="device-info"><dl>
      <dd><b>IPv4 Address</b>10.0.0.77</dd>
      <dd><b>MAC Address</b>AA:BB:CC:00:00:77</dd>
    </dl></div></td>
  <td headers="dhcp">DHCP</td>
  <td headers="connection">Wi-Fi 5G</td>
  <td headers="rssi">-55 dBm</td>
  <td headers="edit-device"><a href="#" class="btn block-device">Block</a></td>
</tr>
<tr class="table-footer"><td colspan="5">&nbsp;</td></tr>
</table></div></body></html>"##
        .to_owned()
}

async fn mount_gateway(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form id=\"pageForm\"></form>"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/check.jst"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "at_a_glance.jst")
                .insert_header("Set-Cookie", "DUKSID=cli; Path=/"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/at_a_glance.jst"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/connected_devices_computers.jst"))
        .respond_with(ResponseTemplate::new(200).set_body_string(devices_page()))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_check_reports_address() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    let home = TempDir::new().unwrap();
    let home_path = home.path().to_owned();
    let address = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        homegate_cmd(&home_path)
            .args(["--address", &address, "check"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Gateway reachable at"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_devices_list_logs_in_and_parses() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    let home = TempDir::new().unwrap();
    let home_path = home.path().to_owned();
    let address = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        homegate_cmd(&home_path)
            .env("HOMEGATE_USERNAME", "admin")
            .env("HOMEGATE_PASSWORD", "hunter2")
            .args(["--address", &address, "devices", "list", "-o", "json"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Den-Speaker"), "{stdout}");
    assert!(stdout.contains("aa:bb:cc:00:00:77"), "{stdout}");

    let logins = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/check.jst")
        .count();
    assert_eq!(logins, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_traffic_reads_only_the_traffic_page() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;
    Mock::given(method("GET"))
        .and(path("/network_traffic.jst"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div id="traffic-stats"><table>
<tr><th>MAC Address</th><th>Bytes Sent</th><th>Bytes Received</th></tr>
<tr><td>AA:BB:CC:00:00:77</td><td>1,500</td><td>98,304</td></tr>
</table></div>"#,
        ))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    let home_path = home.path().to_owned();
    let address = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        homegate_cmd(&home_path)
            .env("HOMEGATE_USERNAME", "admin")
            .env("HOMEGATE_PASSWORD", "hunter2")
            .args(["--address", &address, "devices", "traffic", "aa:bb:cc:00:00:77", "-o", "plain"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1500 98304");

    let device_page_reads = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/connected_devices_computers.jst")
        .count();
    assert_eq!(device_page_reads, 0);
}
