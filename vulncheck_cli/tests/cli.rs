use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("exploits"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_lookup_requires_a_value() {
    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.arg("lookup")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_lookup_rejects_only_unrecognized_values() {
    let config_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_dir.path())
        .arg("lookup")
        .arg("not-an-indicator")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Skipping unrecognized value"))
        .stderr(predicate::str::contains("No recognizable indicators"));
}

#[test]
fn test_details_rejects_non_cve_value() {
    let config_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_dir.path())
        .arg("details")
        .arg("8.8.8.8")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a CVE identifier"));
}

#[test]
fn test_lookup_private_addresses_needs_no_network() {
    // Non-routable addresses are dropped before any request is made,
    // so this succeeds without a reachable API.
    let config_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_dir.path())
        .env("VULNCHECK_CLIENT__API_KEY", "test-key")
        .arg("lookup")
        .arg("10.0.0.1")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_config_set_then_get() {
    let config_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_dir.path())
        .arg("config")
        .arg("set")
        .arg("client.max_concurrent_lookups")
        .arg("6")
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_dir.path())
        .arg("config")
        .arg("get")
        .arg("client.max_concurrent_lookups")
        .assert()
        .success()
        .stdout(predicate::str::contains("6"));
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let config_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_dir.path())
        .arg("config")
        .arg("set")
        .arg("client.max_concurrent_lookups")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_config_path_honors_xdg_override() {
    let config_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_dir.path())
        .arg("config")
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains("vulncheck"))
        .stdout(predicate::str::contains(config_dir.path().to_str().unwrap()));
}

#[test]
fn test_completions_bash() {
    let mut cmd = Command::cargo_bin("vulncheck").unwrap();
    cmd.arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("_vulncheck"));
}
