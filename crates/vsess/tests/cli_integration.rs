//! CLI integration tests for the vsess command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Offline commands produce the expected output
//! - Bad configuration is rejected before any network traffic
//!
//! Note: These tests do not require a vCenter - commands that need one
//! are only exercised up to their configuration checks.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

/// Get a command for the vsess binary.
fn vsess() -> Command {
    let mut cmd = Command::cargo_bin("vsess").unwrap();
    cmd.env_remove("VSESS_CONFIG")
        .env_remove("VSESS_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    vsess()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vsess"))
        .stdout(predicate::str::contains("vCenter"));
}

#[test]
fn test_version_displays() {
    vsess()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vsess"));
}

#[test]
fn test_help_lists_subcommands() {
    vsess()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("find"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("encode"))
        .stdout(predicate::str::contains("provider-id"));
}

#[test]
fn test_find_help_mentions_instance() {
    vsess()
        .args(["find", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--instance"));
}

#[test]
fn test_unknown_subcommand_fails() {
    vsess().arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_provider_id() {
    vsess()
        .args(["provider-id", "42108d47-0a54-5b1c-a3c0-7f3c5d8e9a10"])
        .assert()
        .success()
        .stdout("vsphere://42108d47-0a54-5b1c-a3c0-7f3c5d8e9a10\n");
}

#[test]
fn test_provider_id_json() {
    vsess()
        .args(["--json", "provider-id", "42108d47-0a54-5b1c-a3c0-7f3c5d8e9a10"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#""providerID": "vsphere://42108d47-0a54-5b1c-a3c0-7f3c5d8e9a10""#,
        ));
}

#[test]
fn test_provider_id_rejects_invalid_uuid() {
    vsess()
        .args(["provider-id", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid UUID"));
}

#[test]
fn test_encode_cloud_config() {
    let payload = file_with("#cloud-config\nhostname: node-1\n");
    vsess()
        .arg("encode")
        .arg(payload.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "guestinfo.userdata=I2Nsb3VkLWNvbmZpZwpob3N0bmFtZTogbm9kZS0xCg==",
        ))
        .stdout(predicate::str::contains("guestinfo.userdata.encoding=base64"));
}

#[test]
fn test_encode_ignition_with_hostname() {
    let payload = file_with(r#"{"ignition":{"version":"2.3.0"}}"#);
    vsess()
        .args(["encode", "--format", "ignition", "--hostname", "cp-0"])
        .arg(payload.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("guestinfo.ignition.config.data="))
        .stdout(predicate::str::contains(
            "guestinfo.ignition.config.data.encoding=base64",
        ));
}

#[test]
fn test_encode_hostname_requires_ignition() {
    let payload = file_with("#cloud-config\n");
    vsess()
        .args(["encode", "--hostname", "node-1"])
        .arg(payload.path())
        .assert()
        .failure();
}

#[test]
fn test_encode_rejects_unknown_format() {
    let payload = file_with("{}");
    vsess()
        .args(["encode", "--format", "kickstart"])
        .arg(payload.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("kickstart"));
}

#[test]
fn test_encode_missing_file_fails() {
    vsess()
        .args(["encode", "/nonexistent/user-data"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_check_with_missing_config_file_fails() {
    vsess()
        .args(["--config", "/nonexistent/vsess.toml", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_check_without_vcenter_section_fails() {
    let config = file_with("[tls]\ninsecure = true\n");
    vsess()
        .arg("--config")
        .arg(config.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vcenter"));
}

#[test]
fn test_find_without_password_fails() {
    let config = file_with(
        "[vcenter]\nserver = \"vc.invalid\"\nusername = \"admin\"\n\n[tls]\ninsecure = true\n",
    );
    vsess()
        .arg("--config")
        .arg(config.path())
        .args(["find", "42108d47-0a54-5b1c-a3c0-7f3c5d8e9a10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password not found"));
}

#[test]
fn test_check_without_tls_choice_fails() {
    let config = file_with(
        "[vcenter]\nserver = \"vc.invalid\"\nusername = \"admin\"\npassword = \"secret\"\n",
    );
    vsess()
        .arg("--config")
        .arg(config.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("thumbprint"));
}
