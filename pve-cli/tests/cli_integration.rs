//! Integration tests for the driver binary.
//!
//! These tests run the compiled binary and verify its output, error messages
//! and exit codes. None of them reach a Proxmox VE cluster.

use assert_cmd::Command;
use predicates::prelude::*;

const BIN: &str = "docker-machine-driver-proxmoxve";

/// A command with every driver environment variable cleared.
fn driver_cmd() -> Command {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    for var in [
        "PROXMOXVE_API_URL",
        "PROXMOXVE_USER",
        "PROXMOXVE_PASS",
        "PROXMOXVE_OTP",
        "PROXMOXVE_NODE",
        "PROXMOXVE_DEBUG",
        "MACHINE_NAME",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

// ==================== Flags Command Tests ====================

/// Flags command lists every flag with its env var and default
#[test]
fn test_flags_command_output() {
    driver_cmd()
        .arg("flags")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "flag=proxmoxve-api-url env=PROXMOXVE_API_URL default=",
        ))
        .stdout(predicate::str::contains(
            "flag=proxmoxve-user env=PROXMOXVE_USER default=root@pam",
        ))
        .stdout(predicate::str::contains(
            "flag=proxmoxve-pass env=PROXMOXVE_PASS default=",
        ))
        .stdout(predicate::str::contains(
            "flag=proxmoxve-otp env=PROXMOXVE_OTP default=",
        ))
        .stdout(predicate::str::contains(
            "flag=proxmoxve-node env=PROXMOXVE_NODE default=pve",
        ));
}

/// Flags output should be in key=value format
#[test]
fn test_flags_command_format() {
    let output = driver_cmd().arg("flags").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(stdout.lines().count(), 5);
    for line in stdout.lines() {
        assert!(
            line.split(' ').all(|pair| pair.contains('=')),
            "Each field should be key=value format, got: {}",
            line
        );
    }
}

// ==================== Config Command Tests ====================

/// Config command shows defaults when nothing is set
#[test]
fn test_config_defaults() {
    driver_cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("driver=proxmoxve"))
        .stdout(predicate::str::contains("machine_name=default"))
        .stdout(predicate::str::contains("user=root@pam"))
        .stdout(predicate::str::contains("node=pve"))
        .stdout(predicate::str::contains("otp_set=false"));
}

/// Environment variables populate the configuration
#[test]
fn test_config_from_env() {
    driver_cmd()
        .env("PROXMOXVE_API_URL", "https://pve:8006/api2/json")
        .env("PROXMOXVE_USER", "docker@pve")
        .env("PROXMOXVE_PASS", "hunter2")
        .env("PROXMOXVE_OTP", "123456")
        .env("PROXMOXVE_NODE", "node-b")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("api_url=https://pve:8006/api2/json"))
        .stdout(predicate::str::contains("user=docker@pve"))
        .stdout(predicate::str::contains("node=node-b"))
        .stdout(predicate::str::contains("otp_set=true"))
        .stdout(predicate::str::contains("hunter2").not());
}

/// Flags given on the command line override the environment
#[test]
fn test_config_flag_overrides_env() {
    driver_cmd()
        .env("PROXMOXVE_NODE", "node-b")
        .args(["config", "--proxmoxve-node", "node-c", "--machine-name", "m1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node=node-c"))
        .stdout(predicate::str::contains("machine_name=m1"));
}

// ==================== Static IP Tests ====================

/// A known IP answers ip/url/ssh-hostname without contacting the API
#[test]
fn test_static_ip_commands() {
    driver_cmd()
        .args(["ip", "--ip-address", "10.0.0.4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ip=10.0.0.4"));

    driver_cmd()
        .args(["url", "--ip-address", "10.0.0.4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("url=tcp://10.0.0.4:2376"));

    driver_cmd()
        .args(["ssh-hostname", "--ip-address", "10.0.0.4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ssh_hostname=10.0.0.4"));
}

// ==================== Error Tests ====================

/// Without an API URL, remote commands fail during authentication
#[test]
fn test_state_without_api_url_fails() {
    driver_cmd()
        .arg("state")
        .assert()
        .failure()
        .stdout(predicate::str::contains("state=error"))
        .stderr(predicate::str::contains("authentication failed"))
        .stderr(predicate::str::contains("invalid API URL"));
}

/// An unsupported URL scheme is rejected before any request
#[test]
fn test_start_with_bad_scheme_fails() {
    driver_cmd()
        .args(["start", "--proxmoxve-api-url", "ftp://pve/api2/json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported scheme"));
}

/// Unknown subcommands are rejected by argument parsing
#[test]
fn test_unknown_command_fails() {
    driver_cmd()
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ==================== Help Tests ====================

/// Help lists every lifecycle command
#[test]
fn test_help_lists_commands() {
    let assert = driver_cmd().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for command in [
        "flags", "config", "create", "state", "ip", "url", "ssh-hostname", "start", "stop",
        "kill", "restart", "remove",
    ] {
        assert!(stdout.contains(command), "help should mention {command}");
    }
    assert!(stdout.contains("--proxmoxve-api-url"));
}
