//! Integration tests for the `nmc` binary entry point.
//!
//! Covers usage output and the failure reported when the daemon socket is
//! missing.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn help_lists_subcommands() {
    let mut command = cargo_bin_cmd!("nmc");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("ping").and(contains("show")).and(contains("apply")));
}

#[test]
fn missing_subcommand_exits_with_failure() {
    let mut command = cargo_bin_cmd!("nmc");
    command.assert().failure().stderr(contains("Usage"));
}

#[test]
fn unreachable_daemon_exits_with_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let socket = dir.path().join("absent.sock");
    let mut command = cargo_bin_cmd!("nmc");
    command
        .arg("--daemon-socket")
        .arg(&socket)
        .arg("ping")
        .env_remove("NM_DAEMON_SOCKET");
    command
        .assert()
        .failure()
        .stderr(contains("failed to connect to daemon socket"));
}
