//! Integration tests for the mirror CLI binary.
//!
//! These tests exercise the actual compiled binary using assert_cmd.

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get a Command for the mirror binary with no settings leaking in from the environment
fn mirror_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mirror"));
    for var in [
        "MIRROR_CONFIG",
        "MIRROR_SOURCE",
        "MIRROR_REPLICA",
        "MIRROR_LOG_FILE",
        "MIRROR_INTERVAL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A source with a couple of files, an empty replica location and a log path
/// outside both.
struct Workspace {
    root: TempDir,
    source: assert_fs::fixture::ChildPath,
    replica: assert_fs::fixture::ChildPath,
    log: assert_fs::fixture::ChildPath,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let source = root.child("source");
        source.child("hello.txt").write_str("hello").unwrap();
        source.child("nested/deep.txt").write_str("deep").unwrap();
        let replica = root.child("replica");
        let log = root.child("mirror.log");
        Self {
            root,
            source,
            replica,
            log,
        }
    }

    fn args<'a>(&'a self, command: &'a str) -> Vec<&'a std::ffi::OsStr> {
        vec![
            command.as_ref(),
            "--source".as_ref(),
            self.source.path().as_os_str(),
            "--replica".as_ref(),
            self.replica.path().as_os_str(),
            "--log-file".as_ref(),
            self.log.path().as_os_str(),
            "--interval".as_ref(),
            "1".as_ref(),
        ]
    }
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    mirror_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("once"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version_output() {
    mirror_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mirror"));
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_accepts_valid_configuration() {
    let ws = Workspace::new();

    mirror_cmd()
        .args(ws.args("check"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));

    // The replica is created on demand
    ws.replica.assert(predicate::path::is_dir());
}

#[test]
fn test_check_rejects_same_source_and_replica() {
    let ws = Workspace::new();

    mirror_cmd()
        .args(["check", "--interval", "1"])
        .arg("--source")
        .arg(ws.source.path())
        .arg("--replica")
        .arg(ws.source.path())
        .arg("--log-file")
        .arg(ws.log.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("different directories"));
}

#[test]
fn test_check_rejects_zero_interval() {
    let ws = Workspace::new();
    let mut args = ws.args("check");
    args.pop();
    args.push("0".as_ref());

    mirror_cmd()
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

#[test]
fn test_check_reports_missing_source() {
    let ws = Workspace::new();

    mirror_cmd()
        .args(["check", "--interval", "1"])
        .arg("--source")
        .arg(ws.source.child("absent").path())
        .arg("--replica")
        .arg(ws.replica.path())
        .arg("--log-file")
        .arg(ws.log.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_settings_file_and_flag_override() {
    let ws = Workspace::new();
    let config = ws.root.child("mirror.json");
    let settings = serde_json::json!({
        "source": ws.source.path(),
        "replica": ws.replica.path(),
        "log_file": ws.log.path(),
        "interval_seconds": 600,
    });
    config.write_str(&settings.to_string()).unwrap();

    mirror_cmd()
        .arg("check")
        .arg("--config")
        .arg(config.path())
        .args(["--interval", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7s"));
}

#[test]
fn test_settings_from_environment() {
    let ws = Workspace::new();

    mirror_cmd()
        .arg("check")
        .env("MIRROR_SOURCE", ws.source.path())
        .env("MIRROR_REPLICA", ws.replica.path())
        .env("MIRROR_LOG_FILE", ws.log.path())
        .env("MIRROR_INTERVAL", "3")
        .assert()
        .success();
}

#[test]
fn test_unknown_settings_file_format_is_rejected() {
    let ws = Workspace::new();
    let config = ws.root.child("mirror.ini");
    config.write_str("source = x").unwrap();

    mirror_cmd()
        .arg("check")
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported config format"));
}

// ============================================================================
// once
// ============================================================================

#[test]
fn test_once_mirrors_source() {
    let ws = Workspace::new();
    ws.replica.child("stale.txt").write_str("stale").unwrap();

    mirror_cmd()
        .args(ws.args("once"))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 copied, 1 deleted"));

    ws.replica.child("hello.txt").assert("hello");
    ws.replica.child("nested/deep.txt").assert("deep");
    ws.replica.child("stale.txt").assert(predicate::path::missing());
    ws.log.assert(predicate::str::contains("Copied "));
}

#[test]
fn test_once_twice_is_idempotent() {
    let ws = Workspace::new();

    mirror_cmd().args(ws.args("once")).assert().success();
    mirror_cmd()
        .args(ws.args("once"))
        .assert()
        .success()
        .stdout(predicate::str::contains("0 copied, 0 deleted, 0 dirs created, 0 dirs deleted"));
}

#[test]
fn test_once_dry_run_leaves_replica_alone() {
    let ws = Workspace::new();
    ws.replica.child("stale.txt").write_str("stale").unwrap();

    let mut args = ws.args("once");
    args.push("--dry-run".as_ref());
    mirror_cmd()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"));

    ws.replica.child("stale.txt").assert("stale");
    ws.replica.child("hello.txt").assert(predicate::path::missing());
}

#[test]
fn test_once_does_not_need_an_interval() {
    let ws = Workspace::new();
    let mut args = ws.args("once");
    args.truncate(args.len() - 2);

    mirror_cmd()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 copied"));

    ws.replica.child("hello.txt").assert("hello");
}

#[test]
fn test_check_still_requires_an_interval() {
    let ws = Workspace::new();
    let mut args = ws.args("check");
    args.truncate(args.len() - 2);

    mirror_cmd()
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval is required"));
}
