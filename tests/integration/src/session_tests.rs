//! End-to-end tests for a running sync session
//!
//! A session is started against real temp directories with a short interval,
//! then the source is changed underneath it while it runs.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mirror_core::{ChangeEvent, ChangeKind, ConfigBuilder, SyncConfiguration, SyncLog, SyncSession};
use mirror_fs::RetryPolicy;
use mirror_test_utils::{TestTrees, listing};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(15);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(25));
    }
}

fn config(trees: &TestTrees, log_dir: &TempDir) -> SyncConfiguration {
    ConfigBuilder::new()
        .source(trees.source())
        .replica(trees.replica())
        .log_file(log_dir.path().join("mirror.log"))
        .interval_seconds(1)
        .retry(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(20),
        })
        .build()
        .unwrap()
}

fn replica_has(config: &SyncConfiguration, rel: &str) -> bool {
    config.replica_root().join(rel).exists()
}

#[test]
fn test_session_mirrors_and_follows_changes() {
    let trees = TestTrees::new();
    trees.write_source("initial.txt", "first");
    trees.write_replica("leftover.txt", "stale");
    let log_dir = TempDir::new().unwrap();
    let config = config(&trees, &log_dir);
    let log_path = config.log_path().to_path_buf();

    let session = SyncSession::start(config, Arc::new(SyncLog::open(&log_path))).unwrap();
    assert!(session.is_watching());

    wait_until("first pass", || session.stats().passes_completed >= 1);
    assert!(replica_has(session.config(), "initial.txt"));
    assert!(!replica_has(session.config(), "leftover.txt"));

    let source = session.config().source_root().to_path_buf();
    fs::create_dir(source.join("added")).unwrap();
    fs::write(source.join("added/later.txt"), "second").unwrap();
    fs::remove_file(source.join("initial.txt")).unwrap();

    wait_until("change to reach the replica", || {
        replica_has(session.config(), "added/later.txt")
            && !replica_has(session.config(), "initial.txt")
    });

    let stats = session.shutdown();
    assert!(stats.passes_completed >= 2);
    assert_eq!(listing(trees.source()), listing(trees.replica()));

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Monitoring changes in folder"), "log was:\n{log}");
    assert!(log.contains("Created - "), "log was:\n{log}");
    assert!(log.contains("Pass complete"));
    assert!(log.contains("Synchronization stopped"));
}

#[test]
fn test_session_reports_events_to_callback() {
    let trees = TestTrees::new();
    let log_dir = TempDir::new().unwrap();
    let config = config(&trees, &log_dir);
    let source = config.source_root().to_path_buf();

    let seen: Arc<Mutex<Vec<ChangeEvent>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let session = SyncSession::start_with(
        config,
        Arc::new(SyncLog::console_only()),
        Some(Arc::new(move |event: &ChangeEvent| {
            sink.lock().unwrap().push(event.clone());
        })),
    )
    .unwrap();

    fs::write(source.join("watched.txt"), "x").unwrap();

    let target: PathBuf = source.join("watched.txt");
    wait_until("created event", || {
        seen.lock()
            .unwrap()
            .iter()
            .any(|e| e.kind == ChangeKind::Created && e.path == target)
    });
    assert!(session.dirty().is_dirty() || session.stats().passes_completed > 0);

    session.shutdown();
}

#[test]
fn test_missing_source_during_pass_deletes_nothing() {
    let trees = TestTrees::new();
    trees.write_source("keep.txt", "keep");
    let log_dir = TempDir::new().unwrap();
    let config = config(&trees, &log_dir);

    let session = SyncSession::start(config, Arc::new(SyncLog::console_only())).unwrap();
    wait_until("first pass", || session.stats().passes_completed >= 1);

    // Source vanishes: passes fail to list it and must leave the replica alone
    let source = session.config().source_root().to_path_buf();
    fs::remove_dir_all(&source).unwrap();
    let before = session.stats().passes_completed;
    wait_until("another pass", || session.stats().passes_completed > before + 1);

    assert!(replica_has(session.config(), "keep.txt"));
    session.shutdown();
}

#[cfg(target_os = "linux")]
#[test]
fn test_lost_watch_is_restarted() {
    let trees = TestTrees::new();
    let log_dir = TempDir::new().unwrap();
    let config = config(&trees, &log_dir);
    let log_path = config.log_path().to_path_buf();
    let source = config.source_root().to_path_buf();

    let mut session = SyncSession::start(config, Arc::new(SyncLog::open(&log_path))).unwrap();
    assert!(session.is_watching());

    fs::remove_dir(&source).unwrap();
    wait_until("watch loss", || !session.is_watching());

    // Nothing to watch yet: the restart fails and says so
    assert!(!session.check_watch());

    fs::create_dir(&source).unwrap();
    assert!(session.check_watch());
    assert!(session.is_watching());

    session.shutdown();
    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("watch subscription failed"), "log was:\n{log}");
    assert!(log.contains("Restarting watch"));
}
