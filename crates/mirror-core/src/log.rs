//! The operation log: an append-only file plus the console
//!
//! Every component holds an `Arc<SyncLog>`. Lines are written whole under a
//! private lock, so concurrent callers never interleave within a line; the
//! order between callers is whatever the lock grants.
//!
//! The file is opened for appending on every line. A log that is deleted or
//! rotated while the mirror runs is recreated by the next line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Local;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Severity of an operation log line. Only affects the console side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Append-only operation log.
///
/// Never fails towards the caller: a line that cannot be written is reported
/// on the console and counted, and synchronization carries on.
#[derive(Debug)]
pub struct SyncLog {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
    failed_writes: AtomicU64,
}

impl SyncLog {
    /// Log to `path` (appending) and the console.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            write_lock: Mutex::new(()),
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Log to the console only.
    pub fn console_only() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
            failed_writes: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lines that reached the console but not the log file.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Error, message.as_ref());
    }

    pub fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "mirror::log", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "mirror::log", "{message}"),
            LogLevel::Error => tracing::error!(target: "mirror::log", "{message}"),
        }

        let Some(path) = &self.path else {
            return;
        };
        let line = format!("{}: {}\n", Local::now().format(TIMESTAMP_FORMAT), message);

        let _guard = self.lock();
        if let Err(e) = append_line(path, &line) {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            tracing::error!(?path, "Failed to write to log file: {e}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // A panic while holding the lock cannot leave a half-written line behind
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}
