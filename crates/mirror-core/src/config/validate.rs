//! Validation of merged settings into a [`SyncConfiguration`]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mirror_fs::RetryPolicy;
use mirror_fs::path::{canonical, is_within};

use super::settings::MirrorSettings;
use crate::{Error, Result};

/// Everything a sync session needs, validated and immutable.
///
/// Only [`ConfigBuilder::build`] creates one, so holding a `SyncConfiguration`
/// means: both roots are existing, distinct, non-nested directories; the
/// source is readable and the replica writable; the interval is positive; and
/// the log file can be created outside both trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfiguration {
    source_root: PathBuf,
    replica_root: PathBuf,
    log_path: PathBuf,
    interval: Duration,
    pass_timeout: Option<Duration>,
    retry: RetryPolicy,
}

impl SyncConfiguration {
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn replica_root(&self) -> &Path {
        &self.replica_root
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Time between scheduled reconciliation passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn pass_timeout(&self) -> Option<Duration> {
        self.pass_timeout
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

/// Collects settings and validates them into a [`SyncConfiguration`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    settings: MirrorSettings,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: MirrorSettings) -> Self {
        Self { settings }
    }

    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.source = Some(path.into());
        self
    }

    pub fn replica(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.replica = Some(path.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.log_file = Some(path.into());
        self
    }

    pub fn interval_seconds(mut self, seconds: u64) -> Self {
        self.settings.interval_seconds = Some(seconds);
        self
    }

    pub fn pass_timeout_seconds(mut self, seconds: u64) -> Self {
        self.settings.pass_timeout_seconds = Some(seconds);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.settings.retry.max_attempts = Some(policy.max_attempts);
        let delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX);
        self.settings.retry.delay_ms = Some(delay_ms);
        self
    }

    /// Validate the collected settings.
    ///
    /// Creates the replica directory if it does not exist yet. Every other
    /// check is read-only apart from short-lived writability probes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] naming the first rule that failed.
    pub fn build(self) -> Result<SyncConfiguration> {
        let settings = self.settings;

        let source = settings
            .source
            .ok_or_else(|| Error::config("source directory is required"))?;
        let replica = settings
            .replica
            .ok_or_else(|| Error::config("replica directory is required"))?;
        let log_file = settings
            .log_file
            .ok_or_else(|| Error::config("log file path is required"))?;

        let interval = match settings.interval_seconds {
            Some(0) => return Err(Error::config("interval must be greater than zero seconds")),
            Some(seconds) => Duration::from_secs(seconds),
            None => return Err(Error::config("interval is required")),
        };

        let pass_timeout = match settings.pass_timeout_seconds {
            Some(0) => return Err(Error::config("pass timeout must be greater than zero seconds")),
            other => other.map(Duration::from_secs),
        };

        let retry = settings.retry.policy();
        if retry.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1"));
        }

        let source_root = existing_dir(&source, "source")?;
        if let Err(e) = fs::read_dir(&source_root) {
            return Err(Error::config(format!(
                "source {} is not readable: {e}",
                source_root.display()
            )));
        }

        // Nesting is checked before the replica is created on demand
        let replica_target = prospective(&replica)?;
        if source_root == replica_target {
            return Err(Error::config("source and replica must be different directories"));
        }
        if is_within(&replica_target, &source_root) {
            return Err(Error::config("replica must not be inside the source directory"));
        }
        if is_within(&source_root, &replica_target) {
            return Err(Error::config("source must not be inside the replica directory"));
        }

        if !replica.exists() {
            tracing::info!(?replica, "Creating replica directory");
            fs::create_dir_all(&replica).map_err(|e| {
                Error::config(format!("cannot create replica {}: {e}", replica.display()))
            })?;
        }
        let replica_root = existing_dir(&replica, "replica")?;
        mirror_fs::io::probe_writable(&replica_root).map_err(|e| {
            Error::config(format!("replica {} is not writable: {e}", replica_root.display()))
        })?;

        let log_path = validate_log_path(&log_file)?;
        // A log inside the source would feed its own change events; inside the replica it gets deleted
        if is_within(&log_path, &source_root) || is_within(&log_path, &replica_root) {
            return Err(Error::config("log file must live outside the source and replica"));
        }

        Ok(SyncConfiguration {
            source_root,
            replica_root,
            log_path,
            interval,
            pass_timeout,
            retry,
        })
    }
}

fn existing_dir(path: &Path, role: &str) -> Result<PathBuf> {
    let resolved = canonical(path).map_err(|_| {
        Error::config(format!("{role} directory {} does not exist", path.display()))
    })?;
    if !resolved.is_dir() {
        return Err(Error::config(format!(
            "{role} {} is not a directory",
            path.display()
        )));
    }
    Ok(resolved)
}

/// Canonical form of a path that may not exist yet: the nearest existing
/// ancestor is canonicalized and the missing components appended.
fn prospective(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
            return Err(Error::config(format!("cannot resolve {}", path.display())));
        };
        missing.push(name.to_os_string());
        existing = parent;
    }

    let mut resolved = canonical(existing)?;
    resolved.extend(missing.iter().rev());
    Ok(resolved)
}

fn validate_log_path(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        return Err(Error::config(format!(
            "log path {} is a directory, not a file",
            path.display()
        )));
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::config(format!("log path {} has no file name", path.display())))?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = existing_dir(parent, "log")?;
    mirror_fs::io::probe_writable(&parent).map_err(|e| {
        Error::config(format!("log directory {} is not writable: {e}", parent.display()))
    })?;

    Ok(parent.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Dirs {
        _root: TempDir,
        source: PathBuf,
        replica: PathBuf,
        log: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source");
        let replica = root.path().join("replica");
        fs::create_dir(&source).unwrap();
        fs::create_dir(&replica).unwrap();
        let log = root.path().join("mirror.log");
        Dirs {
            _root: root,
            source,
            replica,
            log,
        }
    }

    fn builder(d: &Dirs) -> ConfigBuilder {
        ConfigBuilder::new()
            .source(&d.source)
            .replica(&d.replica)
            .log_file(&d.log)
            .interval_seconds(10)
    }

    fn reason(result: Result<SyncConfiguration>) -> String {
        match result {
            Err(Error::ConfigInvalid { reason }) => reason,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn valid_settings_build() {
        let d = dirs();
        let config = builder(&d).build().unwrap();

        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.pass_timeout(), None);
        assert_eq!(config.retry(), RetryPolicy::default());
        assert!(config.source_root().is_absolute());
    }

    #[test]
    fn missing_replica_is_created() {
        let d = dirs();
        let replica = d.replica.join("fresh");

        let config = builder(&d).replica(&replica).build().unwrap();

        assert!(replica.is_dir());
        assert_eq!(config.replica_root(), canonical(&replica).unwrap());
    }

    #[test]
    fn oversized_retry_delay_saturates() {
        let d = dirs();
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::MAX,
        };

        let config = builder(&d).retry(policy).build().unwrap();

        assert_eq!(config.retry().delay, Duration::from_millis(u64::MAX));
        assert_eq!(config.retry().max_attempts, 2);
    }

    #[test]
    fn zero_interval_rejected() {
        let d = dirs();
        assert!(reason(builder(&d).interval_seconds(0).build()).contains("greater than zero"));
    }

    #[test]
    fn same_directory_rejected() {
        let d = dirs();
        assert!(reason(builder(&d).replica(&d.source).build()).contains("different"));
    }

    #[test]
    fn nested_replica_rejected() {
        let d = dirs();
        let nested = d.source.join("mirror");
        assert!(reason(builder(&d).replica(&nested).build()).contains("inside the source"));
    }

    #[test]
    fn nested_replica_is_not_created() {
        let d = dirs();
        let nested = d.source.join("a/b");
        let _ = builder(&d).replica(&nested).build();
        assert!(!d.source.join("a").exists());
    }

    #[test]
    fn source_inside_replica_rejected() {
        let d = dirs();
        let inner = d.replica.join("inner");
        fs::create_dir(&inner).unwrap();
        assert!(reason(builder(&d).source(&inner).build()).contains("inside the replica"));
    }

    #[test]
    fn missing_source_rejected() {
        let d = dirs();
        let missing = d.source.join("nope");
        assert!(reason(builder(&d).source(&missing).build()).contains("does not exist"));
    }

    #[test]
    fn log_path_directory_rejected() {
        let d = dirs();
        let log_dir = d.log.with_file_name("logs");
        fs::create_dir(&log_dir).unwrap();
        assert!(reason(builder(&d).log_file(&log_dir).build()).contains("is a directory"));
    }

    #[test]
    fn log_inside_source_rejected() {
        let d = dirs();
        let log = d.source.join("mirror.log");
        assert!(reason(builder(&d).log_file(&log).build()).contains("outside"));
    }

    #[test]
    fn zero_retry_attempts_rejected() {
        let d = dirs();
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::from_millis(1),
        };
        assert!(reason(builder(&d).retry(policy).build()).contains("max_attempts"));
    }
}
