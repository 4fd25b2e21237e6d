//! Raw, possibly incomplete settings as read from a file or the command line

use std::path::{Path, PathBuf};
use std::time::Duration;

use mirror_fs::{ConfigStore, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::Result;

/// One layer of settings. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorSettings {
    /// Directory to mirror from
    pub source: Option<PathBuf>,

    /// Directory to mirror into
    pub replica: Option<PathBuf>,

    /// Append-only operation log
    pub log_file: Option<PathBuf>,

    /// Seconds between reconciliation passes
    pub interval_seconds: Option<u64>,

    /// Upper bound on a single pass; unset means passes always run to completion
    pub pass_timeout_seconds: Option<u64>,

    pub retry: RetrySettings,
}

/// Retry budget for locked source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
}

impl RetrySettings {
    /// Fill unset fields from the default policy.
    pub fn policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(default.max_attempts),
            delay: self
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(default.delay),
        }
    }
}

impl MirrorSettings {
    /// Load a settings layer from a file; format follows the extension.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(?path, "Loading settings file");
        Ok(ConfigStore::new().load(path)?)
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: MirrorSettings) -> Self {
        Self {
            source: other.source.or(self.source),
            replica: other.replica.or(self.replica),
            log_file: other.log_file.or(self.log_file),
            interval_seconds: other.interval_seconds.or(self.interval_seconds),
            pass_timeout_seconds: other.pass_timeout_seconds.or(self.pass_timeout_seconds),
            retry: RetrySettings {
                max_attempts: other.retry.max_attempts.or(self.retry.max_attempts),
                delay_ms: other.retry.delay_ms.or(self.retry.delay_ms),
            },
        }
    }
}
