//! Retrying file copier
//!
//! A source file may still be held by its writer when a pass reaches it. The
//! copier probes it with [`probe_ready`] under a fixed [`RetryPolicy`] and only
//! copies once the probe reports the file free.

use std::path::Path;
use std::time::Duration;

use backoff::backoff::Constant;

use crate::probe::{Readiness, probe_ready};
use crate::{Error, Result, io};

/// How long the copier waits for a locked source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of probes, including the first.
    pub max_attempts: u32,
    /// Pause between consecutive probes.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Longest time a single file can spend waiting before it is given up on.
    pub fn max_wait(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

/// Result of a successful copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    pub bytes: u64,
    /// Probes needed before the source was ready.
    pub attempts: u32,
}

/// Copies single files, waiting out transient lock contention on the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCopier {
    policy: RetryPolicy,
}

impl FileCopier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Probe `source` until it is ready, it fails hard, or the attempt budget runs out.
    ///
    /// Returns the number of probes used.
    pub fn wait_until_ready(&self, source: &Path) -> Result<u32> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0u32;

        let result = backoff::retry(Constant::new(self.policy.delay), || {
            attempts += 1;
            match probe_ready(source) {
                Readiness::Ready => Ok(()),
                Readiness::Locked => {
                    let locked = Error::Locked {
                        path: source.to_path_buf(),
                        attempts,
                    };
                    if attempts < max_attempts {
                        tracing::trace!(path = ?source, attempts, "Source locked, retrying");
                        Err(backoff::Error::transient(locked))
                    } else {
                        Err(backoff::Error::permanent(locked))
                    }
                }
                Readiness::Failed(e) => Err(backoff::Error::permanent(Error::io(source, e))),
            }
        });

        match result {
            Ok(()) => Ok(attempts),
            Err(backoff::Error::Permanent(e)) | Err(backoff::Error::Transient { err: e, .. }) => {
                Err(e)
            }
        }
    }

    /// Copy `source` over `destination` once the source is ready.
    ///
    /// The probe handle is released before the data is read, so a writer that
    /// resumes in between can still produce a torn copy. The destination itself
    /// is replaced atomically and is never seen half-written.
    pub fn copy(&self, source: &Path, destination: &Path) -> Result<CopyOutcome> {
        let attempts = match self.wait_until_ready(source) {
            Ok(attempts) => attempts,
            Err(e) => {
                // The caller decides how loudly to report this
                if let Error::Locked { attempts, .. } = &e {
                    tracing::debug!(
                        source = ?source,
                        destination = ?destination,
                        attempts,
                        "Source still locked, giving up"
                    );
                }
                return Err(e);
            }
        };

        let bytes = io::copy_atomic(source, destination)?;
        tracing::debug!(source = ?source, destination = ?destination, bytes, attempts, "Copied file");

        Ok(CopyOutcome { bytes, attempts })
    }
}
