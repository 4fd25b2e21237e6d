//! Outcome of a single reconciliation pass

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Why one entry could not be brought in line with the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The source file stayed locked for the whole retry budget
    Locked { attempts: u32 },
    PermissionDenied,
    Io,
    /// The pass ran past its timeout; remaining work was skipped
    DeadlineExceeded,
}

/// A path the pass could not handle, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    /// Record a filesystem error against `path`.
    pub fn from_error(path: impl Into<PathBuf>, error: &mirror_fs::Error) -> Self {
        let kind = match error {
            mirror_fs::Error::Locked { attempts, .. } => FailureKind::Locked {
                attempts: *attempts,
            },
            mirror_fs::Error::PermissionDenied { .. } => FailureKind::PermissionDenied,
            _ => FailureKind::Io,
        };
        Self {
            path: path.into(),
            kind,
            reason: error.to_string(),
        }
    }

    pub fn deadline(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            kind: FailureKind::DeadlineExceeded,
            reason: format!("pass exceeded its {timeout:?} timeout, remaining entries skipped"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Counts and failures for one pass. Logged, then dropped.
///
/// In a dry run the counts describe what the pass would have done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub files_copied: usize,
    pub files_deleted: usize,
    pub dirs_created: usize,
    pub dirs_deleted: usize,
    pub failures: Vec<Failure>,
    pub dry_run: bool,
    pub duration: Duration,
}

impl ReconciliationResult {
    /// Total number of replica mutations.
    pub fn changes(&self) -> usize {
        self.files_copied + self.files_deleted + self.dirs_created + self.dirs_deleted
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Nothing changed and nothing failed: the replica was already a mirror.
    pub fn is_clean(&self) -> bool {
        self.changes() == 0 && !self.has_failures()
    }
}

impl fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "[dry-run] ")?;
        }
        write!(
            f,
            "Pass complete in {:.3}s: {} copied, {} deleted, {} dirs created, {} dirs deleted, {} failed",
            self.duration.as_secs_f64(),
            self.files_copied,
            self.files_deleted,
            self.dirs_created,
            self.dirs_deleted,
            self.failures.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_follows_error_variant() {
        let locked = mirror_fs::Error::Locked {
            path: "a".into(),
            attempts: 10,
        };
        let denied = mirror_fs::Error::PermissionDenied { path: "b".into() };
        let io = mirror_fs::Error::io("c", std::io::Error::other("disk gone"));

        assert_eq!(
            Failure::from_error("a", &locked).kind,
            FailureKind::Locked { attempts: 10 }
        );
        assert_eq!(
            Failure::from_error("b", &denied).kind,
            FailureKind::PermissionDenied
        );
        assert_eq!(Failure::from_error("c", &io).kind, FailureKind::Io);
    }

    #[test]
    fn summary_lists_every_count() {
        let result = ReconciliationResult {
            files_copied: 2,
            files_deleted: 1,
            dirs_created: 3,
            duration: Duration::from_millis(1500),
            ..Default::default()
        };

        assert_eq!(
            result.to_string(),
            "Pass complete in 1.500s: 2 copied, 1 deleted, 3 dirs created, 0 dirs deleted, 0 failed"
        );
        assert_eq!(result.changes(), 6);
        assert!(!result.is_clean());
    }

    #[test]
    fn empty_result_is_clean() {
        assert!(ReconciliationResult::default().is_clean());
    }
}
