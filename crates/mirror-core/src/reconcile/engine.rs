//! The recursive reconciliation walk

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mirror_fs::{DirSnapshot, Entry, FileCopier, FsReplica, FsTree, ReplicaTree, TreeReader};

use super::plan::{Action, plan_level};
use super::result::{Failure, ReconciliationResult};
use crate::config::SyncConfiguration;
use crate::log::SyncLog;

/// Anything that can run a reconciliation pass between two directories.
///
/// The scheduler only depends on this trait, so tests can drive it with
/// passes of controlled length.
pub trait Reconcile: Send + Sync {
    fn reconcile(&self, source: &Path, replica: &Path) -> ReconciliationResult;
}

/// Per-engine switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Count and log what would change, but mutate nothing
    pub dry_run: bool,
    /// Give up on the rest of a pass once it has run this long
    pub pass_timeout: Option<Duration>,
}

/// Walks a source/replica pair and makes the replica an exact copy.
///
/// Errors on individual entries are logged and recorded in the result; they
/// never stop the walk.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    copier: FileCopier,
    options: ReconcileOptions,
    log: Arc<SyncLog>,
}

impl ReconciliationEngine {
    pub fn new(copier: FileCopier, log: Arc<SyncLog>) -> Self {
        Self {
            copier,
            options: ReconcileOptions::default(),
            log,
        }
    }

    pub fn from_config(config: &SyncConfiguration, log: Arc<SyncLog>) -> Self {
        Self::new(FileCopier::new(config.retry()), log).with_options(ReconcileOptions {
            dry_run: false,
            pass_timeout: config.pass_timeout(),
        })
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Run one pass over arbitrary tree views.
    pub fn reconcile_trees<S, R>(&self, source: &S, replica: &mut R) -> ReconciliationResult
    where
        S: TreeReader,
        R: ReplicaTree,
    {
        let started = Instant::now();
        let mut pass = Pass {
            engine: self,
            source,
            replica,
            deadline: self.options.pass_timeout.map(|timeout| started + timeout),
            expired: false,
            result: ReconciliationResult {
                dry_run: self.options.dry_run,
                ..Default::default()
            },
        };

        pass.level(Path::new(""), false);

        let mut result = pass.result;
        result.duration = started.elapsed();
        result
    }
}

impl Reconcile for ReconciliationEngine {
    fn reconcile(&self, source: &Path, replica: &Path) -> ReconciliationResult {
        let source = FsTree::new(source);
        let mut replica = FsReplica::new(replica, self.copier);
        self.reconcile_trees(&source, &mut replica)
    }
}

/// State of one walk in progress.
struct Pass<'a, S, R> {
    engine: &'a ReconciliationEngine,
    source: &'a S,
    replica: &'a mut R,
    deadline: Option<Instant>,
    expired: bool,
    result: ReconciliationResult,
}

impl<S: TreeReader, R: ReplicaTree> Pass<'_, S, R> {
    fn dry_run(&self) -> bool {
        self.engine.options.dry_run
    }

    fn log(&self) -> &SyncLog {
        &self.engine.log
    }

    /// Reconcile the directory `rel`. `fresh` marks a replica directory this
    /// pass has just created (or, in a dry run, would have created).
    fn level(&mut self, rel: &Path, fresh: bool) {
        if self.past_deadline(rel) {
            return;
        }

        let source_snapshot = match self.source.snapshot(rel) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Without a listing nothing under here can be judged stale
                self.fail("read", self.source.locate(rel), &e);
                return;
            }
        };

        let replica_snapshot = if fresh && self.dry_run() {
            DirSnapshot::new()
        } else {
            match self.replica.snapshot(rel) {
                Ok(snapshot) => snapshot,
                // The replica root vanished since the last pass: rebuild it from scratch
                Err(e) if rel.as_os_str().is_empty() && e.is_not_found() => {
                    if !self.create_dir(rel) {
                        return;
                    }
                    DirSnapshot::new()
                }
                Err(e) => {
                    self.fail("read", self.replica.locate(rel), &e);
                    return;
                }
            }
        };

        // Names whose removal or creation failed; later actions on them are pointless
        let mut blocked: HashSet<OsString> = HashSet::new();
        let mut created: HashSet<OsString> = HashSet::new();

        for action in plan_level(&source_snapshot, &replica_snapshot) {
            if self.past_deadline(rel) {
                return;
            }

            match action {
                Action::CopyFile(name) => {
                    if blocked.contains(&name) {
                        continue;
                    }
                    if let Some(entry) = source_snapshot.get(&name) {
                        self.copy(&rel.join(&name), entry);
                    }
                }
                Action::CreateDir(name) => {
                    if blocked.contains(&name) {
                        continue;
                    }
                    if self.create_dir(&rel.join(&name)) {
                        created.insert(name);
                    } else {
                        blocked.insert(name);
                    }
                }
                Action::Descend(name) => {
                    if !blocked.contains(&name) {
                        let fresh = created.contains(&name);
                        self.level(&rel.join(&name), fresh);
                    }
                }
                Action::RemoveFile(name) => {
                    if !self.remove(&rel.join(&name), false) {
                        blocked.insert(name);
                    }
                }
                Action::RemoveDir(name) => {
                    if !self.remove(&rel.join(&name), true) {
                        blocked.insert(name);
                    }
                }
                Action::Skip(name) => {
                    tracing::debug!(
                        path = ?self.source.locate(&rel.join(&name)),
                        "Skipping entry that is neither a file nor a directory"
                    );
                }
            }
        }
    }

    fn copy(&mut self, rel: &Path, entry: &Entry) {
        let from = self.source.locate(rel);
        let to = self.replica.locate(rel);

        if self.dry_run() {
            self.log()
                .log(format!("[dry-run] Would copy {} to {}", from.display(), to.display()));
            self.result.files_copied += 1;
            return;
        }

        match self.replica.copy_in(&from, entry, rel) {
            Ok(()) => {
                self.log()
                    .log(format!("Copied {} to {}", from.display(), to.display()));
                self.result.files_copied += 1;
            }
            Err(e) => {
                if let mirror_fs::Error::Locked { attempts, .. } = &e {
                    self.log().warn(format!(
                        "Failed to copy {} to {} after {} attempts",
                        from.display(),
                        to.display(),
                        attempts
                    ));
                    self.result.failures.push(Failure::from_error(from, &e));
                } else {
                    self.fail("copy", from, &e);
                }
            }
        }
    }

    fn create_dir(&mut self, rel: &Path) -> bool {
        let path = self.replica.locate(rel);

        if self.dry_run() {
            self.log()
                .log(format!("[dry-run] Would create directory {}", path.display()));
            self.result.dirs_created += 1;
            return true;
        }

        match self.replica.create_dir(rel) {
            Ok(()) => {
                self.log()
                    .log(format!("Created directory {}", path.display()));
                self.result.dirs_created += 1;
                true
            }
            Err(e) => {
                self.fail("create directory", path, &e);
                false
            }
        }
    }

    fn remove(&mut self, rel: &Path, is_dir: bool) -> bool {
        let path = self.replica.locate(rel);
        let what = if is_dir { "directory" } else { "file" };

        if self.dry_run() {
            self.log()
                .log(format!("[dry-run] Would delete {what} {}", path.display()));
            self.count_removal(is_dir);
            return true;
        }

        let outcome = if is_dir {
            self.replica.remove_dir_all(rel)
        } else {
            self.replica.remove_file(rel)
        };

        match outcome {
            Ok(()) => {
                self.log().log(format!("Deleted {what} {}", path.display()));
                self.count_removal(is_dir);
                true
            }
            // Someone else removed it since the listing
            Err(e) if e.is_not_found() => {
                tracing::debug!(?path, "Already gone");
                true
            }
            Err(e) => {
                self.fail(&format!("delete {what}"), path, &e);
                false
            }
        }
    }

    fn count_removal(&mut self, is_dir: bool) {
        if is_dir {
            self.result.dirs_deleted += 1;
        } else {
            self.result.files_deleted += 1;
        }
    }

    fn fail(&mut self, action: &str, path: PathBuf, error: &mirror_fs::Error) {
        self.log()
            .warn(format!("Failed to {action} {}: {error}", path.display()));
        self.result.failures.push(Failure::from_error(path, error));
    }

    /// Whether the pass is out of time. The first call past the deadline
    /// records the failure; later calls just report it.
    fn past_deadline(&mut self, rel: &Path) -> bool {
        if self.expired {
            return true;
        }
        let (Some(deadline), Some(timeout)) = (self.deadline, self.engine.options.pass_timeout)
        else {
            return false;
        };
        if Instant::now() < deadline {
            return false;
        }

        self.expired = true;
        let failure = Failure::deadline(self.source.locate(rel), timeout);
        self.log().warn(failure.to_string());
        self.result.failures.push(failure);
        true
    }
}
