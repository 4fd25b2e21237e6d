//! Live change notifications for the source tree
//!
//! The watcher subscribes to OS notifications (via `notify`) on the whole
//! source tree, turns them into [`ChangeEvent`]s, logs each one and marks the
//! [`DirtyFlag`]. It never touches the replica: the scheduler's next pass
//! picks the changes up.
//!
//! Losing the source root ends a subscription for good. That state is
//! recorded on the [`WatchHandle`] for the owner to act on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventHandler, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::dirty::DirtyFlag;
use crate::log::SyncLog;
use crate::{Error, Result};

/// Called for every change event, on the notification thread.
pub type EventCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::Modified => "Modified",
            Self::Deleted => "Deleted",
            Self::Renamed => "Renamed",
        };
        f.write_str(name)
    }
}

/// One observed change under the source root. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    /// Previous location, set for [`ChangeKind::Renamed`] only
    pub old_path: Option<PathBuf>,
    pub timestamp: DateTime<Local>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
            timestamp: Local::now(),
        }
    }

    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Renamed,
            path: to.into(),
            old_path: Some(from.into()),
            timestamp: Local::now(),
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old) => write!(
                f,
                "Renamed - From: {} To: {}",
                old.display(),
                self.path.display()
            ),
            None => write!(f, "{} - {}", self.kind, self.path.display()),
        }
    }
}

/// Translate one raw notification into change events.
///
/// Access and unclassified notifications produce nothing.
pub fn convert(event: &Event) -> Vec<ChangeEvent> {
    let each = |kind: ChangeKind| -> Vec<ChangeEvent> {
        event
            .paths
            .iter()
            .map(|path| ChangeEvent::new(kind, path))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => each(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to, ..] => vec![ChangeEvent::renamed(from, to)],
            _ => each(ChangeKind::Modified),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(ChangeKind::Created),
        EventKind::Modify(_) => each(ChangeKind::Modified),
        EventKind::Remove(_) => each(ChangeKind::Deleted),
        EventKind::Access(_) | EventKind::Other | EventKind::Any => Vec::new(),
    }
}

/// Starts subscriptions on a source tree.
///
/// One watcher can be started more than once; each start is an independent
/// subscription sharing the same log, flag and callback.
#[derive(Clone)]
pub struct ChangeWatcher {
    log: Arc<SyncLog>,
    dirty: Arc<DirtyFlag>,
    on_event: Option<EventCallback>,
}

impl fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("dirty", &self.dirty)
            .field("has_callback", &self.on_event.is_some())
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    pub fn new(log: Arc<SyncLog>, dirty: Arc<DirtyFlag>) -> Self {
        Self {
            log,
            dirty,
            on_event: None,
        }
    }

    pub fn with_callback(mut self, on_event: EventCallback) -> Self {
        self.on_event = Some(on_event);
        self
    }

    /// Subscribe to `root`, recursively.
    pub fn start(&self, root: &Path) -> Result<WatchHandle> {
        let failure = Arc::new(OnceLock::new());
        let handler = Handler {
            root: root.to_path_buf(),
            log: Arc::clone(&self.log),
            dirty: Arc::clone(&self.dirty),
            on_event: self.on_event.clone(),
            failure: Arc::clone(&failure),
        };

        let subscription_failed = |e: notify::Error| Error::WatchSubscription {
            path: root.to_path_buf(),
            message: e.to_string(),
        };

        let mut watcher = RecommendedWatcher::new(handler, notify::Config::default())
            .map_err(subscription_failed)?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(subscription_failed)?;

        tracing::debug!(?root, "Watching for changes");
        Ok(WatchHandle {
            root: root.to_path_buf(),
            watcher: Some(watcher),
            failure,
        })
    }
}

/// A live subscription. Dropping it stops monitoring.
pub struct WatchHandle {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    failure: Arc<OnceLock<String>>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("root", &self.root)
            .field("active", &self.is_active())
            .field("failure", &self.failure())
            .finish()
    }
}

impl WatchHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Why the subscription ended, if it ended on its own.
    pub fn failure(&self) -> Option<&str> {
        self.failure.get().map(String::as_str)
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some() && self.failure.get().is_none()
    }

    /// Stop monitoring. Events already being handled still finish.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!(root = ?self.root, "Stopped watching");
        }
    }
}

/// Runs on notify's thread for every notification.
struct Handler {
    root: PathBuf,
    log: Arc<SyncLog>,
    dirty: Arc<DirtyFlag>,
    on_event: Option<EventCallback>,
    failure: Arc<OnceLock<String>>,
}

impl Handler {
    fn record(&self, event: &ChangeEvent) {
        self.log.log(event.to_string());
        self.dirty.mark();
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    fn terminate(&self, reason: String) {
        if self.failure.set(reason.clone()).is_ok() {
            self.log.error(format!("Watch on {} lost: {reason}", self.root.display()));
            // The next timed pass still runs; make sure it is seen as needed
            self.dirty.mark();
        }
    }
}

impl EventHandler for Handler {
    fn handle_event(&mut self, event: notify::Result<Event>) {
        match event {
            Ok(event) => {
                if event.need_rescan() {
                    self.log.warn(format!(
                        "Change notifications overflowed under {}, next pass will rescan",
                        self.root.display()
                    ));
                    self.dirty.mark();
                }

                for change in convert(&event) {
                    self.record(&change);
                }

                if matches!(event.kind, EventKind::Remove(_)) && event.paths.contains(&self.root) {
                    self.terminate("source root removed".to_string());
                }
            }
            Err(e) if e.paths.is_empty() || e.paths.contains(&self.root) => {
                self.terminate(e.to_string());
            }
            Err(e) => {
                // Confined to a path below the root; monitoring continues
                self.log.warn(format!("Watch error: {e}"));
            }
        }
    }
}
