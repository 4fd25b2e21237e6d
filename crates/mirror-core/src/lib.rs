//! Core orchestration layer for Folder Mirror
//!
//! This crate sits on top of `mirror-fs` and implements:
//!
//! - **Configuration**: settings files merged with overrides, validated into a [`SyncConfiguration`]
//! - **Reconciliation**: the recursive walk that makes a replica an exact copy of a source
//! - **Change watching**: OS notifications on the source, logged and folded into a [`DirtyFlag`]
//! - **Scheduling**: fixed-rate passes with skip-on-busy, so passes never overlap
//! - **Sessions**: a watcher and a scheduler started, supervised and stopped together
//!
//! # Architecture
//!
//! ```text
//!                 mirror-cli
//!                     |
//!                SyncSession
//!                 /        \
//!       ChangeWatcher    SyncScheduler
//!        (observes)           |
//!                    ReconciliationEngine
//!                             |
//!                  mirror-fs (FileCopier, trees)
//! ```
//!
//! The scheduler is the only driver of replica mutation. The watcher only
//! logs and marks the dirty flag, which is advisory and never gates a pass.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mirror_core::{ConfigBuilder, SyncLog, SyncSession};
//!
//! let config = ConfigBuilder::new()
//!     .source("/data/source")
//!     .replica("/data/replica")
//!     .log_file("/var/log/mirror.log")
//!     .interval_seconds(30)
//!     .build()?;
//! let log = Arc::new(SyncLog::open(config.log_path()));
//! let session = SyncSession::start(config, log)?;
//! ```

pub mod config;
pub mod dirty;
pub mod error;
pub mod log;
pub mod reconcile;
pub mod scheduler;
pub mod session;
pub mod watcher;

pub use config::{ConfigBuilder, MirrorSettings, RetrySettings, SyncConfiguration};
pub use dirty::{DirtyFlag, DirtyState};
pub use error::{Error, Result};
pub use log::{LogLevel, SyncLog};
pub use reconcile::{
    Action, Failure, FailureKind, Reconcile, ReconcileOptions, ReconciliationEngine,
    ReconciliationResult, plan_level,
};
pub use scheduler::{SchedulerHandle, SchedulerStats, SyncScheduler};
pub use session::SyncSession;
pub use watcher::{ChangeEvent, ChangeKind, ChangeWatcher, EventCallback, WatchHandle, convert};
