//! Filesystem layer for Folder Mirror
//!
//! Provides directory snapshots, tree views over real and in-memory storage,
//! a tri-state readiness probe and the retrying file copier used by the
//! reconciliation engine.

pub mod config;
pub mod copy;
pub mod error;
pub mod io;
pub mod memory;
pub mod path;
pub mod probe;
pub mod tree;

pub use config::ConfigStore;
pub use copy::{CopyOutcome, FileCopier, RetryPolicy};
pub use error::{Error, Result};
pub use memory::MemoryTree;
pub use probe::{Readiness, probe_ready};
pub use tree::{DirSnapshot, Entry, EntryKind, FsReplica, FsTree, ReplicaTree, TreeReader};
