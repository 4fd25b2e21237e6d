//! Directory snapshots and the tree views the reconciliation engine walks
//!
//! A [`DirSnapshot`] is the listing of one directory level. The engine never
//! touches storage directly: it asks a [`TreeReader`] for snapshots and tells a
//! [`ReplicaTree`] what to change, so the same walk runs against the real
//! filesystem ([`FsTree`], [`FsReplica`]) or an in-memory model
//! ([`MemoryTree`](crate::MemoryTree)).

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::copy::FileCopier;
use crate::path::resolve;
use crate::{Error, Result};

/// What kind of filesystem object an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks, sockets, devices. Never mirrored.
    Other,
}

/// One child of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Last-modified time; `UNIX_EPOCH` where the platform cannot report it.
    pub modified: SystemTime,
    pub len: u64,
}

impl Entry {
    pub fn file(modified: SystemTime, len: u64) -> Self {
        Self {
            kind: EntryKind::File,
            modified,
            len,
        }
    }

    pub fn dir() -> Self {
        Self {
            kind: EntryKind::Dir,
            modified: SystemTime::UNIX_EPOCH,
            len: 0,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// The direct children of one directory, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirSnapshot {
    entries: BTreeMap<OsString, Entry>,
}

impl DirSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<OsString>, entry: Entry) {
        self.entries.insert(name.into(), entry);
    }

    /// Builder-style insert, handy for constructing trees in tests.
    pub fn with(mut self, name: impl Into<OsString>, entry: Entry) -> Self {
        self.insert(name, entry);
        self
    }

    pub fn get(&self, name: &OsStr) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_os_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read access to a directory tree, addressed by root-relative paths.
///
/// The empty relative path addresses the root itself.
pub trait TreeReader {
    /// List the direct children of `rel`.
    fn snapshot(&self, rel: &Path) -> Result<DirSnapshot>;

    /// Absolute (or display) location of `rel`, used in logs and failure records.
    fn locate(&self, rel: &Path) -> PathBuf;
}

/// The mutable side of a reconciliation: the replica.
pub trait ReplicaTree: TreeReader {
    /// Copy the source file at `source` (with metadata `entry`) to `rel`, overwriting.
    fn copy_in(&mut self, source: &Path, entry: &Entry, rel: &Path) -> Result<()>;

    fn create_dir(&mut self, rel: &Path) -> Result<()>;

    fn remove_file(&mut self, rel: &Path) -> Result<()>;

    /// Remove a directory and everything beneath it.
    fn remove_dir_all(&mut self, rel: &Path) -> Result<()>;
}

/// A directory tree on the real filesystem.
#[derive(Debug, Clone)]
pub struct FsTree {
    root: PathBuf,
}

impl FsTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TreeReader for FsTree {
    fn snapshot(&self, rel: &Path) -> Result<DirSnapshot> {
        let dir = resolve(&self.root, rel);
        let mut snapshot = DirSnapshot::new();

        for item in fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))? {
            let item = item.map_err(|e| Error::io(&dir, e))?;
            let file_type = item.file_type().map_err(|e| Error::io(item.path(), e))?;

            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::Other
            };

            let metadata = match item.metadata() {
                Ok(metadata) => metadata,
                // Removed between listing and stat; the next pass sees the new state
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(item.path(), e)),
            };

            snapshot.insert(
                item.file_name(),
                Entry {
                    kind,
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    len: metadata.len(),
                },
            );
        }

        Ok(snapshot)
    }

    fn locate(&self, rel: &Path) -> PathBuf {
        resolve(&self.root, rel)
    }
}

/// The replica side on the real filesystem; file transfers go through a [`FileCopier`].
#[derive(Debug, Clone)]
pub struct FsReplica {
    tree: FsTree,
    copier: FileCopier,
}

impl FsReplica {
    pub fn new(root: impl Into<PathBuf>, copier: FileCopier) -> Self {
        Self {
            tree: FsTree::new(root),
            copier,
        }
    }
}

impl TreeReader for FsReplica {
    fn snapshot(&self, rel: &Path) -> Result<DirSnapshot> {
        self.tree.snapshot(rel)
    }

    fn locate(&self, rel: &Path) -> PathBuf {
        self.tree.locate(rel)
    }
}

impl ReplicaTree for FsReplica {
    fn copy_in(&mut self, source: &Path, _entry: &Entry, rel: &Path) -> Result<()> {
        let destination = self.locate(rel);
        self.copier.copy(source, &destination).map(|_| ())
    }

    fn create_dir(&mut self, rel: &Path) -> Result<()> {
        let path = self.locate(rel);
        fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))
    }

    fn remove_file(&mut self, rel: &Path) -> Result<()> {
        let path = self.locate(rel);
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))
    }

    fn remove_dir_all(&mut self, rel: &Path) -> Result<()> {
        let path = self.locate(rel);
        fs::remove_dir_all(&path).map_err(|e| Error::io(&path, e))
    }
}
