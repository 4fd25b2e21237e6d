//! In-memory tree used to exercise the reconciliation walk without real storage

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::path::resolve;
use crate::tree::{DirSnapshot, Entry, ReplicaTree, TreeReader};
use crate::{Error, Result};

/// A directory tree held entirely in memory.
///
/// Nodes are keyed by root-relative path; the root itself is implicit.
/// Mutations can be made to fail for chosen paths with [`MemoryTree::fail_on`].
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    label: PathBuf,
    nodes: BTreeMap<PathBuf, Entry>,
    failing: HashSet<PathBuf>,
    mutations: usize,
}

impl MemoryTree {
    /// Create an empty tree; `label` is what [`TreeReader::locate`] reports as the root.
    pub fn new(label: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Add a file (and any missing parent directories).
    pub fn add_file(&mut self, rel: impl AsRef<Path>, modified: SystemTime) -> &mut Self {
        let rel = rel.as_ref();
        if let Some(parent) = rel.parent() {
            self.add_dir(parent);
        }
        self.nodes.insert(rel.to_path_buf(), Entry::file(modified, 0));
        self
    }

    /// Add a directory and all of its ancestors.
    pub fn add_dir(&mut self, rel: impl AsRef<Path>) -> &mut Self {
        for ancestor in rel.as_ref().ancestors() {
            if !ancestor.as_os_str().is_empty() {
                self.nodes
                    .entry(ancestor.to_path_buf())
                    .or_insert_with(Entry::dir);
            }
        }
        self
    }

    /// Make every mutation targeting `rel` fail with a permission error.
    pub fn fail_on(&mut self, rel: impl AsRef<Path>) -> &mut Self {
        self.failing.insert(rel.as_ref().to_path_buf());
        self
    }

    pub fn entry(&self, rel: impl AsRef<Path>) -> Option<&Entry> {
        self.nodes.get(rel.as_ref())
    }

    /// Every node in the tree, keyed by relative path.
    pub fn nodes(&self) -> &BTreeMap<PathBuf, Entry> {
        &self.nodes
    }

    /// Number of successful mutations applied so far.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    fn is_dir(&self, rel: &Path) -> bool {
        rel.as_os_str().is_empty() || self.nodes.get(rel).is_some_and(Entry::is_dir)
    }

    fn check(&self, rel: &Path) -> Result<()> {
        if self.failing.contains(rel) {
            return Err(Error::PermissionDenied {
                path: self.locate(rel),
            });
        }
        Ok(())
    }

    fn not_found(&self, rel: &Path) -> Error {
        Error::io(self.locate(rel), io::Error::from(io::ErrorKind::NotFound))
    }
}

impl TreeReader for MemoryTree {
    fn snapshot(&self, rel: &Path) -> Result<DirSnapshot> {
        if !self.is_dir(rel) {
            return Err(self.not_found(rel));
        }

        let mut snapshot = DirSnapshot::new();
        for (path, entry) in &self.nodes {
            if path.parent() == Some(rel)
                && let Some(name) = path.file_name()
            {
                snapshot.insert(name, entry.clone());
            }
        }
        Ok(snapshot)
    }

    fn locate(&self, rel: &Path) -> PathBuf {
        resolve(&self.label, rel)
    }
}

impl ReplicaTree for MemoryTree {
    fn copy_in(&mut self, _source: &Path, entry: &Entry, rel: &Path) -> Result<()> {
        self.check(rel)?;
        let parent = rel.parent().unwrap_or(Path::new(""));
        if !self.is_dir(parent) {
            return Err(self.not_found(parent));
        }
        self.nodes
            .insert(rel.to_path_buf(), Entry::file(entry.modified, entry.len));
        self.mutations += 1;
        Ok(())
    }

    fn create_dir(&mut self, rel: &Path) -> Result<()> {
        self.check(rel)?;
        self.add_dir(rel);
        self.mutations += 1;
        Ok(())
    }

    fn remove_file(&mut self, rel: &Path) -> Result<()> {
        self.check(rel)?;
        match self.nodes.get(rel) {
            Some(entry) if !entry.is_dir() => {
                self.nodes.remove(rel);
                self.mutations += 1;
                Ok(())
            }
            _ => Err(self.not_found(rel)),
        }
    }

    fn remove_dir_all(&mut self, rel: &Path) -> Result<()> {
        self.check(rel)?;
        if !self.nodes.get(rel).is_some_and(Entry::is_dir) {
            return Err(self.not_found(rel));
        }
        self.nodes.retain(|path, _| !path.starts_with(rel));
        self.mutations += 1;
        Ok(())
    }
}
