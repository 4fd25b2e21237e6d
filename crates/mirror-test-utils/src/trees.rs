//! [`TestTrees`]: a throwaway source/replica directory pair.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// A source and a replica directory, each in its own temp dir so they are
/// never nested inside one another.
///
/// # Example
///
/// ```rust,no_run
/// use mirror_test_utils::TestTrees;
///
/// let trees = TestTrees::new();
/// trees.write_source("a/b/c.txt", "hello");
/// // ... run a reconciliation pass ...
/// trees.assert_mirrors();
/// ```
pub struct TestTrees {
    source: TempDir,
    replica: TempDir,
}

impl Default for TestTrees {
    fn default() -> Self {
        Self::new()
    }
}

/// What [`listing`] records for each path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
}

impl TestTrees {
    pub fn new() -> Self {
        Self {
            source: TempDir::new().unwrap(),
            replica: TempDir::new().unwrap(),
        }
    }

    pub fn source(&self) -> &Path {
        self.source.path()
    }

    pub fn replica(&self) -> &Path {
        self.replica.path()
    }

    /// Write a file under the source root, creating parent directories.
    pub fn write_source(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.source.path().join(rel), content)
    }

    /// Write a file under the replica root, creating parent directories.
    pub fn write_replica(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.replica.path().join(rel), content)
    }

    pub fn mkdir_source(&self, rel: &str) -> PathBuf {
        make_dir(&self.source.path().join(rel))
    }

    pub fn mkdir_replica(&self, rel: &str) -> PathBuf {
        make_dir(&self.replica.path().join(rel))
    }

    /// Set the modification time of a file.
    pub fn set_mtime(&self, path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .and_then(|f| f.set_modified(time))
            .unwrap_or_else(|e| panic!("set_mtime: {}: {e}", path.display()));
    }

    pub fn mtime(&self, path: &Path) -> SystemTime {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|e| panic!("mtime: {}: {e}", path.display()))
    }

    /// Assert that the replica holds exactly the source's files and directories,
    /// with identical content and no older modification times.
    pub fn assert_mirrors(&self) {
        let source = listing(self.source());
        let replica = listing(self.replica());
        assert_eq!(source, replica, "replica does not mirror source");

        for (rel, node) in &source {
            if let Node::File(_) = node {
                let src_time = self.mtime(&self.source().join(rel));
                let dst_time = self.mtime(&self.replica().join(rel));
                assert!(
                    dst_time >= src_time,
                    "replica copy of {} is older than the source",
                    rel.display()
                );
            }
        }
    }
}

/// A fixed point in time `secs` seconds after the Unix epoch.
pub fn stamp(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Every file and directory below `root`, keyed by relative path.
pub fn listing(root: &Path) -> BTreeMap<PathBuf, Node> {
    let mut out = BTreeMap::new();
    collect(root, Path::new(""), &mut out);
    out
}

fn collect(root: &Path, rel: &Path, out: &mut BTreeMap<PathBuf, Node>) {
    let dir = root.join(rel);
    for entry in fs::read_dir(&dir).unwrap_or_else(|e| panic!("listing {}: {e}", dir.display())) {
        let entry = entry.unwrap();
        let child = rel.join(entry.file_name());
        let file_type = entry.file_type().unwrap();
        if file_type.is_dir() {
            out.insert(child.clone(), Node::Dir);
            collect(root, &child, out);
        } else if file_type.is_file() {
            out.insert(child, Node::File(fs::read(entry.path()).unwrap()));
        }
    }
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    path.to_path_buf()
}

fn make_dir(path: &Path) -> PathBuf {
    fs::create_dir_all(path).unwrap_or_else(|e| panic!("mkdir {}: {e}", path.display()));
    path.to_path_buf()
}
