//! Path helpers shared by configuration validation and the tree views

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Resolve `path` to an absolute, symlink-free form.
///
/// Uses `dunce` so that Windows paths stay in their familiar non-UNC form.
pub fn canonical(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).map_err(|e| Error::io(path, e))
}

/// Check whether `path` is `ancestor` or lies somewhere beneath it.
///
/// Both arguments are expected to be canonical; no filesystem access happens here.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}

/// Join a root-relative path onto `root`, treating an empty relative path as the root itself.
pub fn resolve(root: &Path, rel: &Path) -> PathBuf {
    if rel.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}
