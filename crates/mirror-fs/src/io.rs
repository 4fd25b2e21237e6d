//! Atomic copy into place and writability checks

use std::fs::File;
use std::io;
use std::path::Path;

use crate::{Error, Result};

/// Copy `source` to `destination` without ever exposing a partial file.
///
/// Data is streamed into a temp file next to the destination (same filesystem),
/// stamped with the source's modification time, flushed, then renamed over the
/// destination. On failure the temp file is removed and the destination is left
/// as it was. Returns the number of bytes copied.
pub fn copy_atomic(source: &Path, destination: &Path) -> Result<u64> {
    let parent = destination.parent().ok_or_else(|| {
        Error::io(
            destination,
            io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"),
        )
    })?;

    let mut input = File::open(source).map_err(|e| Error::io(source, e))?;
    let modified = input
        .metadata()
        .and_then(|m| m.modified())
        .map_err(|e| Error::io(source, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".mirror-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| Error::io(parent, e))?;

    let bytes = io::copy(&mut input, temp.as_file_mut()).map_err(|e| Error::io(source, e))?;

    temp.as_file()
        .set_modified(modified)
        .map_err(|e| Error::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(temp.path(), e))?;

    temp.persist(destination)
        .map_err(|e| Error::io(destination, e.error))?;

    Ok(bytes)
}

/// Check that files can be created in `dir` by creating and removing a temp file.
pub fn probe_writable(dir: &Path) -> Result<()> {
    tempfile::Builder::new()
        .prefix(".mirror-probe-")
        .tempfile_in(dir)
        .map(drop)
        .map_err(|e| Error::io(dir, e))
}
