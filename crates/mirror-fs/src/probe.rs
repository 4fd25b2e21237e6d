//! Readiness probe: can a source file be opened exclusively right now?

use std::fs::File;
use std::io;
use std::path::Path;

use fs2::FileExt;

/// Outcome of a single readiness probe.
#[derive(Debug)]
pub enum Readiness {
    /// Nobody else holds the file; it can be copied.
    Ready,
    /// Another handle holds a conflicting lock. Worth retrying.
    Locked,
    /// The file cannot be read at all (missing, permission denied, ...). Not worth retrying.
    Failed(io::Error),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Probe `path` once.
///
/// Opens the file and tries a non-blocking exclusive advisory lock. The handle is
/// released before returning, so a `Ready` answer says nothing about the moment
/// the data is actually read.
pub fn probe_ready(path: &Path) -> Readiness {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if is_contention(&e) => return Readiness::Locked,
        Err(e) => return Readiness::Failed(e),
    };

    match file.try_lock_exclusive() {
        Ok(()) => Readiness::Ready,
        Err(e) if is_contention(&e) => Readiness::Locked,
        Err(e) => Readiness::Failed(e),
    }
}

#[cfg(windows)]
const ERROR_SHARING_VIOLATION: i32 = 32;
#[cfg(windows)]
const ERROR_LOCK_VIOLATION: i32 = 33;

fn is_contention(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    let contended = fs2::lock_contended_error().raw_os_error();
    if e.raw_os_error().is_some() && e.raw_os_error() == contended {
        return true;
    }
    #[cfg(windows)]
    if matches!(
        e.raw_os_error(),
        Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION)
    ) {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unlocked_file_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("free.txt");
        fs::write(&path, "x").unwrap();

        assert!(probe_ready(&path).is_ready());
    }

    #[test]
    fn locked_file_reports_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("held.txt");
        fs::write(&path, "x").unwrap();

        let holder = File::open(&path).unwrap();
        holder.lock_exclusive().unwrap();

        assert!(matches!(probe_ready(&path), Readiness::Locked));

        drop(holder);
        assert!(probe_ready(&path).is_ready());
    }

    #[test]
    fn missing_file_fails_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        match probe_ready(&dir.path().join("missing")) {
            Readiness::Failed(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
