//! Simulating a writer that keeps a file open exclusively.

use fs2::FileExt;
use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// An exclusive advisory lock on a file, released on drop.
pub struct HeldFile {
    _file: File,
}

/// Lock `path` exclusively until the returned guard is dropped.
///
/// # Panics
/// Panics if the file cannot be opened or locked.
pub fn hold_exclusive(path: &Path) -> HeldFile {
    let file = File::options()
        .read(true)
        .append(true)
        .open(path)
        .unwrap_or_else(|e| panic!("hold_exclusive: cannot open {}: {e}", path.display()));
    file.lock_exclusive()
        .unwrap_or_else(|e| panic!("hold_exclusive: cannot lock {}: {e}", path.display()));
    HeldFile { _file: file }
}

impl HeldFile {
    /// Release the lock from a background thread after `delay`.
    pub fn release_after(self, delay: Duration) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            thread::sleep(delay);
            drop(self);
        })
    }
}
