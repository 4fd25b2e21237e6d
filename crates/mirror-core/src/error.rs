//! Error types for mirror-core

use std::path::PathBuf;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-core operations
///
/// Only configuration and subscription errors ever reach a caller. Failures on
/// individual files during a pass are recorded in the pass result instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Paths or interval rejected before any sync starts
    #[error("Invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    /// The source tree cannot be monitored
    #[error("Cannot watch {path}: {message}")]
    WatchSubscription { path: PathBuf, message: String },

    /// A background thread could not be started
    #[error("Failed to start {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }
}
