//! Sync configuration: loading, layering and validation
//!
//! Settings come from up to two layers, later layers overriding earlier ones:
//!
//! 1. **Settings file** - `.toml`, `.json` or `.yaml`, loaded through [`mirror_fs::ConfigStore`]
//! 2. **Command line** - flags and environment variables collected by the CLI
//!
//! The merged [`MirrorSettings`] are turned into an immutable [`SyncConfiguration`]
//! by [`ConfigBuilder::build`], which rejects anything a session could not run with.
//!
//! # Example
//!
//! ```ignore
//! use mirror_core::config::{ConfigBuilder, MirrorSettings};
//!
//! let file = MirrorSettings::load("mirror.toml".as_ref())?;
//! let config = ConfigBuilder::from_settings(file.merge(cli_overrides)).build()?;
//! println!("Mirroring every {:?}", config.interval());
//! ```

mod settings;
mod validate;

pub use settings::{MirrorSettings, RetrySettings};
pub use validate::{ConfigBuilder, SyncConfiguration};
