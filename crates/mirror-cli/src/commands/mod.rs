//! Command implementations for mirror-cli

pub mod check;
pub mod once;
pub mod run;

pub use check::run_check;
pub use once::run_once;
pub use run::run_continuous;

use std::path::Path;

use mirror_core::{ConfigBuilder, MirrorSettings, SyncConfiguration};

use crate::cli::SyncArgs;
use crate::error::Result;

/// Merge the settings file (if any) with command-line flags and validate.
///
/// Flags and environment variables win over the file.
pub fn resolve_config(config_file: Option<&Path>, args: &SyncArgs) -> Result<SyncConfiguration> {
    build(merged_settings(config_file, args)?)
}

/// Like [`resolve_config`], for commands that run a single pass.
///
/// Such a pass never waits on the interval, so it may be left unset.
pub fn resolve_single_pass_config(
    config_file: Option<&Path>,
    args: &SyncArgs,
) -> Result<SyncConfiguration> {
    let mut settings = merged_settings(config_file, args)?;
    settings.interval_seconds.get_or_insert(SINGLE_PASS_INTERVAL_SECONDS);
    build(settings)
}

/// Stands in for an unset interval when only one pass runs.
const SINGLE_PASS_INTERVAL_SECONDS: u64 = 1;

fn merged_settings(config_file: Option<&Path>, args: &SyncArgs) -> Result<MirrorSettings> {
    let base = match config_file {
        Some(path) => MirrorSettings::load(path)?,
        None => MirrorSettings::default(),
    };
    let settings = base.merge(args.to_settings());
    tracing::debug!(?settings, "Resolved settings");
    Ok(settings)
}

fn build(settings: MirrorSettings) -> Result<SyncConfiguration> {
    Ok(ConfigBuilder::from_settings(settings).build()?)
}
