//! Single-pass command

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use mirror_core::{Reconcile, ReconcileOptions, ReconciliationEngine, SyncLog};

use super::resolve_single_pass_config;
use crate::cli::SyncArgs;
use crate::error::{CliError, Result};

/// Run one reconciliation pass and report it.
pub fn run_once(config_file: Option<&Path>, args: &SyncArgs, dry_run: bool) -> Result<()> {
    let config = resolve_single_pass_config(config_file, args)?;
    let log = Arc::new(SyncLog::open(config.log_path()));

    let engine = ReconciliationEngine::from_config(&config, log);
    let options = ReconcileOptions {
        dry_run,
        ..engine.options()
    };
    let engine = engine.with_options(options);

    if dry_run {
        println!("{} Dry run, the replica will not be modified.", "=>".blue().bold());
    }
    let result = engine.reconcile(config.source_root(), config.replica_root());

    if result.has_failures() {
        println!("{} {}", "INCOMPLETE".yellow().bold(), result);
        for failure in &result.failures {
            println!("   {} {}", "!".red(), failure);
        }
        return Err(CliError::user(format!(
            "{} entries could not be synchronized",
            result.failures.len()
        )));
    }

    println!("{} {}", "OK".green().bold(), result);
    Ok(())
}
