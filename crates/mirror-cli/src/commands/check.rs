//! Configuration check command

use std::path::Path;

use colored::Colorize;

use super::resolve_config;
use crate::cli::SyncArgs;
use crate::error::Result;

/// Validate the configuration and print what a sync would use.
pub fn run_check(config_file: Option<&Path>, args: &SyncArgs) -> Result<()> {
    let config = resolve_config(config_file, args)?;

    println!("{} Configuration is valid.", "OK".green().bold());
    println!("   {:<10} {}", "source".dimmed(), config.source_root().display());
    println!("   {:<10} {}", "replica".dimmed(), config.replica_root().display());
    println!("   {:<10} {}", "log".dimmed(), config.log_path().display());
    println!("   {:<10} {}s", "interval".dimmed(), config.interval().as_secs());
    if let Some(timeout) = config.pass_timeout() {
        println!("   {:<10} {}s", "timeout".dimmed(), timeout.as_secs());
    }
    let retry = config.retry();
    println!(
        "   {:<10} {} attempts, {}ms apart",
        "retry".dimmed(),
        retry.max_attempts,
        retry.delay.as_millis()
    );

    Ok(())
}
