//! Folder Mirror CLI
//!
//! One-way mirroring of a source directory into a replica, continuously or as
//! a single pass.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: cannot set up console logging: {e}", "warning".yellow().bold());
    }

    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Run { sync } => commands::run_continuous(config, sync),
        Commands::Once { sync, dry_run } => commands::run_once(config, sync, *dry_run),
        Commands::Check { sync } => commands::run_check(config, sync),
    }
}
