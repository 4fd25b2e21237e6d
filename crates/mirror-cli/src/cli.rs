//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mirror_core::{MirrorSettings, RetrySettings};

/// Folder Mirror - Keep a replica directory an exact copy of a source directory
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (.toml, .json, .yaml or .yml); flags override its values
    #[arg(short, long, global = true, env = "MIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch the source and reconcile the replica on every interval until interrupted
    Run {
        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Run a single reconciliation pass and exit
    ///
    /// `--interval` is not needed here. Exits non-zero if any entry could not
    /// be synchronized.
    Once {
        #[command(flatten)]
        sync: SyncArgs,

        /// Report what would change without touching the replica
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration and exit
    Check {
        #[command(flatten)]
        sync: SyncArgs,
    },
}

/// Settings accepted on the command line or from the environment.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncArgs {
    /// Directory to mirror from
    #[arg(short, long, env = "MIRROR_SOURCE")]
    pub source: Option<PathBuf>,

    /// Directory to mirror into (created if missing)
    #[arg(short, long, env = "MIRROR_REPLICA")]
    pub replica: Option<PathBuf>,

    /// Append-only operation log
    #[arg(short, long, env = "MIRROR_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Seconds between reconciliation passes
    #[arg(short, long, env = "MIRROR_INTERVAL")]
    pub interval: Option<u64>,

    /// Abandon a pass that runs longer than this many seconds
    #[arg(long)]
    pub pass_timeout: Option<u64>,

    /// How many times to probe a locked source file before giving up
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// Milliseconds between probes of a locked source file
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

impl SyncArgs {
    /// The settings layer these flags describe.
    pub fn to_settings(&self) -> MirrorSettings {
        MirrorSettings {
            source: self.source.clone(),
            replica: self.replica.clone(),
            log_file: self.log_file.clone(),
            interval_seconds: self.interval,
            pass_timeout_seconds: self.pass_timeout,
            retry: RetrySettings {
                max_attempts: self.retry_attempts,
                delay_ms: self.retry_delay_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_once_with_paths() {
        let cli = Cli::parse_from([
            "mirror", "once", "--source", "/a", "--replica", "/b", "--log-file", "/l.log",
            "--interval", "5", "--dry-run",
        ]);

        let Commands::Once { sync, dry_run } = cli.command else {
            panic!("expected once");
        };
        assert!(dry_run);
        assert_eq!(sync.source, Some(PathBuf::from("/a")));
        assert_eq!(sync.interval, Some(5));
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mirror", "check", "-v", "--config", "mirror.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("mirror.toml")));
    }

    #[test]
    fn flags_become_a_settings_layer() {
        let args = SyncArgs {
            replica: Some("/r".into()),
            retry_attempts: Some(3),
            ..Default::default()
        };

        let settings = args.to_settings();
        assert_eq!(settings.replica, Some(PathBuf::from("/r")));
        assert_eq!(settings.retry.max_attempts, Some(3));
        assert_eq!(settings.source, None);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["mirror"]).is_err());
    }
}
