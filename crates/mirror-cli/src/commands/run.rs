//! Continuous mirroring until interrupted

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use mirror_core::{SyncLog, SyncSession};

use super::resolve_config;
use crate::cli::SyncArgs;
use crate::error::Result;

/// How often a lost watch subscription is retried.
const WATCH_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Start a session and keep it running until Ctrl+C or SIGTERM.
pub fn run_continuous(config_file: Option<&Path>, args: &SyncArgs) -> Result<()> {
    let config = resolve_config(config_file, args)?;
    let log = Arc::new(SyncLog::open(config.log_path()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut session = SyncSession::start(config, log)?;
    println!(
        "{} Mirroring {} into {}. Press Ctrl+C to stop.",
        "=>".blue().bold(),
        session.config().source_root().display().to_string().cyan(),
        session.config().replica_root().display().to_string().cyan()
    );

    runtime.block_on(async {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);
        let mut supervise = tokio::time::interval(WATCH_CHECK_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = supervise.tick() => {
                    session.check_watch();
                }
            }
        }
    });

    println!("{} Stopping, waiting for any pass in progress...", "=>".blue().bold());
    let stats = session.shutdown();
    println!(
        "{} Stopped after {} passes ({} ticks skipped).",
        "OK".green().bold(),
        stats.passes_completed,
        stats.ticks_skipped
    );
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
