//! A running mirror: one watcher plus one scheduler over a validated configuration

use std::sync::Arc;

use crate::config::SyncConfiguration;
use crate::dirty::DirtyFlag;
use crate::log::SyncLog;
use crate::reconcile::ReconciliationEngine;
use crate::scheduler::{SchedulerHandle, SchedulerStats, SyncScheduler};
use crate::watcher::{ChangeWatcher, EventCallback, WatchHandle};
use crate::Result;

/// Owns the live parts of a sync and tears them down in order.
///
/// A failed watch subscription never stops synchronization: the timed passes
/// carry on and [`check_watch`](Self::check_watch) keeps trying to resubscribe.
#[derive(Debug)]
pub struct SyncSession {
    config: Arc<SyncConfiguration>,
    log: Arc<SyncLog>,
    dirty: Arc<DirtyFlag>,
    watcher: ChangeWatcher,
    watch: Option<WatchHandle>,
    scheduler: SchedulerHandle,
}

impl SyncSession {
    pub fn start(config: SyncConfiguration, log: Arc<SyncLog>) -> Result<Self> {
        Self::start_with(config, log, None)
    }

    /// Start with a callback that sees every change event.
    pub fn start_with(
        config: SyncConfiguration,
        log: Arc<SyncLog>,
        on_event: Option<EventCallback>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let dirty = Arc::new(DirtyFlag::new());

        let mut watcher = ChangeWatcher::new(Arc::clone(&log), Arc::clone(&dirty));
        if let Some(callback) = on_event {
            watcher = watcher.with_callback(callback);
        }

        log.log(format!(
            "Mirroring {} into {} every {}s",
            config.source_root().display(),
            config.replica_root().display(),
            config.interval().as_secs()
        ));

        let watch = subscribe(&watcher, &config, &log);

        let engine = Arc::new(ReconciliationEngine::from_config(&config, Arc::clone(&log)));
        let scheduler =
            SyncScheduler::new(engine, Arc::clone(&log), Arc::clone(&dirty)).start(&config)?;

        Ok(Self {
            config,
            log,
            dirty,
            watcher,
            watch,
            scheduler,
        })
    }

    pub fn config(&self) -> &SyncConfiguration {
        &self.config
    }

    pub fn dirty(&self) -> &DirtyFlag {
        &self.dirty
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.as_ref().is_some_and(WatchHandle::is_active)
    }

    /// Resubscribe if the watch was lost. Returns whether the source is watched afterwards.
    ///
    /// Meant to be called periodically by whoever owns the session.
    pub fn check_watch(&mut self) -> bool {
        if self.is_watching() {
            return true;
        }

        if let Some(mut lost) = self.watch.take() {
            lost.stop();
            self.log.warn(format!(
                "Restarting watch on {} ({})",
                lost.root().display(),
                lost.failure().unwrap_or("stopped")
            ));
        }

        self.watch = subscribe(&self.watcher, &self.config, &self.log);
        self.watch.is_some()
    }

    /// Stop watching, then stop the scheduler once any in-flight pass is done.
    pub fn shutdown(mut self) -> SchedulerStats {
        if let Some(mut watch) = self.watch.take() {
            watch.stop();
        }
        self.scheduler.stop();

        let stats = self.scheduler.stats();
        self.log.log(format!(
            "Synchronization stopped after {} passes ({} ticks skipped)",
            stats.passes_completed, stats.ticks_skipped
        ));
        stats
    }
}

fn subscribe(
    watcher: &ChangeWatcher,
    config: &SyncConfiguration,
    log: &SyncLog,
) -> Option<WatchHandle> {
    match watcher.start(config.source_root()) {
        Ok(handle) => {
            log.log(format!(
                "Monitoring changes in folder: {}",
                config.source_root().display()
            ));
            Some(handle)
        }
        Err(e) => {
            log.error(format!("watch subscription failed: {e}"));
            None
        }
    }
}
