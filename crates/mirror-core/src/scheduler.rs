//! Fixed-rate reconciliation passes
//!
//! Two threads: a timer that fires every `interval` (tick `k` is due at
//! `start + k * interval`, however long passes take) and an executor that runs
//! one pass per dispatched tick. A busy gate sits between them: a tick that
//! fires while a pass is still running is logged and dropped, never queued.
//! At most one pass therefore exists at any time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::SyncConfiguration;
use crate::dirty::DirtyFlag;
use crate::log::SyncLog;
use crate::reconcile::Reconcile;
use crate::{Error, Result};

/// Counters since the scheduler started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub passes_completed: u64,
    pub ticks_skipped: u64,
}

#[derive(Debug, Default)]
struct Shared {
    busy: AtomicBool,
    ticks: AtomicU64,
    passes_completed: AtomicU64,
    ticks_skipped: AtomicU64,
}

/// Releases the busy gate when a pass ends, including by panic.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives an engine on a timer.
#[derive(Debug)]
pub struct SyncScheduler<E> {
    engine: Arc<E>,
    log: Arc<SyncLog>,
    dirty: Arc<DirtyFlag>,
}

impl<E: Reconcile + 'static> SyncScheduler<E> {
    pub fn new(engine: Arc<E>, log: Arc<SyncLog>, dirty: Arc<DirtyFlag>) -> Self {
        Self { engine, log, dirty }
    }

    /// Start passes between the configured roots at the configured interval.
    pub fn start(&self, config: &SyncConfiguration) -> Result<SchedulerHandle> {
        self.start_every(config.source_root(), config.replica_root(), config.interval())
    }

    /// Start passes from `source` into `replica`; the first fires after one `interval`.
    pub fn start_every(
        &self,
        source: &Path,
        replica: &Path,
        interval: Duration,
    ) -> Result<SchedulerHandle> {
        if interval.is_zero() {
            return Err(Error::config("interval must be greater than zero"));
        }

        let shared = Arc::new(Shared::default());
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (tick_tx, tick_rx) = mpsc::channel::<u64>();

        let executor = {
            let pass = PassRunner {
                engine: Arc::clone(&self.engine),
                log: Arc::clone(&self.log),
                dirty: Arc::clone(&self.dirty),
                shared: Arc::clone(&shared),
                source: source.to_path_buf(),
                replica: replica.to_path_buf(),
            };
            thread::Builder::new()
                .name("mirror-executor".into())
                .spawn(move || {
                    // Ends once the timer hangs up
                    for tick in tick_rx {
                        pass.run(tick);
                    }
                })
                .map_err(|source| Error::Spawn {
                    name: "executor",
                    source,
                })?
        };

        let timer = {
            let log = Arc::clone(&self.log);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("mirror-timer".into())
                .spawn(move || run_timer(interval, &stop_rx, &tick_tx, &shared, &log))
                .map_err(|source| Error::Spawn {
                    name: "timer",
                    source,
                })?
        };

        tracing::debug!(?source, ?replica, ?interval, "Scheduler started");
        Ok(SchedulerHandle {
            stop_tx: Some(stop_tx),
            timer: Some(timer),
            executor: Some(executor),
            shared,
        })
    }
}

fn run_timer(
    interval: Duration,
    stop_rx: &mpsc::Receiver<()>,
    tick_tx: &Sender<u64>,
    shared: &Shared,
    log: &SyncLog,
) {
    let mut next_due = Instant::now() + interval;

    loop {
        let wait = next_due.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        let tick = shared.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if tick_tx.send(tick).is_err() {
                tracing::error!("Executor is gone, stopping timer");
                return;
            }
        } else {
            shared.ticks_skipped.fetch_add(1, Ordering::Relaxed);
            log.warn(format!("Tick {tick}: pass overlap, skipped"));
        }

        next_due += interval;
        let now = Instant::now();
        if next_due <= now {
            // Fell behind (suspend, starved thread): count the lost ticks, don't replay them
            let mut missed = 0u64;
            while next_due <= now {
                next_due += interval;
                missed += 1;
            }
            shared.ticks.fetch_add(missed, Ordering::Relaxed);
            shared.ticks_skipped.fetch_add(missed, Ordering::Relaxed);
            tracing::warn!(missed, "Timer fell behind, ticks dropped");
        }
    }
}

/// Everything the executor thread needs for one pass.
struct PassRunner<E> {
    engine: Arc<E>,
    log: Arc<SyncLog>,
    dirty: Arc<DirtyFlag>,
    shared: Arc<Shared>,
    source: PathBuf,
    replica: PathBuf,
}

impl<E: Reconcile> PassRunner<E> {
    fn run(&self, tick: u64) {
        let _busy = BusyGuard(&self.shared.busy);

        self.log.log(format!("Tick {tick}: synchronizing changes..."));
        let result = self.engine.reconcile(&self.source, &self.replica);

        let seen = self.dirty.clear();
        if seen.was_dirty {
            self.log.log(format!(
                "{} change events observed since the previous pass",
                seen.events
            ));
        } else {
            self.log.log("No change events observed since the previous pass");
        }

        if result.has_failures() {
            self.log.warn(result.to_string());
        } else {
            self.log.log(result.to_string());
        }
        self.shared.passes_completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Running scheduler. Stops (waiting for an in-flight pass) on [`stop`](Self::stop) or drop.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: Option<Sender<()>>,
    timer: Option<JoinHandle<()>>,
    executor: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.shared.ticks.load(Ordering::Relaxed),
            passes_completed: self.shared.passes_completed.load(Ordering::Relaxed),
            ticks_skipped: self.shared.ticks_skipped.load(Ordering::Relaxed),
        }
    }

    /// Whether a pass is running right now.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Stop the timer, let an in-flight pass finish, and join both threads.
    pub fn stop(&mut self) {
        // Hanging up wakes the timer immediately
        drop(self.stop_tx.take());

        for (name, handle) in [("timer", self.timer.take()), ("executor", self.executor.take())] {
            if let Some(handle) = handle
                && handle.join().is_err()
            {
                tracing::error!("Scheduler {name} thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
