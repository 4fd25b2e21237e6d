//! Advisory "something changed since the last pass" flag
//!
//! The watcher marks it, the scheduler clears it after each pass and logs what
//! it saw. It never decides whether a pass runs: passes happen on the timer
//! regardless, so the flag exists for diagnostics only.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DirtyFlag {
    dirty: AtomicBool,
    events: AtomicU64,
}

/// What the flag held at the moment it was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyState {
    pub was_dirty: bool,
    /// Change events observed since the previous clear.
    pub events: u64,
}

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed change.
    pub fn mark(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn pending_events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Reset the flag, returning what it held.
    pub fn clear(&self) -> DirtyState {
        let was_dirty = self.dirty.swap(false, Ordering::AcqRel);
        let events = self.events.swap(0, Ordering::AcqRel);
        DirtyState { was_dirty, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn clear_reports_and_resets() {
        let flag = DirtyFlag::new();
        flag.mark();
        flag.mark();

        assert_eq!(flag.clear(), DirtyState { was_dirty: true, events: 2 });
        assert!(!flag.is_dirty());
        assert_eq!(flag.clear(), DirtyState::default());
    }

    #[test]
    fn concurrent_marks_are_all_counted() {
        let flag = Arc::new(DirtyFlag::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let flag = Arc::clone(&flag);
                thread::spawn(move || (0..1000).for_each(|_| flag.mark()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(flag.pending_events(), 4000);
        assert!(flag.is_dirty());
    }
}
