use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time view of a [`ProgressTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProgressCounters {
    pub attempted: usize,
    pub succeeded: usize,
    pub total: usize,
}

impl ProgressCounters {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.attempted as f64 / self.total as f64) * 100.0
        }
    }
}

/// Lock-free attempted/succeeded counters shared by all workers.
///
/// `attempted` is always bumped before `succeeded`, and [`snapshot`] reads
/// them in the opposite order, so an observer can never see more successes
/// than attempts.
///
/// [`snapshot`]: ProgressTracker::snapshot
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            attempted: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
        }
    }

    pub fn record_attempt(&self, succeeded: bool) {
        self.attempted.fetch_add(1, Ordering::SeqCst);
        if succeeded {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> ProgressCounters {
        let succeeded = self.succeeded.load(Ordering::SeqCst);
        let attempted = self.attempted.load(Ordering::SeqCst);

        ProgressCounters {
            attempted,
            succeeded,
            total: self.total,
        }
    }
}
