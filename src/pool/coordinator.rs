use crate::error::{BulkUnpackError, Result};
use crate::extractor::{ExtractionResult, Extractor};
use crate::pool::tracker::ProgressTracker;
use crate::pool::worker_pool::WorkerPool;
use crate::scanner::{ArchivePath, ArchiveScanner};
use crate::ui::progress::{finish_progress_with_summary, update_archive_progress};
use crate::ui::ProgressManager;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Final tally of one decompression run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_archives: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub elapsed_seconds: f64,
    pub worker_count: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub failures: Vec<ExtractionResult>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    /// Succeeded over total archives; archives skipped by cancellation count against it.
    pub fn success_ratio(&self) -> f64 {
        if self.total_archives == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.total_archives as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.attempted == self.total_archives
    }

    pub fn meets_threshold(&self, min_success_ratio: f64) -> bool {
        !self.cancelled && self.success_ratio() >= min_success_ratio
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_seconds)
    }
}

/// Enumerates archives, fans them out over a [`WorkerPool`] and reports
/// progress until the pool is quiescent.
pub struct Coordinator<E: Extractor> {
    scanner: ArchiveScanner,
    extractor: E,
    progress: ProgressManager,
    poll_interval: Duration,
    running: Option<Arc<AtomicBool>>,
}

impl<E: Extractor> Coordinator<E> {
    pub fn new(scanner: ArchiveScanner, extractor: E) -> Self {
        Self {
            scanner,
            extractor,
            progress: ProgressManager::new(false),
            poll_interval: DEFAULT_POLL_INTERVAL,
            running: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_cancellation(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn run<P: AsRef<Path>>(&self, root: P, worker_count: usize) -> Result<RunSummary> {
        if worker_count < 1 {
            return Err(BulkUnpackError::config(format!(
                "Worker count must be at least 1 (got {})",
                worker_count
            )));
        }

        let archives = self.scanner.scan_directory(root.as_ref())?;
        debug!(
            "{}",
            self.scanner.get_statistics(&archives).display_summary()
        );

        self.execute(archives, worker_count)
    }

    /// Runs an already enumerated archive list.
    pub fn execute(&self, archives: Vec<ArchivePath>, worker_count: usize) -> Result<RunSummary> {
        if archives.is_empty() {
            return Err(BulkUnpackError::data_integrity(
                "archive list is empty, nothing to extract",
            ));
        }

        let mut pool = WorkerPool::new(worker_count)?;
        if let Some(ref running) = self.running {
            pool = pool.with_cancellation(running.clone());
        }

        let total = archives.len();
        pool.submit_all(archives);

        let tracker = ProgressTracker::new(total);
        let failures = Mutex::new(Vec::new());
        let bar = self.progress.create_archive_progress(total as u64);
        let report_in_background = worker_count > 1;
        let quiescent = AtomicBool::new(false);
        let started_at = Utc::now();

        info!(archives = total, workers = worker_count, "starting extraction");

        let (outcome, elapsed) = thread::scope(|scope| {
            let tracker = &tracker;
            let bar = &bar;
            let quiescent = &quiescent;
            let interval = self.poll_interval;

            let reporter = report_in_background
                .then(|| scope.spawn(move || reporting_loop(tracker, bar, quiescent, interval)));

            let start = Instant::now();
            let outcome = pool.run(&self.extractor, |result| {
                tracker.record_attempt(result.succeeded);

                if !report_in_background {
                    update_archive_progress(bar, &tracker.snapshot());
                }

                if !result.succeeded {
                    record_failure(bar, &failures, result);
                }
            });
            let elapsed = start.elapsed();

            quiescent.store(true, Ordering::SeqCst);
            if let Some(reporter) = reporter {
                join_reporter(reporter);
            }

            (outcome, elapsed)
        });
        let outcome = outcome?;

        let counters = tracker.snapshot();
        let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        let summary = RunSummary {
            total_archives: total,
            attempted: counters.attempted,
            succeeded: counters.succeeded,
            elapsed_seconds: elapsed.as_secs_f64(),
            worker_count,
            cancelled: outcome.cancelled,
            started_at,
            failures,
        };

        let message = if summary.cancelled {
            format!("Cancelled after {}/{} archives", summary.attempted, total)
        } else {
            format!("Extracted {}/{} archives", summary.succeeded, total)
        };
        finish_progress_with_summary(&bar, &message, elapsed);

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            elapsed_seconds = summary.elapsed_seconds,
            cancelled = summary.cancelled,
            "extraction finished"
        );

        Ok(summary)
    }
}

/// Logs a failed archive without tearing the progress bar and keeps it for the summary.
fn record_failure(
    bar: &ProgressBar,
    failures: &Mutex<Vec<ExtractionResult>>,
    result: ExtractionResult,
) {
    bar.suspend(|| {
        warn!(
            archive = %result.path.display(),
            exit_code = ?result.exit_code,
            diagnostic = %result.diagnostic,
            "extraction failed"
        )
    });
    failures
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(result);
}

/// Returns false when the reporter panicked. Progress display is lost, the run is not.
fn join_reporter(reporter: ScopedJoinHandle<'_, ()>) -> bool {
    match reporter.join() {
        Ok(()) => true,
        Err(_) => {
            warn!("progress reporter thread panicked");
            false
        }
    }
}

fn reporting_loop(
    tracker: &ProgressTracker,
    bar: &ProgressBar,
    quiescent: &AtomicBool,
    interval: Duration,
) {
    loop {
        let done = quiescent.load(Ordering::SeqCst);
        update_archive_progress(bar, &tracker.snapshot());
        if done {
            break;
        }
        thread::sleep(interval);
    }
}
