use crate::error::{BulkUnpackError, Result};
use crate::extractor::{ExtractionResult, Extractor};
use crate::scanner::ArchivePath;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace};

/// How a pool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOutcome {
    pub submitted: usize,
    pub attempted: usize,
    pub cancelled: bool,
}

impl PoolOutcome {
    pub fn unattempted(&self) -> usize {
        self.submitted - self.attempted
    }
}

/// Fixed number of worker threads draining a shared archive queue.
///
/// Archives are queued with [`submit`](Self::submit); [`run`](Self::run)
/// closes the queue, starts the workers and blocks until all of them have
/// exited. Each worker holds at most one archive at a time and each queued
/// archive is handed to exactly one worker.
pub struct WorkerPool {
    worker_count: usize,
    sender: Sender<ArchivePath>,
    receiver: Receiver<ArchivePath>,
    submitted: usize,
    running: Option<Arc<AtomicBool>>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count < 1 {
            return Err(BulkUnpackError::config(format!(
                "Worker count must be at least 1 (got {})",
                worker_count
            )));
        }

        let (sender, receiver) = unbounded();

        Ok(Self {
            worker_count,
            sender,
            receiver,
            submitted: 0,
            running: None,
        })
    }

    /// Workers stop taking new archives once `running` turns false.
    /// Extractions already in flight run to completion.
    pub fn with_cancellation(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn submit(&mut self, archive: ArchivePath) {
        // The pool owns a receiver, so the channel cannot be disconnected here.
        if self.sender.send(archive).is_ok() {
            self.submitted += 1;
        }
    }

    pub fn submit_all<I>(&mut self, archives: I)
    where
        I: IntoIterator<Item = ArchivePath>,
    {
        for archive in archives {
            self.submit(archive);
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Convenience wrapper: queue `archives` and run them to completion.
    pub fn process<E, F>(
        archives: Vec<ArchivePath>,
        worker_count: usize,
        extractor: &E,
        on_result: F,
    ) -> Result<PoolOutcome>
    where
        E: Extractor,
        F: Fn(ExtractionResult) + Sync,
    {
        let mut pool = Self::new(worker_count)?;
        pool.submit_all(archives);
        pool.run(extractor, on_result)
    }

    pub fn run<E, F>(self, extractor: &E, on_result: F) -> Result<PoolOutcome>
    where
        E: Extractor,
        F: Fn(ExtractionResult) + Sync,
    {
        let WorkerPool {
            worker_count,
            sender,
            receiver,
            submitted,
            running,
        } = self;

        // With the only sender gone, an empty queue means there is no work left.
        drop(sender);

        let spawned = worker_count.min(submitted);
        let attempted = AtomicUsize::new(0);
        debug!(workers = spawned, archives = submitted, "starting worker pool");

        let panicked = thread::scope(|scope| -> Result<usize> {
            let on_result = &on_result;
            let attempted = &attempted;
            let running = running.as_deref();

            let mut handles = Vec::with_capacity(spawned);
            for id in 0..spawned {
                let receiver = receiver.clone();
                let handle = thread::Builder::new()
                    .name(format!("unpack-worker-{}", id))
                    .spawn_scoped(scope, move || {
                        worker_loop(id, &receiver, extractor, on_result, running, attempted)
                    })
                    .map_err(|e| BulkUnpackError::Worker {
                        message: format!("failed to spawn worker {}: {}", id, e),
                    })?;
                handles.push(handle);
            }

            Ok(handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(|joined| joined.is_err())
                .count())
        })?;

        if panicked > 0 {
            return Err(BulkUnpackError::Worker {
                message: format!("{} worker thread(s) panicked", panicked),
            });
        }

        let attempted = attempted.load(Ordering::SeqCst);
        let cancelled = attempted < submitted;
        debug!(attempted, submitted, cancelled, "worker pool drained");

        Ok(PoolOutcome {
            submitted,
            attempted,
            cancelled,
        })
    }
}

fn worker_loop<E, F>(
    id: usize,
    queue: &Receiver<ArchivePath>,
    extractor: &E,
    on_result: &F,
    running: Option<&AtomicBool>,
    attempted: &AtomicUsize,
) where
    E: Extractor,
    F: Fn(ExtractionResult),
{
    loop {
        if running.is_some_and(|flag| !flag.load(Ordering::SeqCst)) {
            trace!(worker = id, "stop requested, leaving queue");
            break;
        }

        let archive = match queue.recv() {
            Ok(archive) => archive,
            Err(_) => break,
        };

        trace!(worker = id, archive = %archive.display_path(), "extracting");
        let result = extractor.extract(&archive);
        attempted.fetch_add(1, Ordering::SeqCst);
        on_result(result);
    }
}
