pub mod coordinator;
pub mod tracker;
pub mod worker_pool;

pub use coordinator::{Coordinator, RunSummary};
pub use tracker::{ProgressCounters, ProgressTracker};
pub use worker_pool::{PoolOutcome, WorkerPool};
