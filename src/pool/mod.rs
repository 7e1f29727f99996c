//! Worker pool and worker implementations

pub mod config;
pub mod stats;
pub mod worker;
pub mod worker_pool;

pub use config::{ShutdownPolicy, WorkerPoolConfig, DEFAULT_QUEUE_CAPACITY};
pub use stats::{PoolStats, WorkerStatSnapshot};
pub use worker::{Worker, WorkerStats};
pub use worker_pool::{SubmitError, Transform, WorkerPool};
