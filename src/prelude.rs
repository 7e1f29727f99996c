//! Convenient re-exports for common types and traits

pub use crate::core::{
    result_slot, JobStatus, PoolError, Result, ResultHandle, ResultSlot, StatusHandle,
};
pub use crate::pool::{
    PoolStats, ShutdownPolicy, SubmitError, WorkerPool, WorkerPoolConfig, WorkerStats,
};
pub use crate::serve::{serve, Acceptor, OverflowPolicy, ServeStats};
