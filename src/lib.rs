//! # Ring Pool
//!
//! A fixed-size worker pool that applies one shared transform to work items
//! held in a bounded ring buffer.
//!
//! ## Features
//!
//! - **Bounded Queue**: Jobs wait in a fixed-capacity FIFO ring buffer
//! - **Non-blocking Submission**: A full queue rejects the job instead of blocking the producer
//! - **Job Status**: Optional handle reporting `Queued`, `InProcessing`, `Completed` or `Failed`
//! - **Job Results**: Optional one-shot handle receiving the transform's output
//! - **Panic Isolation**: A panicking transform fails its job, not its worker
//! - **Graceful Shutdown**: Workers drain (or abandon) queued jobs and are joined
//! - **Accept Loop**: [`serve`](serve::serve) feeds accepted connections into a pool
//!
//! ## Quick Start
//!
//! ```rust
//! use ring_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! // Four workers, room for 128 queued jobs
//! let pool = WorkerPool::new(4, 128, |n: u64| (1..=n).product::<u64>())?;
//!
//! let status = StatusHandle::new();
//! let factorial = pool.submit_with_result(10, Some(status.clone()))?;
//!
//! assert_eq!(factorial.wait()?, 3_628_800);
//! assert_eq!(status.get(), JobStatus::Completed);
//!
//! pool.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Backpressure
//!
//! ```rust
//! use ring_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(1, 2, |line: String| line.len())?;
//!
//! for i in 0..100 {
//!     match pool.try_submit(format!("line {}", i), None, None) {
//!         Ok(()) => {}
//!         Err(rejected) if rejected.error().is_backpressure() => {
//!             // The item comes back; handle it on this thread instead
//!             let line = rejected.into_inner();
//!             assert!(line.starts_with("line"));
//!         }
//!         Err(rejected) => return Err(rejected.into_error()),
//!     }
//! }
//! # pool.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Pool Configuration
//!
//! ```rust
//! use ring_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = WorkerPoolConfig::new(8, 1000)
//!     .with_thread_name_prefix("resize")
//!     .with_shutdown_policy(ShutdownPolicy::Abandon);
//!
//! let pool = WorkerPool::with_config(config, |px: u32| px / 2)?;
//! # pool.shutdown()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub mod queue;
pub mod serve;
pub mod tracing;

pub use crate::core::{JobStatus, PoolError, Result, ResultHandle, StatusHandle};
pub use crate::pool::{PoolStats, ShutdownPolicy, WorkerPool, WorkerPoolConfig};
