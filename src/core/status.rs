//! Job lifecycle tracking
//!
//! A [`StatusHandle`] is a shared cell the submitter keeps while a worker
//! moves the job through its lifecycle:
//!
//! ```text
//! Undefined -> Queued -> InProcessing -> Completed
//!                                     \-> Failed
//! ```
//!
//! `Failed` can also be reached straight from `Undefined` or `Queued` when a
//! submission is rejected or a queued job is abandoned at shutdown.

use crate::core::error::{PoolError, Result};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle state of a submitted job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Not submitted yet
    #[default]
    Undefined,
    /// Accepted into the queue
    Queued,
    /// Picked up by a worker
    InProcessing,
    /// The transform returned normally
    Completed,
    /// Rejected, abandoned, or the transform panicked
    Failed,
}

impl JobStatus {
    fn rank(self) -> u8 {
        match self {
            JobStatus::Undefined => 0,
            JobStatus::Queued => 1,
            JobStatus::InProcessing => 2,
            JobStatus::Completed | JobStatus::Failed => 3,
        }
    }

    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Undefined => "undefined",
            JobStatus::Queued => "queued",
            JobStatus::InProcessing => "in-processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct StatusCell {
    state: Mutex<JobStatus>,
    changed: Condvar,
}

/// Shared, caller-visible status of one job.
///
/// Cloning yields another handle to the same cell. Transitions only move
/// forward; once terminal, the status never changes again.
///
/// # Example
///
/// ```rust
/// use ring_pool::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(2, 8, |x: u32| x + 1)?;
/// let status = StatusHandle::new();
///
/// pool.submit(41, None, Some(status.clone()))?;
/// assert_eq!(status.wait(), JobStatus::Completed);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct StatusHandle {
    cell: Arc<StatusCell>,
}

impl StatusHandle {
    /// Creates a handle in the `Undefined` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    pub fn get(&self) -> JobStatus {
        *self.cell.state.lock()
    }

    /// Returns true once the job has completed or failed.
    pub fn is_terminal(&self) -> bool {
        self.get().is_terminal()
    }

    /// Blocks until the job reaches a terminal state.
    pub fn wait(&self) -> JobStatus {
        let mut state = self.cell.state.lock();
        while !state.is_terminal() {
            self.cell.changed.wait(&mut state);
        }
        *state
    }

    /// Blocks until the job reaches a terminal state or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::WaitTimeout`] if the job is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<JobStatus> {
        let deadline = Instant::now() + timeout;
        let mut state = self.cell.state.lock();
        while !state.is_terminal() {
            if self.cell.changed.wait_until(&mut state, deadline).timed_out() {
                return Err(PoolError::wait_timeout(timeout));
            }
        }
        Ok(*state)
    }

    /// Moves the status forward to `next`.
    ///
    /// Returns false, leaving the status unchanged, if `next` is not later in
    /// the lifecycle than the current state.
    pub(crate) fn advance(&self, next: JobStatus) -> bool {
        let mut state = self.cell.state.lock();
        if state.is_terminal() || next.rank() <= state.rank() {
            return false;
        }
        *state = next;
        if next.is_terminal() {
            self.cell.changed.notify_all();
        }
        true
    }
}

impl fmt::Debug for StatusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusHandle").field(&self.get()).finish()
    }
}
