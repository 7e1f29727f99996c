//! One-shot result delivery from a worker to the submitter

use crate::core::error::{PoolError, Result};
use crossbeam_channel::{self as channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::time::Duration;

/// Creates a connected result slot and handle for job `job_id`.
///
/// Most callers use [`WorkerPool::submit_with_result`] instead, which creates
/// the pair with the pool's next job ID.
///
/// [`WorkerPool::submit_with_result`]: crate::pool::WorkerPool::submit_with_result
pub fn result_slot<R>(job_id: u64) -> (ResultSlot<R>, ResultHandle<R>) {
    let (sender, receiver) = channel::bounded(1);
    (
        ResultSlot { job_id, sender },
        ResultHandle { job_id, receiver },
    )
}

/// Write end of a job's result, owned by the job record.
///
/// Consumed by the single write, so a result is delivered at most once.
pub struct ResultSlot<R> {
    job_id: u64,
    sender: Sender<Result<R>>,
}

impl<R> ResultSlot<R> {
    /// ID of the job this slot belongs to.
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Delivers the outcome. A dropped handle is not an error: the submitter
    /// simply stopped caring.
    pub(crate) fn fulfill(self, outcome: Result<R>) {
        let _ = self.sender.try_send(outcome);
    }
}

impl<R> fmt::Debug for ResultSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSlot")
            .field("job_id", &self.job_id)
            .finish()
    }
}

/// Read end of a job's result, kept by the submitter.
pub struct ResultHandle<R> {
    job_id: u64,
    receiver: Receiver<Result<R>>,
}

impl<R> ResultHandle<R> {
    /// ID of the job this handle belongs to.
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Blocks until the job finishes.
    ///
    /// # Errors
    ///
    /// - [`PoolError::TransformFailure`] if the transform panicked
    /// - [`PoolError::Abandoned`] if the job was discarded at shutdown
    /// - [`PoolError::ResultUnavailable`] if the slot was dropped unfilled
    pub fn wait(self) -> Result<R> {
        self.receiver
            .recv()
            .unwrap_or(Err(PoolError::ResultUnavailable {
                job_id: self.job_id,
            }))
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    ///
    /// On [`PoolError::WaitTimeout`] the handle is lost; use
    /// [`try_get`](Self::try_get) to poll without consuming it.
    pub fn wait_timeout(self, timeout: Duration) -> Result<R> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(PoolError::wait_timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::ResultUnavailable {
                job_id: self.job_id,
            }),
        }
    }

    /// Returns the outcome if the job has finished, `None` otherwise.
    pub fn try_get(&self) -> Option<Result<R>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PoolError::ResultUnavailable {
                job_id: self.job_id,
            })),
        }
    }
}

impl<R> fmt::Debug for ResultHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("job_id", &self.job_id)
            .field("ready", &!self.receiver.is_empty())
            .finish()
    }
}
