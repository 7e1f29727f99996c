//! Queued job records

use crate::core::error::{PoolError, Result};
use crate::core::result::ResultSlot;
use crate::core::status::{JobStatus, StatusHandle};
use std::fmt;
use std::time::Instant;

/// A work item paired with its optional result slot and status handle.
///
/// The pool moves records through its ring buffer; the worker that dequeues
/// one is the only writer of its slot and status from then on.
pub struct JobRecord<A, R> {
    id: u64,
    arg: A,
    result: Option<ResultSlot<R>>,
    status: Option<StatusHandle>,
    enqueued_at: Instant,
}

impl<A, R> JobRecord<A, R> {
    /// Creates a record stamped with the current time.
    pub fn new(
        id: u64,
        arg: A,
        result: Option<ResultSlot<R>>,
        status: Option<StatusHandle>,
    ) -> Self {
        Self {
            id,
            arg,
            result,
            status,
            enqueued_at: Instant::now(),
        }
    }

    /// Job ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// When the record was created
    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// Takes the argument out of the record, leaving the sinks in place.
    pub(crate) fn into_parts(self) -> (A, JobSinks<R>) {
        (
            self.arg,
            JobSinks {
                id: self.id,
                result: self.result,
                status: self.status,
            },
        )
    }

    /// Fails the job without running it.
    pub(crate) fn reject(self, error: PoolError) -> A {
        let (arg, sinks) = self.into_parts();
        sinks.finish(Err(error));
        arg
    }
}

impl<A, R> fmt::Debug for JobRecord<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRecord")
            .field("id", &self.id)
            .field("has_result", &self.result.is_some())
            .field("status", &self.status)
            .finish()
    }
}

/// Result slot and status handle of a job whose argument has been handed to
/// the transform.
pub(crate) struct JobSinks<R> {
    pub(crate) id: u64,
    result: Option<ResultSlot<R>>,
    status: Option<StatusHandle>,
}

impl<R> JobSinks<R> {
    pub(crate) fn mark(&self, status: JobStatus) {
        if let Some(handle) = &self.status {
            handle.advance(status);
        }
    }

    /// Writes the result first, then the terminal status, so a caller that
    /// saw `Completed` can already read the value.
    pub(crate) fn finish(self, outcome: Result<R>) {
        let status = if outcome.is_ok() {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        if let Some(slot) = self.result {
            slot.fulfill(outcome);
        }
        if let Some(handle) = &self.status {
            handle.advance(status);
        }
    }
}
