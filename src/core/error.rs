//! Error types for the worker pool

use crate::queue::RingError;

/// Result type for worker pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur in the worker pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The job queue was full at submission time
    #[error("Job queue is full: {capacity}/{capacity} jobs queued")]
    CapacityExceeded {
        /// Queue capacity
        capacity: usize,
    },

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker thread #{worker_id}: {message}")]
    ThreadCreationFailed {
        /// ID of the worker that failed to spawn
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// The transform panicked while processing a job
    #[error("Transform failed (job_id: {job_id}): {message}")]
    TransformFailure {
        /// ID of the failed job
        job_id: u64,
        /// Panic message
        message: String,
    },

    /// Ring buffer misuse; indicates a broken locking discipline
    #[error("Queue invariant violated: {0}")]
    QueueInvariant(#[from] RingError),

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// The pool no longer accepts jobs
    #[error("Worker pool '{pool_name}' is shutting down")]
    ShuttingDown {
        /// Name of the pool
        pool_name: String,
    },

    /// A queued job was discarded at shutdown before it started
    #[error("Job abandoned at shutdown (job_id: {job_id})")]
    Abandoned {
        /// ID of the abandoned job
        job_id: u64,
    },

    /// The result slot was dropped without a value
    #[error("No result available (job_id: {job_id})")]
    ResultUnavailable {
        /// ID of the job
        job_id: u64,
    },

    /// Waiting for a result or status timed out
    #[error("Wait timed out after {timeout_ms}ms")]
    WaitTimeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread #{worker_id}: {message}")]
    JoinFailed {
        /// ID of the worker
        worker_id: usize,
        /// Error message
        message: String,
    },

    /// Statistics or configuration could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The acceptor failed
    #[error("Accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

impl PoolError {
    /// Create a capacity exceeded error
    pub fn capacity_exceeded(capacity: usize) -> Self {
        PoolError::CapacityExceeded { capacity }
    }

    /// Create a thread creation error
    pub fn thread_creation(worker_id: usize, message: impl Into<String>) -> Self {
        PoolError::ThreadCreationFailed {
            worker_id,
            message: message.into(),
            source: None,
        }
    }

    /// Create a thread creation error with source
    pub fn thread_creation_with_source(worker_id: usize, source: std::io::Error) -> Self {
        PoolError::ThreadCreationFailed {
            worker_id,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a transform failure error
    pub fn transform_failure(job_id: u64, message: impl Into<String>) -> Self {
        PoolError::TransformFailure {
            job_id,
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a shutting down error
    pub fn shutting_down(pool_name: impl Into<String>) -> Self {
        PoolError::ShuttingDown {
            pool_name: pool_name.into(),
        }
    }

    /// Create a wait timeout error
    pub fn wait_timeout(timeout: std::time::Duration) -> Self {
        PoolError::WaitTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a join error
    pub fn join_failed(worker_id: usize, message: impl Into<String>) -> Self {
        PoolError::JoinFailed {
            worker_id,
            message: message.into(),
        }
    }

    /// Returns true for errors a producer can recover from by retrying later.
    pub fn is_backpressure(&self) -> bool {
        matches!(self, PoolError::CapacityExceeded { .. })
    }
}
