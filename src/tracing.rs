//! Tracing integration for observability.
//!
//! With the `tracing` feature enabled, workers run inside a `worker` span,
//! each job inside a `job_execution` span, and the pool emits the metric
//! events in [`metrics`]. Without the feature only the [`log`] output remains.
//!
//! # Example
//!
//! ```rust,ignore
//! use ring_pool::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("ring_pool=trace".parse().unwrap()))
//!     .init();
//!
//! let pool = WorkerPool::new(4, 1024, |x: u64| x * 2)?;
//! pool.execute(21)?;
//! ```

/// Metrics recording functions for observability.
///
/// These functions emit tracing events that can be consumed by
/// metrics collection systems like Prometheus via tracing-opentelemetry.
#[cfg(feature = "tracing")]
pub mod metrics {
    use std::time::Duration;

    /// Records an accepted submission.
    #[inline]
    pub fn record_submission(queue_depth: usize) {
        tracing::trace!(
            counter.jobs_submitted = 1,
            gauge.queue_depth = queue_depth as i64,
            "job submitted"
        );
    }

    /// Records a submission rejected by a full queue.
    #[inline]
    pub fn record_rejection(queue_capacity: usize) {
        tracing::debug!(
            counter.jobs_rejected = 1,
            queue_capacity = queue_capacity,
            "job rejected: queue full"
        );
    }

    /// Records a transform that returned normally.
    #[inline]
    pub fn record_completion(duration: Duration) {
        tracing::trace!(
            counter.jobs_completed = 1,
            histogram.job_duration_ms = duration.as_millis() as u64,
            "job completed"
        );
    }

    /// Records a transform that panicked.
    #[inline]
    pub fn record_panic(duration: Duration) {
        tracing::trace!(
            counter.jobs_failed = 1,
            histogram.job_duration_ms = duration.as_millis() as u64,
            "job panicked"
        );
    }

    /// Records worker becoming busy.
    #[inline]
    pub fn record_worker_busy(worker_id: usize) {
        tracing::trace!(
            gauge.workers_busy = 1,
            worker_id = worker_id,
            "worker busy"
        );
    }

    /// Records worker becoming idle.
    #[inline]
    pub fn record_worker_idle(worker_id: usize) {
        tracing::trace!(
            gauge.workers_busy = -1i64,
            worker_id = worker_id,
            "worker idle"
        );
    }

    /// Records a connection dropped by the accept loop.
    #[inline]
    pub fn record_connection_dropped(retries: u32) {
        tracing::debug!(
            counter.connections_dropped = 1,
            retries = retries,
            "connection dropped: pool saturated"
        );
    }

    /// Records pool startup.
    #[inline]
    pub fn record_pool_start(num_workers: usize, queue_capacity: usize) {
        tracing::info!(
            workers = num_workers,
            queue_capacity = queue_capacity,
            "worker pool started"
        );
    }

    /// Records pool shutdown.
    #[inline]
    pub fn record_pool_shutdown(jobs_submitted: u64, jobs_abandoned: u64) {
        tracing::info!(
            jobs_submitted = jobs_submitted,
            jobs_abandoned = jobs_abandoned,
            "worker pool shutdown complete"
        );
    }

}
