//! Pool-wide statistics.

use crate::core::Result;
use chrono::{DateTime, Utc};
use crossbeam_utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by producers and workers.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    submitted: CachePadded<AtomicU64>,
    rejected: CachePadded<AtomicU64>,
    abandoned: AtomicU64,
    dequeued: AtomicU64,
    queue_wait_us: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn record_submission(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self, count: u64) {
        self.abandoned.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_dequeue(&self, waited: Duration) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
        self.queue_wait_us
            .fetch_add(waited.as_micros() as u64, Ordering::Relaxed);
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub(crate) fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub(crate) fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    pub(crate) fn avg_queue_wait_us(&self) -> f64 {
        let dequeued = self.dequeued.load(Ordering::Relaxed);
        if dequeued == 0 {
            0.0
        } else {
            self.queue_wait_us.load(Ordering::Relaxed) as f64 / dequeued as f64
        }
    }
}

/// Point-in-time counters of one worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorkerStatSnapshot {
    /// Worker ID
    pub worker_id: usize,
    /// Jobs whose transform returned normally
    pub jobs_completed: u64,
    /// Jobs whose transform panicked
    pub jobs_failed: u64,
    /// Time spent inside the transform (microseconds)
    pub busy_time_us: u64,
}

/// Point-in-time view of a [`WorkerPool`](crate::pool::WorkerPool).
///
/// Counters are read without a common lock, so a snapshot taken while jobs
/// are moving may be off by the jobs in flight.
#[derive(Clone, Debug, Serialize)]
pub struct PoolStats {
    /// Thread name prefix of the pool
    pub pool_name: String,
    /// Number of worker threads
    pub pool_size: usize,
    /// Queue capacity
    pub queue_capacity: usize,
    /// Jobs waiting in the queue
    pub queue_depth: usize,
    /// Accepted submissions
    pub jobs_submitted: u64,
    /// Submissions rejected because the queue was full
    pub jobs_rejected: u64,
    /// Jobs completed across all workers
    pub jobs_completed: u64,
    /// Jobs failed across all workers
    pub jobs_failed: u64,
    /// Queued jobs discarded at shutdown
    pub jobs_abandoned: u64,
    /// Mean time between submission and dequeue (microseconds)
    pub avg_queue_wait_us: f64,
    /// When the pool finished spawning its workers
    pub started_at: DateTime<Utc>,
    /// Per-worker counters
    pub workers: Vec<WorkerStatSnapshot>,
}

impl PoolStats {
    /// Jobs that reached a terminal state in a worker.
    pub fn jobs_processed(&self) -> u64 {
        self.jobs_completed + self.jobs_failed
    }

    /// Serializes the snapshot as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Serialization`](crate::core::PoolError::Serialization)
    /// if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PoolError;

    #[test]
    fn test_counters() {
        let counters = PoolCounters::default();
        counters.record_submission();
        counters.record_submission();
        counters.record_rejection();
        counters.record_abandoned(3);

        assert_eq!(counters.submitted(), 2);
        assert_eq!(counters.rejected(), 1);
        assert_eq!(counters.abandoned(), 3);
    }

    #[test]
    fn test_avg_queue_wait() {
        let counters = PoolCounters::default();
        assert_eq!(counters.avg_queue_wait_us(), 0.0);

        counters.record_dequeue(Duration::from_micros(100));
        counters.record_dequeue(Duration::from_micros(300));
        assert_eq!(counters.avg_queue_wait_us(), 200.0);
    }

    #[test]
    fn test_stats_json() {
        let stats = PoolStats {
            pool_name: "calc".to_string(),
            pool_size: 2,
            queue_capacity: 8,
            queue_depth: 0,
            jobs_submitted: 5,
            jobs_rejected: 1,
            jobs_completed: 3,
            jobs_failed: 1,
            jobs_abandoned: 0,
            avg_queue_wait_us: 12.5,
            started_at: Utc::now(),
            workers: vec![WorkerStatSnapshot {
                worker_id: 0,
                jobs_completed: 3,
                jobs_failed: 1,
                busy_time_us: 40,
            }],
        };
        assert_eq!(stats.jobs_processed(), 4);

        let json = stats.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pool_name"], "calc");
        assert_eq!(value["jobs_rejected"], 1);
        assert_eq!(value["workers"][0]["jobs_completed"], 3);
    }

    #[test]
    fn test_serialization_error_maps_to_pool_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PoolError::from(err);
        assert!(matches!(err, PoolError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization failed"));
    }
}
