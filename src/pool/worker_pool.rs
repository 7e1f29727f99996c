//! Worker pool implementation

use crate::core::{
    result_slot, JobRecord, JobStatus, PoolError, Result, ResultHandle, ResultSlot, StatusHandle,
};
use crate::pool::config::{ShutdownPolicy, WorkerPoolConfig};
use crate::pool::stats::{PoolCounters, PoolStats};
use crate::pool::worker::{Worker, WorkerStats};
use crate::queue::BoundedQueue;
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The shared computation applied to every work item.
pub type Transform<A, R> = dyn Fn(A) -> R + Send + Sync + 'static;

/// Everything guarded by the pool mutex.
pub(crate) struct QueueState<A, R> {
    pub(crate) queue: BoundedQueue<JobRecord<A, R>>,
    pub(crate) stopping: bool,
}

/// State shared between the pool handle and its workers.
pub(crate) struct Shared<A, R> {
    pub(crate) name: String,
    pub(crate) state: Mutex<QueueState<A, R>>,
    /// Signalled when a job is queued or the pool starts stopping
    pub(crate) available: Condvar,
    pub(crate) transform: Box<Transform<A, R>>,
    pub(crate) counters: PoolCounters,
}

/// A rejected submission, carrying the work item back to the caller.
///
/// Returned by [`WorkerPool::try_submit`] so a producer can retry or dispose
/// of the item (for example, close a connection) itself.
pub struct SubmitError<A> {
    arg: A,
    error: PoolError,
}

impl<A> SubmitError<A> {
    /// Why the submission was rejected
    pub fn error(&self) -> &PoolError {
        &self.error
    }

    /// Recover the work item
    pub fn into_inner(self) -> A {
        self.arg
    }

    /// Split into the work item and the error
    pub fn into_parts(self) -> (A, PoolError) {
        (self.arg, self.error)
    }

    /// Drop the work item, keeping the error
    pub fn into_error(self) -> PoolError {
        self.error
    }
}

impl<A> fmt::Debug for SubmitError<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<A> fmt::Display for SubmitError<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<A> std::error::Error for SubmitError<A> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A fixed-size pool of worker threads consuming a bounded job queue.
///
/// Every job's argument is passed to one shared transform `Fn(A) -> R`.
/// Submission never blocks: when the queue is full the job is rejected with
/// [`PoolError::CapacityExceeded`].
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) (also run on drop) stops accepting jobs,
/// wakes every worker and joins them. Transforms already running always
/// finish. Queued jobs are either run or abandoned, per [`ShutdownPolicy`].
///
/// # Example
///
/// ```rust
/// use ring_pool::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(4, 64, |x: u64| x * x)?;
///
/// let handles: Vec<_> = (0..10)
///     .map(|x| pool.submit_with_result(x, None))
///     .collect::<Result<_>>()?;
///
/// let squares: Vec<u64> = handles
///     .into_iter()
///     .map(ResultHandle::wait)
///     .collect::<Result<_>>()?;
/// assert_eq!(squares[9], 81);
///
/// pool.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool<A, R> {
    config: WorkerPoolConfig,
    shared: Arc<Shared<A, R>>,
    workers: Mutex<Vec<Worker>>,
    /// Outlives the join handles so counters survive shutdown
    worker_stats: Vec<Arc<WorkerStats>>,
    next_job_id: AtomicU64,
    started_at: DateTime<Utc>,
}

impl<A, R> fmt::Debug for WorkerPool<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("queue_len", &self.queue_len())
            .field("jobs_submitted", &self.shared.counters.submitted())
            .finish()
    }
}

impl<A, R> WorkerPool<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Create a pool of `pool_size` workers over a queue of `queue_capacity`
    /// jobs.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] if `pool_size == 0` or `queue_capacity < 2`
    /// - [`PoolError::ThreadCreationFailed`] if a worker cannot be spawned
    pub fn new<F>(pool_size: usize, queue_capacity: usize, transform: F) -> Result<Self>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self::with_config(WorkerPoolConfig::new(pool_size, queue_capacity), transform)
    }

    /// Create a pool from a full configuration.
    ///
    /// All workers are running when this returns. If spawning any of them
    /// fails, the ones already started are stopped and joined before the
    /// error is returned.
    pub fn with_config<F>(config: WorkerPoolConfig, transform: F) -> Result<Self>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        config.validate()?;

        let shared = Arc::new(Shared {
            name: config.thread_name_prefix.clone(),
            state: Mutex::new(QueueState {
                queue: BoundedQueue::new(config.queue_capacity)?,
                stopping: false,
            }),
            available: Condvar::new(),
            transform: Box::new(transform),
            counters: PoolCounters::default(),
        });

        let workers = Self::start_workers(&shared, &config, Worker::spawn)?;
        let worker_stats = workers.iter().map(Worker::stats).collect();

        log::debug!(
            "[{}] started {} workers, queue capacity {}",
            shared.name,
            config.pool_size,
            config.queue_capacity
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_start(config.pool_size, config.queue_capacity);

        Ok(Self {
            config,
            shared,
            workers: Mutex::new(workers),
            worker_stats,
            next_job_id: AtomicU64::new(1),
            started_at: Utc::now(),
        })
    }

    /// Spawn `config.pool_size` workers with `spawn`.
    ///
    /// On the first failure the workers already started are stopped and
    /// joined before the error is returned.
    pub(crate) fn start_workers<S>(
        shared: &Arc<Shared<A, R>>,
        config: &WorkerPoolConfig,
        mut spawn: S,
    ) -> Result<Vec<Worker>>
    where
        S: FnMut(usize, Arc<Shared<A, R>>, &WorkerPoolConfig) -> Result<Worker>,
    {
        let mut workers = Vec::with_capacity(config.pool_size);
        for id in 0..config.pool_size {
            match spawn(id, Arc::clone(shared), config) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    log::error!("[{}] {}; stopping {} started workers", shared.name, e, id);
                    Self::stop_workers(shared, workers);
                    return Err(e);
                }
            }
        }
        Ok(workers)
    }

    /// Submit a work item.
    ///
    /// `result` receives the transform's output; pass `None` for
    /// fire-and-forget jobs (the transform still runs). `status` is advanced
    /// through the job lifecycle. A rejected submission marks `status` as
    /// `Failed` and delivers the error to `result`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::CapacityExceeded`] if the queue is full
    /// - [`PoolError::ShuttingDown`] if the pool is shutting down
    pub fn submit(
        &self,
        arg: A,
        result: Option<ResultSlot<R>>,
        status: Option<StatusHandle>,
    ) -> Result<()> {
        self.try_submit(arg, result, status)
            .map_err(SubmitError::into_error)
    }

    /// Like [`submit`](Self::submit), but a rejection hands `arg` back.
    ///
    /// The job ID is taken from `result` when given, otherwise the pool
    /// assigns the next one.
    pub fn try_submit(
        &self,
        arg: A,
        result: Option<ResultSlot<R>>,
        status: Option<StatusHandle>,
    ) -> std::result::Result<(), SubmitError<A>> {
        let id = match &result {
            Some(slot) => slot.job_id(),
            None => self.next_job_id(),
        };
        let record = JobRecord::new(id, arg, result, status.clone());

        let mut state = self.shared.state.lock();
        if state.stopping {
            drop(state);
            return Err(self.reject(record, || PoolError::shutting_down(&self.shared.name)));
        }
        if let Err(full) = state.queue.push_back(record) {
            drop(state);
            let capacity = full.capacity();
            self.shared.counters.record_rejection();
            log::warn!(
                "[{}] rejected job {}: queue full ({} jobs)",
                self.shared.name,
                id,
                capacity
            );
            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_rejection(capacity);
            return Err(self.reject(full.into_inner(), || {
                PoolError::capacity_exceeded(capacity)
            }));
        }
        #[cfg(feature = "tracing")]
        let depth = state.queue.len();
        drop(state);

        self.shared.counters.record_submission();
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_submission(depth);

        // A worker may already have picked the job up; the status cell
        // ignores this if so.
        if let Some(status) = &status {
            status.advance(JobStatus::Queued);
        }
        self.shared.available.notify_one();
        Ok(())
    }

    /// Submit a work item and get a handle to its result.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_with_result(
        &self,
        arg: A,
        status: Option<StatusHandle>,
    ) -> Result<ResultHandle<R>> {
        let (slot, handle) = result_slot(self.next_job_id());
        self.submit(arg, Some(slot), status)?;
        Ok(handle)
    }

    /// Submit a fire-and-forget work item.
    pub fn execute(&self, arg: A) -> Result<()> {
        self.submit(arg, None, None)
    }

    fn next_job_id(&self) -> u64 {
        self.next_job_id.fetch_add(1, Ordering::Relaxed)
    }

    fn reject(
        &self,
        record: JobRecord<A, R>,
        error: impl Fn() -> PoolError,
    ) -> SubmitError<A> {
        let arg = record.reject(error());
        SubmitError {
            arg,
            error: error(),
        }
    }
}

impl<A, R> WorkerPool<A, R> {
    /// Number of worker threads
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Maximum number of queued jobs
    pub fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    /// Jobs currently waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Returns false once shutdown has begun
    pub fn is_running(&self) -> bool {
        !self.shared.state.lock().stopping
    }

    /// Pool configuration
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Statistics for each worker, indexed by worker ID
    pub fn worker_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.worker_stats.clone()
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        let workers: Vec<_> = self
            .worker_stats
            .iter()
            .enumerate()
            .map(|(id, stats)| stats.snapshot(id))
            .collect();

        PoolStats {
            pool_name: self.shared.name.clone(),
            pool_size: self.config.pool_size,
            queue_capacity: self.config.queue_capacity,
            queue_depth: self.queue_len(),
            jobs_submitted: self.shared.counters.submitted(),
            jobs_rejected: self.shared.counters.rejected(),
            jobs_completed: workers.iter().map(|w| w.jobs_completed).sum(),
            jobs_failed: workers.iter().map(|w| w.jobs_failed).sum(),
            jobs_abandoned: self.shared.counters.abandoned(),
            avg_queue_wait_us: self.shared.counters.avg_queue_wait_us(),
            started_at: self.started_at,
            workers,
        }
    }

    /// Shut down using the configured [`ShutdownPolicy`].
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown_with(self.config.shutdown_policy)
    }

    /// Stop accepting jobs, apply `policy` to queued jobs and join every
    /// worker.
    ///
    /// Blocks until running transforms return. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::JoinFailed`] if a worker thread panicked outside a
    /// transform. The remaining workers are still joined.
    pub fn shutdown_with(&self, policy: ShutdownPolicy) -> Result<()> {
        let abandoned: Vec<_> = {
            let mut state = self.shared.state.lock();
            if state.stopping {
                return Ok(());
            }
            state.stopping = true;
            match policy {
                ShutdownPolicy::Drain => Vec::new(),
                ShutdownPolicy::Abandon => state.queue.drain().collect(),
            }
        };
        self.shared.available.notify_all();

        if !abandoned.is_empty() {
            log::warn!(
                "[{}] abandoning {} queued jobs",
                self.shared.name,
                abandoned.len()
            );
            self.shared.counters.record_abandoned(abandoned.len() as u64);
        }
        for record in abandoned {
            let job_id = record.id();
            record.reject(PoolError::Abandoned { job_id });
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        let mut first_error = None;
        for worker in workers {
            if let Err(e) = worker.join() {
                log::error!("[{}] {}", self.shared.name, e);
                first_error.get_or_insert(e);
            }
        }

        log::debug!(
            "[{}] shut down: {} submitted, {} rejected",
            self.shared.name,
            self.shared.counters.submitted(),
            self.shared.counters.rejected()
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_shutdown(
            self.shared.counters.submitted(),
            self.shared.counters.abandoned(),
        );

        first_error.map_or(Ok(()), Err)
    }

    fn stop_workers(shared: &Shared<A, R>, workers: Vec<Worker>) {
        shared.state.lock().stopping = true;
        shared.available.notify_all();
        for worker in workers {
            if let Err(e) = worker.join() {
                log::error!("[{}] {}", shared.name, e);
            }
        }
    }
}

impl<A, R> Drop for WorkerPool<A, R> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!(
                "[{}] failed to shut down worker pool during drop: {}",
                self.shared.name,
                e
            );
        }
    }
}
