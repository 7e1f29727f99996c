//! Worker thread implementation

use crate::core::{JobRecord, JobStatus, PoolError, Result};
use crate::pool::config::WorkerPoolConfig;
use crate::pool::stats::WorkerStatSnapshot;
use crate::pool::worker_pool::Shared;
use crossbeam_utils::CachePadded;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{span, Level};

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    jobs_completed: CachePadded<AtomicU64>,
    jobs_failed: AtomicU64,
    busy_time_us: AtomicU64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    fn record_completion(&self, elapsed: Duration) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    fn record_failure(&self, elapsed: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Jobs whose transform returned normally
    pub fn jobs_completed(&self) -> u64 {
        self.jobs_completed.load(Ordering::Relaxed)
    }

    /// Jobs whose transform panicked
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Average time spent in the transform per job, in microseconds
    pub fn average_busy_time_us(&self) -> f64 {
        let jobs = self.jobs_completed() + self.jobs_failed();
        if jobs == 0 {
            0.0
        } else {
            self.busy_time_us.load(Ordering::Relaxed) as f64 / jobs as f64
        }
    }

    /// Copy the counters into a plain snapshot
    pub fn snapshot(&self, worker_id: usize) -> WorkerStatSnapshot {
        WorkerStatSnapshot {
            worker_id,
            jobs_completed: self.jobs_completed(),
            jobs_failed: self.jobs_failed(),
            busy_time_us: self.busy_time_us.load(Ordering::Relaxed),
        }
    }
}

/// A worker thread serving a pool's ring buffer
#[derive(Debug)]
pub struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a worker running the job loop against `shared`.
    pub(crate) fn spawn<A, R>(
        id: usize,
        shared: Arc<Shared<A, R>>,
        config: &WorkerPoolConfig,
    ) -> Result<Self>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        let stats = Arc::new(WorkerStats::new());
        let stats_clone = Arc::clone(&stats);

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, id));
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let thread = builder
            .spawn(move || Self::run(id, &shared, &stats_clone))
            .map_err(|e| PoolError::thread_creation_with_source(id, e))?;

        Ok(Self {
            id,
            thread: Some(thread),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Join the worker thread
    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| PoolError::join_failed(self.id, "Worker panicked"))?;
        }
        Ok(())
    }

    /// Main worker loop
    ///
    /// Runs until the pool is stopping and the queue is empty.
    fn run<A, R>(id: usize, shared: &Shared<A, R>, stats: &WorkerStats) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        log::debug!("[{}] worker {} started", shared.name, id);

        while let Some(job) = Self::next_job(id, shared) {
            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_worker_busy(id);

            Self::execute_job(id, job, shared, stats);

            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_worker_idle(id);
        }

        log::debug!(
            "[{}] worker {} stopped: {} completed, {} failed",
            shared.name,
            id,
            stats.jobs_completed(),
            stats.jobs_failed()
        );
    }

    /// Block until a job is available. Returns `None` once the pool is
    /// stopping and nothing is left to run.
    fn next_job<A, R>(id: usize, shared: &Shared<A, R>) -> Option<JobRecord<A, R>> {
        let mut state = shared.state.lock();
        loop {
            // One notify can wake several workers; only one of them gets the job.
            while state.queue.is_empty() {
                if state.stopping {
                    return None;
                }
                shared.available.wait(&mut state);
            }

            match state.queue.pop_front() {
                Ok(job) => return Some(job),
                Err(e) => log::error!(
                    "[{}] worker {}: {}",
                    shared.name,
                    id,
                    PoolError::from(e)
                ),
            }
        }
    }

    /// Run the transform on one job with panic protection
    fn execute_job<A, R>(
        id: usize,
        job: JobRecord<A, R>,
        shared: &Shared<A, R>,
        stats: &WorkerStats,
    ) {
        shared.counters.record_dequeue(job.enqueued_at().elapsed());

        let (arg, sinks) = job.into_parts();
        sinks.mark(JobStatus::InProcessing);

        #[cfg(feature = "tracing")]
        let job_span = span!(Level::DEBUG, "job_execution", job_id = sinks.id);
        #[cfg(feature = "tracing")]
        let _job_guard = job_span.enter();

        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| (shared.transform)(arg)));
        let elapsed = start.elapsed();

        match outcome {
            Ok(value) => {
                stats.record_completion(elapsed);
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_completion(elapsed);
                sinks.finish(Ok(value));
            }
            Err(panic_info) => {
                let message = panic_message(panic_info.as_ref());
                log::error!(
                    "[{}] worker {}: job {} panicked: {}",
                    shared.name,
                    id,
                    sinks.id,
                    message
                );
                stats.record_failure(elapsed);
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_panic(elapsed);
                let error = PoolError::transform_failure(sinks.id, message);
                sinks.finish(Err(error));
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            // Bounded wait so a stuck transform cannot hang the dropping thread
            const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

            let start = Instant::now();
            while !thread.is_finished() {
                if start.elapsed() >= JOIN_TIMEOUT {
                    log::warn!(
                        "worker {} did not finish within {}s during drop; detaching",
                        self.id,
                        JOIN_TIMEOUT.as_secs()
                    );
                    return;
                }
                thread::sleep(Duration::from_millis(10));
            }
            if let Err(panic_info) = thread.join() {
                log::error!(
                    "worker {} panicked during shutdown: {}",
                    self.id,
                    panic_message(panic_info.as_ref())
                );
            }
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
