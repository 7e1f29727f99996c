//! Worker pool configuration

use crate::core::{PoolError, Result};
use serde::{Deserialize, Serialize};

/// Default queue capacity, matching the connection backlog the pool is
/// usually sized for.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16_384;

/// What happens to queued jobs when the pool shuts down.
///
/// Jobs already running always finish; workers are never interrupted
/// mid-transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Workers keep running until the queue is empty
    #[default]
    Drain,
    /// Queued jobs are discarded: their status becomes `Failed` and their
    /// result handles yield [`PoolError::Abandoned`]
    Abandon,
}

/// Configuration for a [`WorkerPool`](crate::pool::WorkerPool)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads
    pub pool_size: usize,
    /// Maximum number of queued jobs (must be greater than 1)
    pub queue_capacity: usize,
    /// Thread name prefix; workers are named `{prefix}-{id}`
    pub thread_name_prefix: String,
    /// Treatment of queued jobs at shutdown
    pub shutdown_policy: ShutdownPolicy,
    /// Worker stack size in bytes (None = platform default)
    pub stack_size: Option<usize>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            thread_name_prefix: "worker".to_string(),
            shutdown_policy: ShutdownPolicy::default(),
            stack_size: None,
        }
    }
}

impl WorkerPoolConfig {
    /// Create a new configuration with the given pool size and queue capacity
    #[must_use]
    pub fn new(pool_size: usize, queue_capacity: usize) -> Self {
        Self {
            pool_size,
            queue_capacity,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// ```rust
    /// use ring_pool::pool::{ShutdownPolicy, WorkerPoolConfig};
    ///
    /// let config = WorkerPoolConfig::from_json(
    ///     r#"{ "pool_size": 4, "queue_capacity": 64, "shutdown_policy": "abandon" }"#,
    /// ).unwrap();
    /// assert_eq!(config.pool_size, 4);
    /// assert_eq!(config.shutdown_policy, ShutdownPolicy::Abandon);
    /// assert_eq!(config.thread_name_prefix, "worker");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PoolError::invalid_config("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the number of worker threads
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the queue capacity
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the shutdown policy
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    /// Set the worker stack size in bytes
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(PoolError::invalid_config(
                "pool_size",
                "Number of workers must be greater than 0",
            ));
        }
        if self.queue_capacity < 2 {
            return Err(PoolError::invalid_config(
                "queue_capacity",
                format!(
                    "Queue capacity must be greater than 1, got {}",
                    self.queue_capacity
                ),
            ));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(PoolError::invalid_config(
                "thread_name_prefix",
                "Thread names cannot contain NUL bytes",
            ));
        }
        Ok(())
    }
}
