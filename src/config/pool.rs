//! Pool configuration.

use serde::{Deserialize, Serialize};

/// Hard cap on the number of worker threads a pool may be configured with.
pub const MAX_WORKERS: usize = 20;

/// Hard cap on the number of tasks enqueued at any instant.
pub const MAX_TASKS: usize = 100_000;

/// Configuration for a [`Pool`](crate::core::Pool).
///
/// All fields have sensible defaults; use the `with_*` builders to override.
///
/// # Examples
///
/// ```
/// use taskpark::PoolConfig;
///
/// let config = PoolConfig::new()
///     .with_max_workers(4)
///     .with_max_queued(1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on lazily spawned worker threads.
    pub max_workers: usize,
    /// Upper bound on tasks enqueued at any instant.
    pub max_queued: usize,
    /// Queue slots allocated up front (clamped to `max_queued`); the queue
    /// doubles on demand beyond it.
    pub initial_queue_capacity: usize,
    /// Stack size for worker threads, in bytes.
    pub thread_stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().min(MAX_WORKERS),
            max_queued: MAX_TASKS,
            initial_queue_capacity: 64,
            thread_stack_size: 2 * 1024 * 1024,
        }
    }
}

impl PoolConfig {
    /// Default configuration: one worker per CPU (capped), full queue bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker-thread cap.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Sets the queued-task cap.
    #[must_use]
    pub const fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    /// Sets the up-front queue allocation.
    #[must_use]
    pub const fn with_initial_queue_capacity(mut self, capacity: usize) -> Self {
        self.initial_queue_capacity = capacity;
        self
    }

    /// Sets the worker stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Validates configuration values against the crate caps.
    ///
    /// # Errors
    ///
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be at least 1".into());
        }
        if self.max_workers > MAX_WORKERS {
            return Err(format!("max_workers must not exceed {MAX_WORKERS}"));
        }
        if self.max_queued == 0 {
            return Err("max_queued must be at least 1".into());
        }
        if self.max_queued > MAX_TASKS {
            return Err(format!("max_queued must not exceed {MAX_TASKS}"));
        }
        if self.thread_stack_size < 16 * 1024 {
            return Err("thread_stack_size must be at least 16 KiB".into());
        }
        Ok(())
    }

    /// Parses a configuration from a JSON string and validates it.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation failure description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
