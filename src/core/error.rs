//! Error types for pool and task operations.

use thiserror::Error;

/// Errors produced by pool and task operations.
///
/// All failures are reported as values; the library never panics on a
/// recoverable error. Allocation failure and worker spawn failure are the
/// deliberate exceptions and abort the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Configuration was rejected (e.g. worker count out of range).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Shutdown was attempted while tasks are queued or executing.
    #[error("pool still has queued or running tasks")]
    HasTasks,
    /// A submission would exceed the queued-task cap.
    #[error("task queue is at capacity")]
    TooManyTasks,
    /// The submitted task is neither freshly created nor joined.
    #[error("task cannot be pushed in its current state")]
    InvalidRepush,
    /// Join or detach was attempted on a task that is not with the pool.
    #[error("task has not been pushed")]
    TaskNotPushed,
    /// Delete was attempted while the pool still owns the task.
    #[error("task is still owned by the pool")]
    TaskInPool,
    /// A timed join elapsed before the task completed.
    #[error("operation timed out")]
    Timeout,
    /// The pool has been shut down.
    #[error("pool has been shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PoolError::InvalidArgument("max_workers must be at least 1".into()).to_string(),
            "invalid argument: max_workers must be at least 1"
        );
        assert_eq!(
            PoolError::HasTasks.to_string(),
            "pool still has queued or running tasks"
        );
        assert_eq!(PoolError::TooManyTasks.to_string(), "task queue is at capacity");
        assert_eq!(PoolError::Timeout.to_string(), "operation timed out");
    }
}
