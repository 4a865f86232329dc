//! # Taskpark
//!
//! A fixed-size worker-thread pool with word-wait task join semantics and
//! detached ("ghost") task lifetimes.
//!
//! Taskpark accepts unit-of-work submissions, multiplexes them across a lazily
//! grown, capped set of worker threads, and exposes wait-for-completion,
//! timed-wait, and fire-and-forget modes. A task's entire lifecycle is encoded
//! in a single 32-bit state word; joiners park directly on that word through a
//! wait-for-value primitive, so task completion is observed without a dedicated
//! per-task channel or future.
//!
//! ## Core Problem Solved
//!
//! Thread pools built on channels give you "submit and receive": once a closure
//! is handed over, the submitter keeps no handle to the unit of work itself.
//! Taskpark keeps the task as a first-class object instead:
//!
//! - **Joinable**: block (or block with a deadline) until *this* task finished,
//!   then take its return value.
//! - **Re-submittable**: a joined task can be pushed again and re-run.
//! - **Detachable**: hand a queued or running task over to the pool and walk
//!   away; the pool destroys it when it completes.
//! - **Lazily sized**: worker threads are spawned one at a time, only when a
//!   submission finds no idle worker and the worker cap has not been reached.
//!
//! ## Quick Example
//!
//! ```
//! use taskpark::{Pool, PoolConfig, Task};
//!
//! let pool = Pool::new(PoolConfig::new().with_max_workers(4)).unwrap();
//!
//! let task = Task::new(|| 21 * 2);
//! pool.submit(&task).unwrap();
//!
//! assert_eq!(task.join().unwrap(), 42);
//! pool.shutdown().unwrap();
//! ```
//!
//! For complete examples, see:
//! - `tests/pool_test.rs` - Full integration tests
//! - `tests/task_lifecycle_test.rs` - State machine edge cases

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: the task state machine, the ring queue, and the pool.
pub mod core;
/// Configuration models for pool sizing and queue bounds.
pub mod config;
/// Shared utilities.
pub mod util;
/// Wait-for-value primitive over a 32-bit word.
pub mod waitword;

pub use crate::config::PoolConfig;
pub use crate::core::{Pool, PoolError, PoolStats, Task, TaskState};
pub use crate::waitword::WaitWord;
