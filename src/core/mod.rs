//! Core scheduling: the task state machine, the ring queue, and the pool.

pub mod error;
pub mod pool;
pub mod queue;
pub mod task;

pub use error::PoolError;
pub use pool::{Pool, PoolStats};
pub use queue::RingQueue;
pub use task::{Task, TaskState};
