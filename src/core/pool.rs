//! The pool scheduler: worker threads, the shared queue, and submission.
//!
//! The pool owns a single mutex around all shared scheduling state (the ring
//! queue, the worker counters, and the thread handles) plus one condition
//! variable that parks idle workers. Task state itself is never touched under
//! that lock beyond the push-time transition; joiners synchronize with workers
//! exclusively through the per-task wait word.
//!
//! # Design
//!
//! - **Lazy spawning**: a submission that finds no idle worker spawns one new
//!   thread, up to the configured cap. An idle pool never grows.
//! - **Settle under the lock**: a worker reports its previous task finished
//!   only after re-acquiring the pool lock. The lock fence closes the race
//!   where a joiner observes completion, frees the task, and a concurrent
//!   shutdown then reads stale worker counts.
//! - **Shutdown from the park bench**: shutdown succeeds only when the queue
//!   is empty and every spawned worker is parked; the condvar wait is the only
//!   exit point a worker honors.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::queue::RingQueue;
use crate::core::task::{RunnableTask, Task};

/// Snapshot of pool utilization. Best-effort: instantaneous values unless the
/// caller externally serializes submissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Configured worker-thread cap.
    pub max_workers: usize,
    /// Worker threads spawned so far.
    pub spawned_workers: usize,
    /// Workers currently parked waiting for work.
    pub idle_workers: usize,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Tasks accepted over the pool's lifetime.
    pub submitted_tasks: u64,
    /// Tasks settled over the pool's lifetime (detached tasks included).
    pub completed_tasks: u64,
}

/// Everything the pool lock protects.
struct PoolState {
    queue: RingQueue<Arc<dyn RunnableTask>>,
    spawned_workers: usize,
    idle_workers: usize,
    shutting_down: bool,
    workers: Vec<JoinHandle<()>>,
    submitted_tasks: u64,
    completed_tasks: u64,
}

struct Shared {
    state: Mutex<PoolState>,
    work_available: Condvar,
}

/// A fixed-cap worker-thread pool over joinable [`Task`] handles.
///
/// Workers are spawned lazily, one per submission that finds no idle worker,
/// never exceeding the configured cap. Tasks are dispatched FIFO but may
/// finish in any order.
///
/// # Examples
///
/// ```
/// use taskpark::{Pool, PoolConfig, Task};
///
/// let pool = Pool::new(PoolConfig::new().with_max_workers(2)).unwrap();
///
/// let task = Task::new(|| 2 + 2);
/// pool.submit(&task).unwrap();
/// assert_eq!(task.join().unwrap(), 4);
///
/// pool.shutdown().unwrap();
/// ```
pub struct Pool {
    config: PoolConfig,
    shared: Arc<Shared>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pool {
    /// Creates an empty pool from a validated configuration.
    ///
    /// No threads are spawned yet; the first submission that finds no idle
    /// worker spawns the first one.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidArgument`] when the configuration fails
    /// [`PoolConfig::validate`].
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidArgument)?;
        info!(
            max_workers = config.max_workers,
            max_queued = config.max_queued,
            "pool initialized"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: RingQueue::with_capacity(
                        config.initial_queue_capacity.min(config.max_queued),
                    ),
                    spawned_workers: 0,
                    idle_workers: 0,
                    shutting_down: false,
                    workers: Vec::with_capacity(config.max_workers),
                    submitted_tasks: 0,
                    completed_tasks: 0,
                }),
                work_available: Condvar::new(),
            }),
            config,
        })
    }

    /// Convenience constructor: default configuration with `max_workers`.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidArgument`] when `max_workers` is out of range.
    pub fn with_workers(max_workers: usize) -> Result<Self, PoolError> {
        Self::new(PoolConfig::new().with_max_workers(max_workers))
    }

    /// Submits a task for execution.
    ///
    /// Transitions the task `Created -> Pushed` (or `Joined -> Pushed` for a
    /// re-submission), enqueues it, and wakes one worker. A single wake is
    /// enough: one submission adds exactly one runnable task.
    ///
    /// May be called from inside a running task body, as long as the
    /// submitted task is a different one.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Shutdown`] after a successful shutdown.
    /// - [`PoolError::TooManyTasks`] when the queued-task cap is reached.
    /// - [`PoolError::InvalidRepush`] when the task is neither freshly
    ///   created nor joined.
    pub fn submit<R: Send + 'static>(&self, task: &Task<R>) -> Result<(), PoolError> {
        let mut state = self.shared.state.lock();
        if state.shutting_down {
            return Err(PoolError::Shutdown);
        }
        if state.queue.len() >= self.config.max_queued {
            warn!(max_queued = self.config.max_queued, "task queue is at capacity");
            return Err(PoolError::TooManyTasks);
        }
        task.try_mark_pushed()?;
        state.queue.push(task.runnable());
        state.submitted_tasks += 1;

        if state.idle_workers == 0 && state.spawned_workers < self.config.max_workers {
            let worker_id = state.spawned_workers;
            let handle = spawn_worker(
                worker_id,
                Arc::clone(&self.shared),
                self.config.thread_stack_size,
            );
            state.workers.push(handle);
            state.spawned_workers += 1;
            debug!(worker_id, "spawned worker for submission");
        }

        self.shared.work_available.notify_one();
        Ok(())
    }

    /// Shuts the pool down, joining every worker thread.
    ///
    /// Succeeds only when nothing is queued and every spawned worker is
    /// parked; each worker's sole exit point is its condvar wait, so the
    /// queue-empty plus all-idle snapshot guarantees they are all there.
    /// Idempotent once it has succeeded.
    ///
    /// # Errors
    ///
    /// [`PoolError::HasTasks`] when tasks are still queued or executing; the
    /// pool is left untouched and fully usable.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        let handles = {
            let mut state = self.shared.state.lock();
            if state.shutting_down {
                return Ok(());
            }
            if !state.queue.is_empty() || state.spawned_workers != state.idle_workers {
                return Err(PoolError::HasTasks);
            }
            state.shutting_down = true;
            self.shared.work_available.notify_all();
            std::mem::take(&mut state.workers)
        };

        let worker_count = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        info!(worker_count, "pool shut down");
        Ok(())
    }

    /// Number of worker threads spawned so far (best-effort snapshot).
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.state.lock().spawned_workers
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            max_workers: self.config.max_workers,
            spawned_workers: state.spawned_workers,
            idle_workers: state.idle_workers,
            queued_tasks: state.queue.len(),
            submitted_tasks: state.submitted_tasks,
            completed_tasks: state.completed_tasks,
        }
    }
}

impl Drop for Pool {
    /// Best-effort teardown: flag the shutdown and wake everyone, but do not
    /// join. Workers drain whatever is queued and then exit on their own; an
    /// explicit [`shutdown`](Self::shutdown) is the graceful path.
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if !state.shutting_down {
            state.shutting_down = true;
            self.shared.work_available.notify_all();
            debug!("pool dropped without explicit shutdown; workers drain and detach");
        }
    }
}

/// Spawns one worker thread. Spawn failure aborts: the pool decided
/// deliberately that this worker is needed.
fn spawn_worker(worker_id: usize, shared: Arc<Shared>, stack_size: usize) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("tp-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id, "worker thread started");
            let mut finished: Option<Arc<dyn RunnableTask>> = None;
            loop {
                let mut state = shared.state.lock();

                // Settle the previous task only after re-taking the lock. A
                // joiner may free the task the instant it observes Completed,
                // and a concurrent shutdown must not see this worker as idle
                // before the settle has been published.
                if let Some(task) = finished.take() {
                    if task.settle() {
                        debug!(worker_id, "detached task destroyed");
                    }
                    state.completed_tasks += 1;
                }

                state.idle_workers += 1;
                while state.queue.is_empty() && !state.shutting_down {
                    shared.work_available.wait(&mut state);
                }
                state.idle_workers -= 1;

                if state.queue.is_empty() {
                    state.spawned_workers -= 1;
                    debug!(worker_id, "worker thread exiting");
                    return;
                }

                let task = state.queue.pop();
                drop(state);
                if let Some(task) = task {
                    task.claim();
                    task.execute();
                    finished = Some(task);
                }
            }
        })
        .expect("failed to spawn worker thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_invalid_config_rejected() {
        let err = Pool::with_workers(0).unwrap_err();
        assert!(matches!(err, PoolError::InvalidArgument(_)));
    }

    #[test]
    fn test_submit_and_join() {
        let pool = Pool::with_workers(2).unwrap();
        let task = Task::new(|| 10 * 10);
        pool.submit(&task).unwrap();
        assert_eq!(task.join().unwrap(), 100);
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_no_workers_before_first_submission() {
        let pool = Pool::with_workers(4).unwrap();
        assert_eq!(pool.worker_count(), 0);
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_empty_pool_idempotent() {
        let pool = Pool::with_workers(2).unwrap();
        pool.shutdown().unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pool = Pool::with_workers(2).unwrap();
        pool.shutdown().unwrap();
        let task = Task::new(|| 1);
        assert_eq!(pool.submit(&task).unwrap_err(), PoolError::Shutdown);
        assert_eq!(task.state(), crate::core::task::TaskState::Created);
    }

    #[test]
    fn test_queue_cap_rejects_submission() {
        // No idle worker consumes anything while the first task blocks.
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
        let pool = Pool::new(
            PoolConfig::new()
                .with_max_workers(1)
                .with_max_queued(2)
                .with_initial_queue_capacity(2),
        )
        .unwrap();

        let blocker = Task::new(move || gate_rx.recv().ok());
        pool.submit(&blocker).unwrap();
        // Give the single worker time to claim the blocker.
        while !blocker.is_running() {
            std::thread::sleep(Duration::from_millis(1));
        }

        let queued: Vec<_> = (0..2)
            .map(|_| {
                let task: Task<Option<()>> = Task::new(|| None);
                pool.submit(&task).unwrap();
                task
            })
            .collect();

        let rejected: Task<Option<()>> = Task::new(|| None);
        assert_eq!(pool.submit(&rejected).unwrap_err(), PoolError::TooManyTasks);

        gate_tx.send(()).unwrap();
        blocker.join().unwrap();
        for task in &queued {
            task.join().unwrap();
        }
        // Capacity freed; the rejected submission now goes through.
        pool.submit(&rejected).unwrap();
        rejected.join().unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_stats_track_lifecycle() {
        let pool = Pool::with_workers(2).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.submitted_tasks, 0);
        assert_eq!(stats.max_workers, 2);

        let task = Task::new(|| ());
        pool.submit(&task).unwrap();
        task.join().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.submitted_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.queued_tasks, 0);
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_reentrant_submission() {
        let pool = Arc::new(Pool::with_workers(2).unwrap());
        let pool2 = Arc::clone(&pool);
        let ran_inner = Arc::new(AtomicUsize::new(0));
        let ran_inner2 = Arc::clone(&ran_inner);

        let outer = Task::new(move || {
            let ran = Arc::clone(&ran_inner2);
            let inner = Task::new(move || ran.fetch_add(1, Ordering::SeqCst));
            pool2.submit(&inner).unwrap();
            inner.join().unwrap()
        });
        pool.submit(&outer).unwrap();
        assert_eq!(outer.join().unwrap(), 0);
        assert_eq!(ran_inner.load(Ordering::SeqCst), 1);
        pool.shutdown().unwrap();
    }
}
