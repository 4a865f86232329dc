//! Task handles and the per-task lifecycle state machine.
//!
//! A task wraps a user-supplied callable together with its eventual return
//! value and a 32-bit state word. The word is the *only* synchronization point
//! between the external owner, the pool, and the worker running the body:
//! every lifecycle transition is a compare-exchange on the word, followed
//! unconditionally by a wake of everyone parked on it.
//!
//! # Lifecycle
//!
//! ```text
//! Created       -> Pushed                          (submit, first time)
//! Joined        -> Pushed                          (submit, re-submission)
//! Pushed        -> Running                         (worker claim)
//! Pushed        -> PushedGhost                     (detach before claim)
//! PushedGhost   -> RunningGhost                    (worker claim of detached)
//! Running       -> RunningGhost                    (detach after claim)
//! Running       -> Completed                       (worker finishes)
//! RunningGhost  -> Joined, record destroyed        (worker finishes detached)
//! Completed     -> Joined                          (join, or detach when done)
//! ```
//!
//! The graph is forward-only apart from the single `Joined -> Pushed`
//! re-submission edge, so multi-branch operations always attempt the source
//! state closest to `Created` first: a task can move from `Pushed` to
//! `Running` under our feet, never back.
//!
//! The *ghost* states encode ownership transfer: a detached task belongs to
//! the pool, and the worker's `RunningGhost -> Joined` transition is its
//! destruction point. In this crate destruction falls out of reference
//! counting: the detaching caller gives up the external handle, and the
//! worker's clone is the last one standing when it settles the task.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::error::PoolError;
use crate::waitword::WaitWord;

/// Lifecycle state of a task, stored in its 32-bit wait word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TaskState {
    /// Built, never pushed; owned by the caller.
    Created = 0,
    /// Queued, waiting for a worker claim.
    Pushed = 1,
    /// Queued and detached; owned by the pool.
    PushedGhost = 2,
    /// Claimed by a worker and executing.
    Running = 3,
    /// Executing after a detach; owned by the pool.
    RunningGhost = 4,
    /// Finished; the return value is waiting for a joiner.
    Completed = 5,
    /// Joined and back with the caller (or destroyed, in the ghost case).
    Joined = 6,
}

impl TaskState {
    /// The word only ever holds values written through this enum, so the
    /// catch-all arm is exact.
    pub(crate) const fn from_word(raw: u32) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Pushed,
            2 => Self::PushedGhost,
            3 => Self::Running,
            4 => Self::RunningGhost,
            5 => Self::Completed,
            _ => Self::Joined,
        }
    }
}

/// A task body. `FnMut` rather than `FnOnce` so the `Joined -> Pushed`
/// re-submission edge can run it again.
type TaskBody<R> = Box<dyn FnMut() -> R + Send + 'static>;

/// Shared task record. The external [`Task`] handle, the pool queue, and the
/// executing worker each hold an `Arc` of this.
pub(crate) struct TaskCore<R> {
    state: WaitWord,
    body: Mutex<TaskBody<R>>,
    result: Mutex<Option<R>>,
}

impl<R> TaskCore<R> {
    /// Attempts `from -> to` on the state word. Every successful transition
    /// wakes everyone parked on the word.
    fn try_transition(&self, from: TaskState, to: TaskState) -> bool {
        if self.state.compare_exchange(from as u32, to as u32).is_ok() {
            self.state.wake_all();
            return true;
        }
        false
    }
}

/// Pool-side view of a queued task: claim it, run it, settle it.
pub(crate) trait RunnableTask: Send + Sync {
    /// `Pushed -> Running`, falling back to `PushedGhost -> RunningGhost` when
    /// the owner detached between enqueue and claim.
    fn claim(&self);

    /// Runs the body and stores the return value. The value lands strictly
    /// before the transition into `Completed`.
    fn execute(&self);

    /// `Running -> Completed`, falling back to `RunningGhost -> Joined` when
    /// the owner detached mid-run. Returns `true` in the ghost case, where
    /// dropping the caller's handle clone destroys the task.
    fn settle(&self) -> bool;
}

impl<R: Send + 'static> RunnableTask for TaskCore<R> {
    fn claim(&self) {
        if !self.try_transition(TaskState::Pushed, TaskState::Running) {
            let ghost = self.try_transition(TaskState::PushedGhost, TaskState::RunningGhost);
            debug_assert!(ghost, "claimed task was neither pushed nor detached");
        }
    }

    fn execute(&self) {
        let mut body = self.body.lock();
        let output = (*body)();
        drop(body);
        *self.result.lock() = Some(output);
    }

    fn settle(&self) -> bool {
        if self.try_transition(TaskState::Running, TaskState::Completed) {
            return false;
        }
        let ghost = self.try_transition(TaskState::RunningGhost, TaskState::Joined);
        debug_assert!(ghost, "settled task was neither running nor detached");
        ghost
    }
}

/// A unit of work: a callable, its eventual return value, and a state word.
///
/// Handles are single-owner (not `Clone`), so at most one thread ever joins a
/// given task. After a successful [`join`](Self::join) the task can be
/// submitted again; the body is re-run and a fresh return value stored.
///
/// # Examples
///
/// ```
/// use taskpark::{Task, TaskState};
///
/// let task = Task::new(|| "hello".len());
/// assert_eq!(task.state(), TaskState::Created);
/// task.delete().unwrap();
/// ```
pub struct Task<R> {
    core: Arc<TaskCore<R>>,
}

impl<R> Task<R> {
    /// Current lifecycle state (acquire load of the word).
    #[must_use]
    pub fn state(&self) -> TaskState {
        TaskState::from_word(self.core.state.load())
    }

    /// True iff the task finished and its return value awaits a joiner.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Completed
    }

    /// True iff a worker is currently executing the task.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }
}

impl<R: Send + 'static> Task<R> {
    /// Wraps `body` in a fresh task in the `Created` state.
    #[must_use]
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut() -> R + Send + 'static,
    {
        Self {
            core: Arc::new(TaskCore {
                state: WaitWord::new(TaskState::Created as u32),
                body: Mutex::new(Box::new(body)),
                result: Mutex::new(None),
            }),
        }
    }

    /// Blocks until the task completes, then takes its return value.
    ///
    /// Parks on the state word until it reads `Completed`, then transitions
    /// the task to `Joined` and consumes the stored value. After a successful
    /// join the task may be submitted again.
    ///
    /// # Errors
    ///
    /// [`PoolError::TaskNotPushed`] if the task is not currently with the
    /// pool (never submitted, or already joined).
    pub fn join(&self) -> Result<R, PoolError> {
        self.join_inner(None)
    }

    /// Like [`join`](Self::join), but gives up after `timeout`.
    ///
    /// A timeout of [`Duration::MAX`] is treated as no deadline.
    ///
    /// # Errors
    ///
    /// [`PoolError::Timeout`] if the deadline elapses first;
    /// [`PoolError::TaskNotPushed`] as for `join`.
    pub fn join_timeout(&self, timeout: Duration) -> Result<R, PoolError> {
        self.join_inner(Some(timeout))
    }

    fn join_inner(&self, timeout: Option<Duration>) -> Result<R, PoolError> {
        match self.state() {
            TaskState::Created | TaskState::Joined => return Err(PoolError::TaskNotPushed),
            _ => {}
        }
        self.core
            .state
            .wait_for_value(TaskState::Completed as u32, timeout)
            .map_err(|_| PoolError::Timeout)?;
        // This handle is the only actor that can move the task out of
        // Completed, so the exchange cannot fail.
        let joined = self
            .core
            .try_transition(TaskState::Completed, TaskState::Joined);
        debug_assert!(joined, "completed task moved without a joiner");
        let value = self.core.result.lock().take();
        Ok(value.expect("completed task has no stored return value"))
    }

    /// Transfers ownership of the task to the pool and consumes the handle.
    ///
    /// A queued task becomes `PushedGhost`, a running one `RunningGhost`; in
    /// both cases the worker destroys the task when it finishes. A task that
    /// already completed is joined and destroyed on the spot. The attempts run
    /// in lifecycle order, since a concurrent worker can only ever move the
    /// state forward.
    ///
    /// # Errors
    ///
    /// [`PoolError::TaskNotPushed`] if the task is not with the pool; the
    /// handle is returned alongside the error.
    pub fn detach(self) -> Result<(), (Self, PoolError)> {
        if self
            .core
            .try_transition(TaskState::Pushed, TaskState::PushedGhost)
        {
            return Ok(());
        }
        if self
            .core
            .try_transition(TaskState::Running, TaskState::RunningGhost)
        {
            return Ok(());
        }
        if self
            .core
            .try_transition(TaskState::Completed, TaskState::Joined)
        {
            // Dropping the handle destroys the finished task immediately.
            return Ok(());
        }
        Err((self, PoolError::TaskNotPushed))
    }

    /// Destroys a task that is not with the pool.
    ///
    /// # Errors
    ///
    /// [`PoolError::TaskInPool`] if the task is queued, running, or completed
    /// but unjoined; the handle is returned so the caller can join first.
    pub fn delete(self) -> Result<(), (Self, PoolError)> {
        match self.state() {
            TaskState::Created | TaskState::Joined => Ok(()),
            _ => Err((self, PoolError::TaskInPool)),
        }
    }

    /// `Created -> Pushed`, else `Joined -> Pushed`. Called by the pool with
    /// its queue lock held.
    pub(crate) fn try_mark_pushed(&self) -> Result<(), PoolError> {
        if self
            .core
            .try_transition(TaskState::Created, TaskState::Pushed)
        {
            return Ok(());
        }
        if self
            .core
            .try_transition(TaskState::Joined, TaskState::Pushed)
        {
            return Ok(());
        }
        Err(PoolError::InvalidRepush)
    }

    /// A queue-side clone of the task record.
    pub(crate) fn runnable(&self) -> Arc<dyn RunnableTask> {
        Arc::clone(&self.core) as Arc<dyn RunnableTask>
    }
}

impl<R> fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
