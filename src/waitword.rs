//! Wait-for-value primitive.
//!
//! This module provides [`WaitWord`], a 32-bit word that callers can block on
//! until it attains a target value. It is the synchronization point between
//! task owners, joiners, and worker threads: every task stores its lifecycle
//! state in a `WaitWord`, and `join` parks directly on that word.
//!
//! # Semantics
//!
//! - [`WaitWord::wait`] is the low-level operation: it parks the caller only if
//!   the word still equals an expected value, and may return spuriously.
//! - [`WaitWord::wait_for_value`] is the high-level operation: it loops over
//!   `wait` until the word equals a target value or an optional deadline
//!   elapses. Spurious wakeups and stale expected values are never surfaced.
//! - [`WaitWord::wake_one`] / [`WaitWord::wake_all`] wake parked callers. A
//!   waker briefly acquires the internal waiter lock before notifying, so a
//!   caller can never park between a stale read of the word and the wake.
//!
//! The word itself is an atomic: writers publish with a compare-exchange
//! (acquire+release on success) and readers observe with acquire loads, so a
//! successful `wait_for_value` also makes every write that preceded the
//! transition into the target value visible to the caller.
//!
//! # Examples
//!
//! ```
//! use taskpark::WaitWord;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let word = Arc::new(WaitWord::new(0));
//! let word2 = Arc::clone(&word);
//!
//! thread::spawn(move || {
//!     word2.compare_exchange(0, 7).unwrap();
//!     word2.wake_all();
//! });
//!
//! word.wait_for_value(7, None).unwrap();
//! assert_eq!(word.load(), 7);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Error returned by [`WaitWord::wait_for_value`] when the deadline elapses
/// before the word reaches the target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out waiting for target value")]
pub struct WaitTimeout;

/// Outcome of a single low-level [`WaitWord::wait`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The word no longer held the expected value; the caller did not park.
    ValueChanged,
    /// The caller parked and was woken. The wake may be spurious; the caller
    /// must re-check the word.
    Woken,
    /// The caller parked and the timeout elapsed.
    TimedOut,
}

/// A 32-bit word callers can block on until it attains a target value.
///
/// The word pairs an [`AtomicU32`] with a waiter set. Waking requires a brief
/// pass through the internal lock, which closes the race between a waiter's
/// read of the word and its park.
#[derive(Debug, Default)]
pub struct WaitWord {
    value: AtomicU32,
    waiters: Mutex<()>,
    wake: Condvar,
}

impl WaitWord {
    /// Creates a new word holding `initial`.
    #[inline]
    #[must_use]
    pub const fn new(initial: u32) -> Self {
        Self {
            value: AtomicU32::new(initial),
            waiters: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Reads the current value with acquire ordering.
    #[inline]
    #[must_use]
    pub fn load(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// Atomically replaces `current` with `new`.
    ///
    /// Success uses acquire+release ordering; failure is a relaxed read.
    ///
    /// # Errors
    ///
    /// Returns the actual value if it differed from `current`.
    #[inline]
    pub fn compare_exchange(&self, current: u32, new: u32) -> Result<u32, u32> {
        self.value
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Relaxed)
    }

    /// Wakes one caller parked on this word.
    pub fn wake_one(&self) {
        // Serialize against waiters between their read and their park.
        let _guard = self.waiters.lock();
        self.wake.notify_one();
    }

    /// Wakes every caller parked on this word.
    pub fn wake_all(&self) {
        let _guard = self.waiters.lock();
        self.wake.notify_all();
    }

    /// Parks the caller if the word still equals `expected`.
    ///
    /// Returns [`WaitOutcome::ValueChanged`] without parking if the word
    /// already differs from `expected`. A [`WaitOutcome::Woken`] return may be
    /// spurious; callers are expected to loop (see
    /// [`wait_for_value`](Self::wait_for_value)).
    pub fn wait(&self, expected: u32, timeout: Option<Duration>) -> WaitOutcome {
        let mut guard = self.waiters.lock();
        if self.value.load(Ordering::Acquire) != expected {
            return WaitOutcome::ValueChanged;
        }
        match timeout {
            Some(limit) => {
                if self.wake.wait_for(&mut guard, limit).timed_out() {
                    WaitOutcome::TimedOut
                } else {
                    WaitOutcome::Woken
                }
            }
            None => {
                self.wake.wait(&mut guard);
                WaitOutcome::Woken
            }
        }
    }

    /// Blocks until the word equals `target` or the optional deadline elapses.
    ///
    /// No spurious returns are visible to the caller: wakeups that leave the
    /// word short of `target` loop back into a fresh wait. The deadline is
    /// interpreted against a monotonic clock and the remaining timeout is
    /// recomputed on every iteration. `None` (or a timeout of
    /// [`Duration::MAX`]) means wait forever.
    ///
    /// On success the caller has observed, with acquire ordering, a state in
    /// which the word equaled `target` at some point after this call began.
    ///
    /// # Errors
    ///
    /// Returns [`WaitTimeout`] if the deadline elapses first.
    pub fn wait_for_value(&self, target: u32, timeout: Option<Duration>) -> Result<(), WaitTimeout> {
        let timeout = timeout.filter(|limit| *limit != Duration::MAX);
        let start = Instant::now();
        loop {
            let current = self.value.load(Ordering::Acquire);
            if current == target {
                return Ok(());
            }
            let remaining = match timeout {
                Some(total) => match total.checked_sub(start.elapsed()) {
                    Some(rem) if !rem.is_zero() => Some(rem),
                    _ => return Err(WaitTimeout),
                },
                None => None,
            };
            // Spurious wakeups and stale expected values loop back around; the
            // value re-check above decides what the caller actually sees.
            let _ = self.wait(current, remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_load_initial() {
        let word = WaitWord::new(5);
        assert_eq!(word.load(), 5);
    }

    #[test]
    fn test_compare_exchange() {
        let word = WaitWord::new(0);
        assert_eq!(word.compare_exchange(0, 1), Ok(0));
        assert_eq!(word.load(), 1);
        assert_eq!(word.compare_exchange(0, 2), Err(1));
        assert_eq!(word.load(), 1);
    }

    #[test]
    fn test_wait_value_already_changed() {
        let word = WaitWord::new(3);
        assert_eq!(word.wait(0, None), WaitOutcome::ValueChanged);
    }

    #[test]
    fn test_wait_times_out() {
        let word = WaitWord::new(0);
        let outcome = word.wait(0, Some(Duration::from_millis(10)));
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[test]
    fn test_wait_for_value_immediate() {
        let word = WaitWord::new(9);
        assert_eq!(word.wait_for_value(9, None), Ok(()));
    }

    #[test]
    fn test_wait_for_value_timeout() {
        let word = WaitWord::new(0);
        let result = word.wait_for_value(1, Some(Duration::from_millis(20)));
        assert_eq!(result, Err(WaitTimeout));
    }

    #[test]
    fn test_wait_for_value_cross_thread() {
        let word = Arc::new(WaitWord::new(0));
        let word2 = Arc::clone(&word);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            word2.compare_exchange(0, 42).unwrap();
            word2.wake_all();
        });

        word.wait_for_value(42, None).unwrap();
        assert_eq!(word.load(), 42);
        handle.join().unwrap();
    }

    #[test]
    fn test_wake_without_change_is_not_surfaced() {
        // A wake that leaves the word untouched must not end wait_for_value.
        let word = Arc::new(WaitWord::new(0));
        let word2 = Arc::clone(&word);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            word2.wake_all();
            thread::sleep(Duration::from_millis(5));
            word2.compare_exchange(0, 1).unwrap();
            word2.wake_all();
        });

        word.wait_for_value(1, Some(Duration::from_secs(5))).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_wake_one_is_live() {
        let word = Arc::new(WaitWord::new(0));
        let word2 = Arc::clone(&word);

        let waiter = thread::spawn(move || word2.wait(0, Some(Duration::from_secs(5))));
        thread::sleep(Duration::from_millis(10));
        word.compare_exchange(0, 1).unwrap();
        word.wake_one();

        // Either the wake landed or the waiter saw the new value on entry;
        // it must not ride out the full timeout.
        assert_ne!(waiter.join().unwrap(), WaitOutcome::TimedOut);
    }

    #[test]
    fn test_wait_for_value_multiple_waiters() {
        let word = Arc::new(WaitWord::new(0));
        let mut handles = vec![];

        for _ in 0..4 {
            let word = Arc::clone(&word);
            handles.push(thread::spawn(move || {
                word.wait_for_value(7, None).unwrap();
                word.load()
            }));
        }

        thread::sleep(Duration::from_millis(10));
        word.compare_exchange(0, 7).unwrap();
        word.wake_all();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
    }

    #[test]
    fn test_duration_max_means_no_deadline() {
        let word = Arc::new(WaitWord::new(0));
        let word2 = Arc::clone(&word);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            word2.compare_exchange(0, 3).unwrap();
            word2.wake_all();
        });

        word.wait_for_value(3, Some(Duration::MAX)).unwrap();
        handle.join().unwrap();
    }
}
