//! Bounded blocking command queue for cross-thread delivery of
//! remote-control commands.
//!
//! Fixed-capacity FIFO protected by a mutex and two condition variables.
//! `push` blocks while the queue is full, `pull` blocks while it is empty.
//! Either side can be shut down by injecting an error code, which unblocks
//! all current and future waiters on that side — graceful shutdown without
//! a separate cancellation mechanism.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use thiserror::Error;

/// Error code injected on a queue side to unblock its waiters.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("queue shut down (code {0})")]
pub struct ShutdownError(pub i32);

struct State<T> {
    buf: VecDeque<T>,
    capacity: usize,
    push_err: Option<i32>,
    pull_err: Option<i32>,
}

/// Bounded MPMC command queue.
pub struct CommandQueue<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> CommandQueue<T> {
    /// Create a queue holding at most `capacity` commands.
    ///
    /// # Panics
    /// Panics if `capacity` is zero: a zero-capacity queue can never make
    /// progress.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            state: Mutex::new(State {
                buf: VecDeque::with_capacity(capacity),
                capacity,
                push_err: None,
                pull_err: None,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Append a command, blocking while the queue is full.
    ///
    /// Returns the injected error code once the push side is shut down;
    /// the command is handed back to the caller in that case.
    pub fn push(&self, msg: T) -> Result<(), (T, ShutdownError)> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while state.buf.len() == state.capacity && state.push_err.is_none() {
            state = self.not_full.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        if let Some(code) = state.push_err {
            return Err((msg, ShutdownError(code)));
        }
        state.buf.push_back(msg);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest command, blocking while the queue is empty.
    ///
    /// An injected pull error takes precedence over queued commands, as on
    /// the push side.
    pub fn pull(&self) -> Result<T, ShutdownError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(code) = state.pull_err {
                return Err(ShutdownError(code));
            }
            if let Some(msg) = state.buf.pop_front() {
                self.not_full.notify_one();
                return Ok(msg);
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Fail all present and future `push` callers with `code`.
    pub fn set_push_err(&self, code: i32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        log::debug!("push side shut down with code {code}");
        state.push_err = Some(code);
        self.not_full.notify_all();
    }

    /// Fail all present and future `pull` callers with `code`.
    pub fn set_pull_err(&self, code: i32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        log::debug!("pull side shut down with code {code}");
        state.pull_err = Some(code);
        self.not_empty.notify_all();
    }

    /// Number of commands currently queued.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .buf
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every queued command and wake blocked pushers.
    pub fn flush(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = state.buf.len();
        state.buf.clear();
        self.not_full.notify_all();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let q = CommandQueue::new(4);
        q.push(1).unwrap();
        q.push(2).unwrap();
        q.push(3).unwrap();
        assert_eq!(q.len(), 3);
        assert_eq!(q.pull(), Ok(1));
        assert_eq!(q.pull(), Ok(2));
        assert_eq!(q.pull(), Ok(3));
        assert!(q.is_empty());
    }

    #[test]
    fn shutdown_fails_future_callers() {
        let q: CommandQueue<u32> = CommandQueue::new(2);
        q.set_pull_err(-1);
        assert_eq!(q.pull(), Err(ShutdownError(-1)));

        q.set_push_err(-2);
        let (msg, err) = q.push(7).unwrap_err();
        assert_eq!(msg, 7);
        assert_eq!(err, ShutdownError(-2));
    }

    #[test]
    fn flush_discards_queued_commands() {
        let q = CommandQueue::new(4);
        q.push("a").unwrap();
        q.push("b").unwrap();
        assert_eq!(q.flush(), 2);
        assert!(q.is_empty());
    }

    #[test]
    #[should_panic(expected = "capacity must be non-zero")]
    fn zero_capacity_rejected() {
        let _ = CommandQueue::<u32>::new(0);
    }
}
