// src/signal.rs
// One-shot completion signal raised from the engine's frame-complete events

use log::trace;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Result of waiting on a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogWait {
    Done,
    TimedOut,
    NotArmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Pending,
    Fired,
}

/// A signal armed by one party and fired at most once by another.
///
/// `wait` consumes a fired signal, so a completion never leaks into the next
/// arming.
#[derive(Debug)]
pub struct Completion {
    state: Mutex<State>,
    cond: Condvar,
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

impl Completion {
    pub fn new() -> Self {
        Completion {
            state: Mutex::new(State::Idle),
            cond: Condvar::new(),
        }
    }

    /// Reset to pending, dropping any unconsumed completion
    pub fn arm(&self) {
        *self.state.lock() = State::Pending;
    }

    /// Fire if armed; returns whether anything was waiting for it
    pub fn fire(&self) -> bool {
        let mut state = self.state.lock();
        if *state != State::Pending {
            return false;
        }
        *state = State::Fired;
        self.cond.notify_all();
        trace!("🔔 Completion fired");
        true
    }

    /// Back to idle, but only if the completion has not fired yet
    pub fn cancel_pending(&self) {
        let mut state = self.state.lock();
        if *state == State::Pending {
            *state = State::Idle;
            self.cond.notify_all();
        }
    }

    /// Back to idle unconditionally, waking any waiter
    pub fn disarm(&self) {
        *self.state.lock() = State::Idle;
        self.cond.notify_all();
    }

    pub fn is_armed(&self) -> bool {
        *self.state.lock() != State::Idle
    }

    /// Block until fired, the timeout elapses, or the signal is disarmed.
    /// `None` waits without a deadline.
    pub fn wait(&self, timeout: Option<Duration>) -> DialogWait {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        loop {
            match *state {
                State::Idle => return DialogWait::NotArmed,
                State::Fired => {
                    *state = State::Idle;
                    return DialogWait::Done;
                }
                State::Pending => {}
            }
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out()
                        && *state == State::Pending
                    {
                        return DialogWait::TimedOut;
                    }
                }
                None => self.cond.wait(&mut state),
            }
        }
    }
}
