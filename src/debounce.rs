//! Leading-edge debouncer used to coalesce flush requests.
//!
//! The first request while idle fires immediately and opens a cooldown
//! window. Requests inside the window are coalesced and push the deadline
//! out again. Once the deadline passes the gate is idle again; expiry is
//! checked lazily against the monotonic clock, so no timer thread is needed.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Window used when a store is not configured otherwise.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    // requests are coalesced until `deadline`
    Cooling { deadline: Instant },
}

/// Outcome of [`Debouncer::trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Do the work now.
    Fire,
    /// Swallowed by an earlier request in the same burst.
    Coalesced,
}

/// Per-store debounce gate.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    state: Mutex<State>,
}

impl Debouncer {
    /// New idle gate with the given cooldown window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(State::Idle),
        }
    }

    /// Cooldown window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Register a request at the current instant.
    pub fn trigger(&self) -> Trigger {
        self.trigger_at(Instant::now())
    }

    /// Register a request at `now`.
    pub fn trigger_at(&self, now: Instant) -> Trigger {
        let mut state = self.state.lock();
        let cooling = matches!(*state, State::Cooling { deadline } if now < deadline);
        *state = State::Cooling {
            deadline: now + self.window,
        };
        if cooling {
            Trigger::Coalesced
        } else {
            Trigger::Fire
        }
    }

    // An expired cooldown reads as idle.
    #[cfg(test)]
    fn state_at(&self, now: Instant) -> State {
        match *self.state.lock() {
            State::Cooling { deadline } if now < deadline => {
                State::Cooling { deadline }
            }
            _ => State::Idle,
        }
    }
}
