//! Quiet-period timer between the last stroke and recognition.
//!
//! Letters like "T" or "i" take several strokes; recognition waits until
//! the pen has been idle for the whole window.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending { deadline: Instant },
}

/// Polled timer. At most one deadline is outstanding; arming again replaces it.
#[derive(Debug)]
pub struct RecognitionDebouncer {
    delay: Duration,
    state: DebounceState,
}

impl RecognitionDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: DebounceState::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }

    /// Starts (or restarts) the quiet window from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.state = DebounceState::Pending {
            deadline: now + self.delay,
        };
    }

    /// Drops the pending deadline. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.state = DebounceState::Idle;
        was_pending
    }

    /// Returns true exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Pending { deadline } if now >= deadline => {
                self.state = DebounceState::Idle;
                true
            }
            _ => false,
        }
    }
}
