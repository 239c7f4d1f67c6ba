//! Session timing and scoring.
//!
//! A session runs from Start to End. While running it counts recognized
//! letters; at End it freezes duration, words-per-minute, and the minimum
//! string distance between what was typed and the target sentence.

use chrono::{DateTime, Local};
use thiserror::Error;

use super::distance::edit_distance;

/// Characters per "word" in the words-per-minute convention.
const LETTERS_PER_WORD: f64 = 5.0;

/// Words per minute for `letters` typed over `elapsed_minutes`.
///
/// Zero when no time has elapsed.
pub fn words_per_minute(letters: u32, elapsed_minutes: f64) -> f64 {
    if elapsed_minutes > 0.0 {
        (letters as f64 / LETTERS_PER_WORD) / elapsed_minutes
    } else {
        0.0
    }
}

/// Minutes between two timestamps, clamped at zero.
pub fn elapsed_minutes(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 60_000.0
}

/// Final numbers for one session. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringMetrics {
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub duration_seconds: f64,
    pub letters: u32,
    pub words_per_minute: f64,
    pub minimum_string_distance: usize,
    /// Text typed between Start and End
    pub typed: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Running {
        started_at: DateTime<Local>,
        letters: u32,
        /// Length of the typed text (in chars) when the session started
        typed_offset: usize,
    },
    Ended(ScoringMetrics),
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Running { .. } => "Running",
            SessionState::Ended(_) => "Ended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The requested action is not valid from the current state
    #[error("cannot {action} a session while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

#[derive(Debug, Default)]
pub struct SessionScorer {
    state: SessionState,
}

impl SessionScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running { .. })
    }

    pub fn metrics(&self) -> Option<&ScoringMetrics> {
        match &self.state {
            SessionState::Ended(metrics) => Some(metrics),
            _ => None,
        }
    }

    /// Letters counted so far in the running session.
    pub fn letters(&self) -> u32 {
        match &self.state {
            SessionState::Running { letters, .. } => *letters,
            SessionState::Ended(metrics) => metrics.letters,
            SessionState::Idle => 0,
        }
    }

    /// Starts a session. Starting while running restarts the clock and
    /// counter; returns true in that case.
    pub fn start(&mut self, now: DateTime<Local>, typed_offset: usize) -> bool {
        let restarted = self.is_running();
        self.state = SessionState::Running {
            started_at: now,
            letters: 0,
            typed_offset,
        };
        restarted
    }

    /// Counts one recognized letter. Returns false outside a running session.
    pub fn record_letter(&mut self) -> bool {
        match &mut self.state {
            SessionState::Running { letters, .. } => {
                *letters += 1;
                true
            }
            _ => false,
        }
    }

    /// Ends the running session and computes its metrics against `target`.
    ///
    /// `typed` is the full typed text; only the part typed since Start is scored.
    pub fn end(
        &mut self,
        now: DateTime<Local>,
        typed: &str,
        target: &str,
    ) -> Result<ScoringMetrics, SessionError> {
        let SessionState::Running {
            started_at,
            letters,
            typed_offset,
        } = self.state
        else {
            return Err(SessionError::InvalidTransition {
                from: self.state.name(),
                action: "end",
            });
        };

        let minutes = elapsed_minutes(started_at, now);
        let typed_since_start: String = typed.chars().skip(typed_offset).collect();

        let metrics = ScoringMetrics {
            started_at,
            ended_at: now,
            duration_seconds: minutes * 60.0,
            letters,
            words_per_minute: words_per_minute(letters, minutes),
            minimum_string_distance: edit_distance(&typed_since_start, target),
            typed: typed_since_start,
            target: target.to_string(),
        };

        self.state = SessionState::Ended(metrics.clone());
        Ok(metrics)
    }
}
