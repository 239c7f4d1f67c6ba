//! GUI application state management.
//!
//! Tracks the target sentence, export status, and status messages for display.

use std::path::PathBuf;

use crate::session::{SessionScorer, TargetSentences};
use crate::tablet::{Composer, RecognitionPhase, RecognitionResult};

/// One-off message shown under the controls.
#[derive(Clone, Debug)]
pub enum Notice {
    Exported(PathBuf),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> String {
        match self {
            Self::Exported(path) => format!("Exported to {}", path.display()),
            Self::Error(msg) => format!("Error: {}", msg),
        }
    }
}

/// What the status line should say about the tablet.
#[derive(Clone, Debug, PartialEq)]
pub enum TabletStatus {
    Ready,
    Drawing,
    Waiting,
    Recognizing,
    Recognized(char),
    Failed(String),
}

impl TabletStatus {
    pub fn from_composer(composer: &Composer) -> Self {
        if composer.is_drawing() {
            return Self::Drawing;
        }
        match composer.phase() {
            RecognitionPhase::Recognizing => return Self::Recognizing,
            RecognitionPhase::AwaitingDebounce => return Self::Waiting,
            RecognitionPhase::Idle => {}
        }
        match composer.last_result() {
            Some(RecognitionResult::LowConfidence(reason)) if composer.failure_visible() => {
                Self::Failed(reason.to_string())
            }
            Some(RecognitionResult::Recognized(c)) => Self::Recognized(*c),
            _ => Self::Ready,
        }
    }

    pub fn status_text(&self) -> String {
        match self {
            Self::Ready => "Ready".to_string(),
            Self::Drawing => "Drawing...".to_string(),
            Self::Waiting => "Waiting for more strokes...".to_string(),
            Self::Recognizing => "Recognizing...".to_string(),
            Self::Recognized(c) => format!("Recognized '{}'", c),
            Self::Failed(reason) => format!("Could not read that letter ({}). Try again.", reason),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Waiting | Self::Recognizing)
    }
}

/// Formats seconds as mm:ss.
pub fn format_elapsed(seconds: f64) -> String {
    let secs = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// GUI application state.
#[derive(Debug)]
pub struct GuiState {
    pub targets: TargetSentences,
    pub notice: Option<Notice>,
    /// The ended session has already been written to results/
    exported: bool,
}

impl GuiState {
    pub fn new(sentences: &[String]) -> Self {
        Self {
            targets: TargetSentences::new(sentences),
            notice: None,
            exported: false,
        }
    }

    /// Each ended session can be exported once.
    pub fn export_enabled(&self, session: &SessionScorer) -> bool {
        session.metrics().is_some() && !self.exported
    }

    pub fn mark_exported(&mut self) {
        self.exported = true;
    }

    /// Called whenever a session starts or ends.
    pub fn reset_export(&mut self) {
        self.exported = false;
        self.notice = None;
    }
}
