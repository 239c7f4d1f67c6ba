//! Writing tablet: from finished strokes to typed letters.
//!
//! This module provides:
//! - Tablet configuration loaded from config.json
//! - The debounce window that waits out multi-stroke letters
//! - The recognition pipeline and its worker thread
//! - The composition state machine tying strokes, recognition, and sessions together

pub mod config;
pub mod debounce;
pub mod pipeline;
pub mod queue;
pub mod state;
pub mod worker;

pub use config::{TabletConfig, get_config};
pub use pipeline::RecognitionResult;
pub use state::{Composer, RecognitionPhase, TickEvent};
pub use worker::RecognitionWorker;
