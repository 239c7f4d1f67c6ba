//! Session scoring and result output.
//!
//! This module provides:
//! - Minimum string distance (Levenshtein) between typed and target text
//! - Words-per-minute scoring over a Start/End session
//! - Rotating target sentences
//! - JSON export and CSV history of finished sessions

pub mod distance;
pub mod export;
pub mod history;
pub mod scoring;
pub mod targets;

pub use scoring::{ScoringMetrics, SessionError, SessionScorer, SessionState};
pub use targets::TargetSentences;

use anyhow::Result;
use std::path::PathBuf;

/// Writes the JSON export and appends the history row.
///
/// Returns the path of the JSON file.
pub fn save_session(metrics: &ScoringMetrics) -> Result<PathBuf> {
    let results_dir = crate::paths::get_results_dir();
    std::fs::create_dir_all(&results_dir)?;

    let json_path = export::export_session(metrics, &results_dir)?;
    crate::log(&format!("Session exported: {}", json_path.display()));

    history::append_session(&crate::paths::get_history_path(), metrics)?;
    crate::log("Session appended to history.csv");

    Ok(json_path)
}
