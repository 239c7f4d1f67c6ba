//! JSON export of a finished session.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::scoring::ScoringMetrics;

/// The exported record shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
    pub wpm: f64,
    pub minimum_string_distance: usize,
}

impl SessionRecord {
    pub fn from_metrics(metrics: &ScoringMetrics) -> Self {
        Self {
            start_time: metrics
                .started_at
                .to_rfc3339_opts(SecondsFormat::Millis, false),
            end_time: metrics.ended_at.to_rfc3339_opts(SecondsFormat::Millis, false),
            duration_seconds: round2(metrics.duration_seconds),
            wpm: round2(metrics.words_per_minute),
            minimum_string_distance: metrics.minimum_string_distance,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// File name for an export: `session_<end millis>.json`.
pub fn export_file_name(metrics: &ScoringMetrics) -> String {
    format!("session_{}.json", metrics.ended_at.timestamp_millis())
}

/// Writes the session record into `output_dir` and returns the file path.
///
/// The output is pretty-printed for human readability.
pub fn export_session(metrics: &ScoringMetrics, output_dir: &Path) -> Result<PathBuf> {
    let record = SessionRecord::from_metrics(metrics);
    let json =
        serde_json::to_string_pretty(&record).context("Failed to serialize session to JSON")?;

    let output_path = output_dir.join(export_file_name(metrics));
    let mut file = File::create(&output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(output_path)
}
