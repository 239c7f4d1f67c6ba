//! Append-only CSV history of exported sessions.
//!
//! Opens the file in append mode for each write so earlier sessions
//! survive a crash.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use super::export::SessionRecord;
use super::scoring::ScoringMetrics;

const CSV_HEADER: &str =
    "start_time,end_time,duration_seconds,wpm,minimum_string_distance,letters,typed,target";

/// Initializes the history file with a header if it doesn't exist or is empty.
pub fn init_history(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing history CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create history CSV")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write history header")?;
    Ok(())
}

/// Appends one session row.
pub fn append_session(path: &Path, metrics: &ScoringMetrics) -> Result<()> {
    init_history(path)?;

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .context("Failed to open history CSV for append")?;

    let record = SessionRecord::from_metrics(metrics);
    let line = format!(
        "{},{},{:.2},{:.2},{},{},{},{}",
        record.start_time,
        record.end_time,
        record.duration_seconds,
        record.wpm,
        record.minimum_string_distance,
        metrics.letters,
        quote(&metrics.typed),
        quote(&metrics.target),
    );

    writeln!(file, "{}", line).context("Failed to write history row")?;
    Ok(())
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
