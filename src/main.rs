//! Handwriting Trainer
//!
//! A writing tablet that turns hand-drawn letters into typed text with
//! Tesseract, and scores timed sessions by speed and accuracy against a
//! target sentence.

mod capture;
mod gui;
mod ocr;
mod paths;
mod session;
mod tablet;

use anyhow::{Result, anyhow};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

const LOG_FILE_NAME: &str = "handwriting_trainer.log";

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    // Ensure output directories exist
    paths::ensure_directories()?;

    // Tesseract is looked up again on first recognition, so a failure here is not fatal
    match ocr::ensure_tessdata() {
        Ok(found) => log(&format!("Tesseract: {}", found.executable.display())),
        Err(e) => {
            log(&format!("Warning: Failed to set up Tesseract: {:#}", e));
            log("Letters will not be recognized until Tesseract is installed.");
        }
    }

    let config = tablet::get_config();

    log("Starting GUI application...");
    match gui::run_gui(config) {
        Ok(()) => {
            log("GUI application exited normally");
            Ok(())
        }
        Err(e) => {
            log(&format!("GUI error: {}", e));
            Err(anyhow!("GUI error: {}", e))
        }
    }
}
