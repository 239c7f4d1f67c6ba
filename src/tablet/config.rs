//! Configuration for the writing tablet.
//!
//! Loads settings from config.json at startup. Provides canvas geometry,
//! debounce and timeout timing, OCR options, and the target sentence list.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<TabletConfig> = OnceLock::new();

/// Complete tablet configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TabletConfig {
    /// Drawing surface width in pixels
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,
    /// Drawing surface height in pixels
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
    /// Pen width in pixels
    #[serde(default = "default_brush_width")]
    pub brush_width: f32,
    /// Quiet period after the last stroke before recognition fires (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Maximum time a recognition may stay in flight (milliseconds)
    #[serde(default = "default_recognition_timeout_ms")]
    pub recognition_timeout_ms: u64,
    /// Characters Tesseract is allowed to emit
    #[serde(default = "default_char_whitelist")]
    pub char_whitelist: String,
    /// Tesseract page segmentation mode (10 = single character)
    #[serde(default = "default_page_seg_mode")]
    pub page_seg_mode: u8,
    /// Tesseract language
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// Normalize recognized letters to upper case
    #[serde(default = "default_uppercase")]
    pub uppercase: bool,
    /// Minimum Tesseract word confidence (0-100); 0 disables the check
    #[serde(default)]
    pub min_confidence: f32,
    /// White border added around the ink before recognition (pixels)
    #[serde(default = "default_crop_margin")]
    pub crop_margin: u32,
    /// Reference sentences cycled by the header
    #[serde(default = "default_target_sentences")]
    pub target_sentences: Vec<String>,
}

fn default_canvas_width() -> u32 {
    400
}

fn default_canvas_height() -> u32 {
    400
}

fn default_brush_width() -> f32 {
    4.0
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_recognition_timeout_ms() -> u64 {
    15000
}

fn default_char_whitelist() -> String {
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz".to_string()
}

fn default_page_seg_mode() -> u8 {
    10
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_uppercase() -> bool {
    true
}

fn default_crop_margin() -> u32 {
    24
}

fn default_target_sentences() -> Vec<String> {
    [
        "THE QUICK BROWN FOX",
        "HELLO WORLD",
        "PACK MY BOX WITH FIVE DOZEN LIQUOR JUGS",
        "SPHINX OF BLACK QUARTZ JUDGE MY VOW",
        "HANDWRITING IS FUN",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for TabletConfig {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            brush_width: default_brush_width(),
            debounce_ms: default_debounce_ms(),
            recognition_timeout_ms: default_recognition_timeout_ms(),
            char_whitelist: default_char_whitelist(),
            page_seg_mode: default_page_seg_mode(),
            ocr_language: default_ocr_language(),
            uppercase: default_uppercase(),
            min_confidence: 0.0,
            crop_margin: default_crop_margin(),
            target_sentences: default_target_sentences(),
        }
    }
}

impl TabletConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_millis(self.recognition_timeout_ms)
    }
}

/// Reads a config file, falling back to defaults on any problem.
pub fn load_config_from(config_path: &Path) -> TabletConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    TabletConfig::default()
}

/// Returns the global configuration, loading config.json on first use.
pub fn get_config() -> &'static TabletConfig {
    CONFIG.get_or_init(|| load_config_from(&crate::paths::get_config_path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));

        assert_eq!(config.canvas_width, 400);
        assert_eq!(config.debounce_ms, 1000);
        assert_eq!(config.page_seg_mode, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "debounce_ms": 750, "uppercase": false }"#).unwrap();

        let config = load_config_from(&path);

        assert_eq!(config.debounce(), Duration::from_millis(750));
        assert!(!config.uppercase);
        assert_eq!(config.canvas_height, 400);
        assert!(!config.target_sentences.is_empty());
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.recognition_timeout_ms, 15000);
    }
}
