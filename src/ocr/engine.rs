use anyhow::{Context, Result, anyhow, bail};
use image::GrayImage;
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::NamedTempFile;

use super::setup::{TesseractPaths, locate_tesseract};
use crate::tablet::config::TabletConfig;
use crate::tablet::queue::CancelToken;

/// How often a running Tesseract process is checked for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Represents a line of OCR text
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// Everything the engine read from one image.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    pub lines: Vec<OcrLine>,
}

impl OcrOutput {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mean word confidence, or None when no words were read.
    pub fn confidence(&self) -> Option<f32> {
        let confidences: Vec<f32> = self
            .lines
            .iter()
            .flat_map(|l| l.words.iter().map(|w| w.confidence))
            .collect();
        if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        }
    }
}

/// Engine options sent with every recognition.
#[derive(Debug, Clone)]
pub struct RecognizeOptions {
    pub char_whitelist: String,
    pub page_seg_mode: u8,
    pub language: String,
}

impl RecognizeOptions {
    pub fn from_config(config: &TabletConfig) -> Self {
        Self {
            char_whitelist: config.char_whitelist.clone(),
            page_seg_mode: config.page_seg_mode,
            language: config.ocr_language.clone(),
        }
    }
}

/// An optical character recognition backend.
///
/// Initialized once, reused across recognitions, terminated on shutdown.
pub trait OcrEngine: Send {
    fn initialize(&mut self) -> Result<()>;

    fn recognize(
        &mut self,
        image: &GrayImage,
        options: &RecognizeOptions,
        cancel: &CancelToken,
    ) -> Result<OcrOutput>;

    fn terminate(&mut self);
}

/// Drives a Tesseract executable as a child process.
#[derive(Default)]
pub struct TesseractEngine {
    paths: Option<TesseractPaths>,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OcrEngine for TesseractEngine {
    fn initialize(&mut self) -> Result<()> {
        let paths = locate_tesseract()?;
        crate::log(&format!(
            "Tesseract engine ready: {}",
            paths.executable.display()
        ));
        self.paths = Some(paths);
        Ok(())
    }

    fn recognize(
        &mut self,
        image: &GrayImage,
        options: &RecognizeOptions,
        cancel: &CancelToken,
    ) -> Result<OcrOutput> {
        let paths = self
            .paths
            .as_ref()
            .ok_or_else(|| anyhow!("Tesseract engine not initialized"))?;

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let mut command = Command::new(&paths.executable);
        command.arg(temp_input.path()).arg("stdout");
        if let Some(tessdata) = &paths.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        command
            .arg("-l")
            .arg(&options.language)
            .arg("--psm")
            .arg(options.page_seg_mode.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", options.char_whitelist))
            .arg("tsv");

        let output = run_cancellable(command, cancel).context("Tesseract run failed")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(OcrOutput {
            lines: parse_tsv_output(&tsv),
        })
    }

    fn terminate(&mut self) {
        if self.paths.take().is_some() {
            crate::log("Tesseract engine terminated");
        }
    }
}

/// Runs `command` to completion, killing it if `cancel` fires first.
///
/// Both pipes are drained on reader threads so a chatty child never blocks
/// on a full pipe while we wait for it.
pub fn run_cancellable(mut command: Command, cancel: &CancelToken) -> Result<Output> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to start process")?;

    let stdout = child.stdout.take().context("Child stdout not captured")?;
    let stderr = child.stderr.take().context("Child stderr not captured")?;
    let stdout_reader = thread::spawn(move || read_all(stdout));
    let stderr_reader = thread::spawn(move || read_all(stderr));

    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            bail!("Recognition cancelled");
        }
        if let Some(status) = child.try_wait()? {
            break status;
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: join_reader(stdout_reader)?,
        stderr: join_reader(stderr_reader)?,
    })
}

fn read_all(mut pipe: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
}

fn join_reader(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow!("Output reader thread panicked"))?
        .context("Failed to read process output")
}

/// Parses Tesseract TSV output into structured OcrLine data
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_line_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    for line in tsv.lines().skip(1) {
        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        if current_line_key.is_some() && current_line_key != Some(key) {
            lines.push(finish_line(std::mem::take(&mut current_words)));
        }
        current_line_key = Some(key);

        current_words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
        });
    }

    if !current_words.is_empty() {
        lines.push(finish_line(current_words));
    }

    lines
}

fn finish_line(words: Vec<OcrWord>) -> OcrLine {
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    OcrLine { text, words }
}
