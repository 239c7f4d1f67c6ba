//! Snapshot → engine → validated letter.
//!
//! Every failure on this path (blank surface, bad output, engine errors,
//! cancellation) ends as `LowConfidence`; nothing propagates to the caller.

use image::GrayImage;
use std::fmt;

use super::config::TabletConfig;
use super::queue::CancelToken;
use crate::ocr::{OcrEngine, OcrOutput, RecognizeOptions, crop_to_ink, validate_glyph};

/// Why a recognition did not produce a letter.
#[derive(Debug, Clone, PartialEq)]
pub enum LowConfidenceReason {
    /// Nothing was drawn
    Blank,
    /// Engine output was empty, more than one character, or not a letter
    Rejected { output: String },
    /// A letter came back but the engine was unsure of it
    BelowConfidence { output: String, confidence: f32 },
    /// The engine failed to start or to run
    EngineFailure(String),
    TimedOut,
    Cancelled,
}

impl fmt::Display for LowConfidenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowConfidenceReason::Blank => write!(f, "blank surface"),
            LowConfidenceReason::Rejected { output } => write!(f, "rejected output {:?}", output),
            LowConfidenceReason::BelowConfidence { output, confidence } => {
                write!(f, "{:?} at confidence {:.1}", output, confidence)
            }
            LowConfidenceReason::EngineFailure(msg) => write!(f, "engine failure: {}", msg),
            LowConfidenceReason::TimedOut => write!(f, "timed out"),
            LowConfidenceReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    Recognized(char),
    LowConfidence(LowConfidenceReason),
}

impl fmt::Display for RecognitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionResult::Recognized(c) => write!(f, "Recognized '{}'", c),
            RecognitionResult::LowConfidence(reason) => write!(f, "Low confidence ({})", reason),
        }
    }
}

/// Owns one engine for its whole life; initialized lazily, retried after
/// an initialization failure.
pub struct RecognitionPipeline {
    engine: Box<dyn OcrEngine>,
    options: RecognizeOptions,
    uppercase: bool,
    min_confidence: f32,
    crop_margin: u32,
    ready: bool,
}

impl RecognitionPipeline {
    pub fn new(engine: Box<dyn OcrEngine>, config: &TabletConfig) -> Self {
        Self {
            engine,
            options: RecognizeOptions::from_config(config),
            uppercase: config.uppercase,
            min_confidence: config.min_confidence,
            crop_margin: config.crop_margin,
            ready: false,
        }
    }

    pub fn recognize(&mut self, image: &GrayImage, cancel: &CancelToken) -> RecognitionResult {
        if cancel.is_cancelled() {
            return RecognitionResult::LowConfidence(LowConfidenceReason::Cancelled);
        }

        let Some(glyph) = crop_to_ink(image, self.crop_margin) else {
            return RecognitionResult::LowConfidence(LowConfidenceReason::Blank);
        };

        if !self.ready {
            if let Err(e) = self.engine.initialize() {
                crate::log(&format!("OCR engine initialization failed: {}", e));
                return RecognitionResult::LowConfidence(LowConfidenceReason::EngineFailure(
                    e.to_string(),
                ));
            }
            self.ready = true;
        }

        match self.engine.recognize(&glyph, &self.options, cancel) {
            Ok(output) => self.classify(&output),
            Err(_) if cancel.is_cancelled() => {
                RecognitionResult::LowConfidence(LowConfidenceReason::Cancelled)
            }
            Err(e) => {
                crate::log(&format!("OCR engine error: {}", e));
                RecognitionResult::LowConfidence(LowConfidenceReason::EngineFailure(e.to_string()))
            }
        }
    }

    fn classify(&self, output: &OcrOutput) -> RecognitionResult {
        let text = output.text();
        let trimmed = text.trim();

        let letter = match validate_glyph(trimmed, self.uppercase) {
            Ok(Some(letter)) => letter,
            Ok(None) => {
                return RecognitionResult::LowConfidence(LowConfidenceReason::Rejected {
                    output: trimmed.to_string(),
                });
            }
            Err(e) => {
                return RecognitionResult::LowConfidence(LowConfidenceReason::EngineFailure(
                    e.to_string(),
                ));
            }
        };

        if let Some(confidence) = output.confidence() {
            if confidence < self.min_confidence {
                return RecognitionResult::LowConfidence(LowConfidenceReason::BelowConfidence {
                    output: trimmed.to_string(),
                    confidence,
                });
            }
        }

        RecognitionResult::Recognized(letter)
    }

    /// Terminates the engine if it was started.
    pub fn shutdown(&mut self) {
        if self.ready {
            self.engine.terminate();
            self.ready = false;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ocr::engine::{OcrLine, OcrWord};
    use anyhow::{Result, anyhow};
    use image::{ImageBuffer, Luma};
    use std::sync::{Arc, Mutex};

    /// Counters shared between a test and its scripted engine.
    #[derive(Debug, Default)]
    pub(crate) struct EngineLog {
        pub initialized: u32,
        pub recognized: u32,
        pub terminated: u32,
    }

    /// Engine that replays canned answers in order.
    pub(crate) struct ScriptedEngine {
        pub answers: Vec<Result<(String, f32)>>,
        pub fail_init: bool,
        pub log: Arc<Mutex<EngineLog>>,
    }

    impl ScriptedEngine {
        pub fn new(answers: Vec<Result<(String, f32)>>) -> Self {
            Self {
                answers,
                fail_init: false,
                log: Arc::new(Mutex::new(EngineLog::default())),
            }
        }

        pub fn answering(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok((t.to_string(), 90.0))).collect())
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn initialize(&mut self) -> Result<()> {
            self.log.lock().unwrap().initialized += 1;
            if self.fail_init {
                Err(anyhow!("no tesseract"))
            } else {
                Ok(())
            }
        }

        fn recognize(
            &mut self,
            _image: &GrayImage,
            _options: &RecognizeOptions,
            _cancel: &CancelToken,
        ) -> Result<OcrOutput> {
            self.log.lock().unwrap().recognized += 1;
            if self.answers.is_empty() {
                return Err(anyhow!("script exhausted"));
            }
            let (text, confidence) = self.answers.remove(0)?;
            let lines = if text.is_empty() {
                Vec::new()
            } else {
                vec![OcrLine {
                    text: text.clone(),
                    words: vec![OcrWord { text, confidence }],
                }]
            };
            Ok(OcrOutput { lines })
        }

        fn terminate(&mut self) {
            self.log.lock().unwrap().terminated += 1;
        }
    }

    pub(crate) fn inked_image() -> GrayImage {
        ImageBuffer::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    fn pipeline(engine: ScriptedEngine) -> RecognitionPipeline {
        RecognitionPipeline::new(Box::new(engine), &TabletConfig::default())
    }

    #[test]
    fn test_single_letter_is_recognized() {
        let mut p = pipeline(ScriptedEngine::answering(&["A", " b\n"]));
        let cancel = CancelToken::new();

        assert_eq!(
            p.recognize(&inked_image(), &cancel),
            RecognitionResult::Recognized('A')
        );
        assert_eq!(
            p.recognize(&inked_image(), &cancel),
            RecognitionResult::Recognized('B')
        );
    }

    #[test]
    fn test_invalid_output_is_low_confidence() {
        let mut p = pipeline(ScriptedEngine::answering(&["", "AB", "7"]));
        let cancel = CancelToken::new();

        for expected in ["", "AB", "7"] {
            assert_eq!(
                p.recognize(&inked_image(), &cancel),
                RecognitionResult::LowConfidence(LowConfidenceReason::Rejected {
                    output: expected.to_string()
                })
            );
        }
    }

    #[test]
    fn test_engine_error_is_low_confidence() {
        let mut p = pipeline(ScriptedEngine::new(vec![Err(anyhow!("crashed"))]));

        let result = p.recognize(&inked_image(), &CancelToken::new());
        assert_eq!(
            result,
            RecognitionResult::LowConfidence(LowConfidenceReason::EngineFailure(
                "crashed".to_string()
            ))
        );
    }

    #[test]
    fn test_engine_initialized_once_and_reused() {
        let engine = ScriptedEngine::answering(&["A", "B", "C"]);
        let log = engine.log.clone();
        let mut p = pipeline(engine);

        for _ in 0..3 {
            p.recognize(&inked_image(), &CancelToken::new());
        }
        p.shutdown();
        p.shutdown();

        let log = log.lock().unwrap();
        assert_eq!(log.initialized, 1);
        assert_eq!(log.recognized, 3);
        assert_eq!(log.terminated, 1);
    }

    #[test]
    fn test_init_failure_is_retried_next_time() {
        let mut engine = ScriptedEngine::answering(&["A"]);
        engine.fail_init = true;
        let log = engine.log.clone();
        let mut p = pipeline(engine);

        let first = p.recognize(&inked_image(), &CancelToken::new());
        assert!(matches!(
            first,
            RecognitionResult::LowConfidence(LowConfidenceReason::EngineFailure(_))
        ));
        assert!(!p.ready);

        p.recognize(&inked_image(), &CancelToken::new());
        let log = log.lock().unwrap();
        assert_eq!(log.initialized, 2);
        assert_eq!(log.recognized, 0);
    }

    #[test]
    fn test_blank_surface_skips_engine() {
        let engine = ScriptedEngine::answering(&["A"]);
        let log = engine.log.clone();
        let mut p = pipeline(engine);
        let blank: GrayImage = ImageBuffer::from_pixel(40, 40, Luma([255]));

        assert_eq!(
            p.recognize(&blank, &CancelToken::new()),
            RecognitionResult::LowConfidence(LowConfidenceReason::Blank)
        );
        assert_eq!(log.lock().unwrap().initialized, 0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let engine = ScriptedEngine::answering(&["A"]);
        let log = engine.log.clone();
        let mut p = pipeline(engine);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(
            p.recognize(&inked_image(), &cancel),
            RecognitionResult::LowConfidence(LowConfidenceReason::Cancelled)
        );
        assert_eq!(log.lock().unwrap().recognized, 0);
    }

    #[test]
    fn test_min_confidence_rejects_unsure_letter() {
        let engine = ScriptedEngine::new(vec![Ok(("A".to_string(), 40.0))]);
        let config = TabletConfig {
            min_confidence: 60.0,
            ..TabletConfig::default()
        };
        let mut p = RecognitionPipeline::new(Box::new(engine), &config);

        assert_eq!(
            p.recognize(&inked_image(), &CancelToken::new()),
            RecognitionResult::LowConfidence(LowConfidenceReason::BelowConfidence {
                output: "A".to_string(),
                confidence: 40.0
            })
        );
    }
}
