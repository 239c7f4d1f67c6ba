pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{OcrEngine, OcrOutput, RecognizeOptions, TesseractEngine};
pub use extract::validate_glyph;
pub use preprocess::crop_to_ink;
pub use setup::ensure_tessdata;
