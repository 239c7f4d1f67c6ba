//! Stroke capture into the drawing surface.
//!
//! Pointer events become line segments rendered straight into a grayscale
//! buffer; the buffer is what gets snapshotted for recognition.

pub mod stroke;
pub mod surface;

pub use stroke::{CaptureError, StrokeCapture};
pub use surface::{DrawingSurface, Point};
