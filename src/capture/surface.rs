//! Raster drawing surface that strokes are rendered into.
//!
//! Black ink on a white grayscale buffer, so a snapshot can go straight to
//! Tesseract without thresholding.

use image::{GrayImage, ImageBuffer, Luma};

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

/// A pointer position in surface pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Fixed-size pixel buffer owned by the tablet.
///
/// Mirrors the canvas commands the tablet issues: `begin_path`, `line_to`,
/// `clear`, and `to_image`. Segments are rasterized immediately so partial
/// strokes are always visible.
pub struct DrawingSurface {
    pixels: GrayImage,
    brush_width: f32,
    cursor: Option<Point>,
    inked: bool,
    /// Bumped on every pixel change so the GUI knows when to re-upload.
    revision: u64,
}

impl DrawingSurface {
    pub fn new(width: u32, height: u32, brush_width: f32) -> Self {
        Self {
            pixels: ImageBuffer::from_pixel(width, height, PAPER),
            brush_width: brush_width.max(1.0),
            cursor: None,
            inked: false,
            revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_ink(&self) -> bool {
        self.inked
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    /// Starts a new path at `point` and stamps a round dot there.
    pub fn begin_path(&mut self, point: Point) {
        self.cursor = Some(point);
        self.stamp_segment(point, point);
    }

    /// Draws a segment from the current path position to `point`.
    pub fn line_to(&mut self, point: Point) {
        let from = self.cursor.unwrap_or(point);
        self.stamp_segment(from, point);
        self.cursor = Some(point);
    }

    pub fn end_path(&mut self) {
        self.cursor = None;
    }

    /// Wipes the whole surface back to paper.
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = PAPER;
        }
        self.cursor = None;
        self.inked = false;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Snapshot of the current pixels for recognition.
    pub fn to_image(&self) -> GrayImage {
        self.pixels.clone()
    }

    #[cfg(test)]
    pub fn is_ink_at(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.pixels.get_pixel(x, y)[0] < 128
    }

    /// Rasterizes a round-capped segment of `brush_width` thickness.
    fn stamp_segment(&mut self, a: Point, b: Point) {
        let radius = self.brush_width / 2.0;
        let (w, h) = (self.width() as i64, self.height() as i64);

        let x0 = ((a.x.min(b.x) - radius).floor() as i64).max(0);
        let y0 = ((a.y.min(b.y) - radius).floor() as i64).max(0);
        let x1 = ((a.x.max(b.x) + radius).ceil() as i64).min(w - 1);
        let y1 = ((a.y.max(b.y) + radius).ceil() as i64).min(h - 1);

        if x1 < x0 || y1 < y0 {
            return;
        }

        let mut changed = false;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_segment(center, a, b) <= radius {
                    self.pixels.put_pixel(x as u32, y as u32, INK);
                    changed = true;
                }
            }
        }

        if changed {
            self.inked = true;
            self.revision = self.revision.wrapping_add(1);
        }
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let cx = a.x + t * dx;
    let cy = a.y + t * dy;
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}
