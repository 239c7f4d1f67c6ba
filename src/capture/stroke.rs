//! Pointer-driven stroke capture.

use thiserror::Error;

use super::surface::{DrawingSurface, Point};

/// Rejected pointer transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Pointer-down while a stroke is already in progress
    #[error("a stroke is already in progress")]
    AlreadyDrawing,
    /// Pointer-up/leave with no stroke in progress
    #[error("no stroke in progress")]
    NotDrawing,
}

/// One continuous pointer-down-to-pointer-up gesture.
#[derive(Debug, Clone, Default)]
pub struct Stroke {
    pub points: Vec<Point>,
}

/// Tracks the single in-progress stroke and renders it as it grows.
#[derive(Debug, Default)]
pub struct StrokeCapture {
    current: Option<Stroke>,
}

impl StrokeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.current.is_some()
    }

    pub fn pointer_down(
        &mut self,
        point: Point,
        surface: &mut DrawingSurface,
    ) -> Result<(), CaptureError> {
        if self.current.is_some() {
            return Err(CaptureError::AlreadyDrawing);
        }

        surface.begin_path(point);
        self.current = Some(Stroke {
            points: vec![point],
        });
        Ok(())
    }

    /// Extends the stroke to `point`. Returns false when not drawing.
    pub fn pointer_move(&mut self, point: Point, surface: &mut DrawingSurface) -> bool {
        let Some(stroke) = self.current.as_mut() else {
            return false;
        };

        surface.line_to(point);
        stroke.points.push(point);
        true
    }

    /// Finishes the stroke. The returned point list is only informational;
    /// the surface pixels are the lasting record.
    pub fn pointer_up(&mut self, surface: &mut DrawingSurface) -> Result<Stroke, CaptureError> {
        let stroke = self.current.take().ok_or(CaptureError::NotDrawing)?;
        surface.end_path();
        Ok(stroke)
    }

    /// Drops any in-progress stroke without signalling its end.
    pub fn abort(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_down_move_up_records_points() {
        let mut surface = DrawingSurface::new(100, 100, 4.0);
        let mut capture = StrokeCapture::new();

        capture.pointer_down(Point::new(10.0, 10.0), &mut surface).unwrap();
        assert!(capture.pointer_move(Point::new(50.0, 10.0), &mut surface));
        assert!(capture.pointer_move(Point::new(50.0, 50.0), &mut surface));
        let stroke = capture.pointer_up(&mut surface).unwrap();

        assert_eq!(stroke.points.len(), 3);
        assert!(!capture.is_drawing());
        assert!(surface.is_ink_at(30, 10));
        assert!(surface.is_ink_at(50, 30));
    }

    #[test]
    fn test_second_down_is_rejected() {
        let mut surface = DrawingSurface::new(100, 100, 4.0);
        let mut capture = StrokeCapture::new();

        capture.pointer_down(Point::new(10.0, 10.0), &mut surface).unwrap();
        let err = capture
            .pointer_down(Point::new(90.0, 90.0), &mut surface)
            .unwrap_err();

        assert_eq!(err, CaptureError::AlreadyDrawing);
        assert!(!surface.is_ink_at(90, 90));
    }

    #[test]
    fn test_move_and_up_without_stroke_are_noops() {
        let mut surface = DrawingSurface::new(100, 100, 4.0);
        let mut capture = StrokeCapture::new();

        assert!(!capture.pointer_move(Point::new(40.0, 40.0), &mut surface));
        assert_eq!(
            capture.pointer_up(&mut surface).unwrap_err(),
            CaptureError::NotDrawing
        );
        assert!(!surface.has_ink());
    }
}
