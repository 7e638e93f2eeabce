//! Screen/canvas coordinate conversion.
//!
//! File positions are stored as percentages of the canvas extent so that
//! every client lays them out identically regardless of window size.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::gesture::DragIntent;

/// Maps between screen pixels and canvas percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Canvas bounds in screen coordinates.
    pub bounds: Rect,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, 1280.0, 800.0),
        }
    }
}

impl Viewport {
    pub fn new(bounds: Rect) -> Self {
        Self { bounds }
    }

    /// Convert a screen point to canvas percentages, clamped to 0..=100.
    pub fn to_percent(&self, screen_point: Point) -> (f64, f64) {
        let width = self.bounds.width().max(1.0);
        let height = self.bounds.height().max(1.0);
        let x = (screen_point.x - self.bounds.x0) / width * 100.0;
        let y = (screen_point.y - self.bounds.y0) / height * 100.0;
        (x.clamp(0.0, 100.0), y.clamp(0.0, 100.0))
    }

    /// Where to draw the icon of an active drag, relative to the canvas
    /// origin. The pointer offset keeps the icon from jumping under the
    /// pointer.
    pub fn drag_position(&self, intent: &DragIntent) -> Option<Point> {
        match intent {
            DragIntent::Active {
                pointer_offset,
                live_point,
                ..
            } => Some(*live_point - *pointer_offset - Vec2::new(self.bounds.x0, self.bounds.y0)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_offset_canvas() {
        let vp = Viewport::new(Rect::new(100.0, 50.0, 1100.0, 550.0));
        let (x, y) = vp.to_percent(Point::new(400.0, 250.0));
        assert!((x - 30.0).abs() < 1e-9);
        assert!((y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_clamped() {
        let vp = Viewport::new(Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(vp.to_percent(Point::new(-50.0, 500.0)), (0.0, 100.0));
    }

    #[test]
    fn test_degenerate_bounds() {
        let vp = Viewport::new(Rect::new(0.0, 0.0, 0.0, 0.0));
        let (x, y) = vp.to_percent(Point::new(0.5, 0.5));
        assert!(x.is_finite() && y.is_finite());
    }

    #[test]
    fn test_drag_position() {
        let vp = Viewport::new(Rect::new(10.0, 20.0, 510.0, 520.0));
        let intent = DragIntent::Active {
            file_id: 1,
            pointer_offset: Vec2::new(-5.0, 5.0),
            live_point: Point::new(100.0, 100.0),
        };
        assert_eq!(vp.drag_position(&intent), Some(Point::new(95.0, 75.0)));
        assert_eq!(vp.drag_position(&DragIntent::Idle), None);
    }
}
