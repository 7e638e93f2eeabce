//! Drag gesture recognition.
//!
//! Turns unified [`PointerEvent`] streams into drag intents. Mouse presses
//! start a drag immediately. Touch presses only arm a pending drag that is
//! confirmed once the finger travels past [`DRAG_THRESHOLD`]; anything shorter
//! is a tap and left to the default tap handling.

use kurbo::{Point, Rect, Vec2};
use std::time::Instant;

use crate::file::FileId;
use crate::input::{InputSource, PointerEvent, PressTarget};
use crate::surface::SurfaceGuard;

/// Distance in device-independent pixels a touch must travel to become a drag.
pub const DRAG_THRESHOLD: f64 = 10.0;

/// In-progress repositioning gesture. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragIntent {
    #[default]
    Idle,
    /// Touch went down on a file but has not moved far enough yet.
    PendingConfirmation {
        start_point: Point,
        file_id: FileId,
        /// Icon bounds measured at press time.
        captured_bounds: Rect,
    },
    /// A file is being dragged.
    Active {
        file_id: FileId,
        /// Press point minus the icon's visual center.
        pointer_offset: Vec2,
        live_point: Point,
    },
}

impl DragIntent {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// File currently being dragged or armed for dragging.
    pub fn file_id(&self) -> Option<FileId> {
        match self {
            Self::Idle => None,
            Self::PendingConfirmation { file_id, .. } | Self::Active { file_id, .. } => Some(*file_id),
        }
    }
}

/// Drag lifecycle intents emitted by the recognizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureIntent {
    /// A drag became active.
    Begin { file_id: FileId, pointer_offset: Vec2 },
    /// The pointer moved during an active drag.
    Update { file_id: FileId, live_point: Point },
    /// The drag finished; commit the file to `final_point`.
    End { file_id: FileId, final_point: Point },
    /// The drag was abandoned without moving the file.
    Cancel { file_id: FileId },
}

/// Pure state machine over a single pointer stream.
#[derive(Debug, Clone, Default)]
pub struct GestureRecognizer {
    intent: DragIntent,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current drag intent.
    pub fn intent(&self) -> DragIntent {
        self.intent
    }

    /// Feed one pointer event. `guard` decides whether presses are swallowed
    /// by a modal surface.
    pub fn handle(&mut self, event: PointerEvent, guard: &SurfaceGuard, now: Instant) -> Option<GestureIntent> {
        match event {
            PointerEvent::Press { source, position, target } => {
                let target = target?;
                if guard.blocks_input(now) {
                    log::debug!("Press on file {} suppressed by open or closing surface", target.file_id);
                    return None;
                }
                match source {
                    InputSource::Mouse(button) if button.is_primary() => self.on_primary_press(position, target),
                    InputSource::Mouse(_) => None,
                    InputSource::Touch { touches: 1 } => {
                        self.on_touch_press(position, target);
                        None
                    }
                    InputSource::Touch { .. } => None,
                }
            }
            PointerEvent::Move { position } => self.on_pointer_move(position),
            PointerEvent::Release { position } => {
                // The release that dismisses a surface must not drop a file.
                if guard.recently_closed(now) {
                    return self.cancel();
                }
                self.on_pointer_release(position)
            }
            PointerEvent::Cancel => self.cancel(),
        }
    }

    /// Mouse press with the primary button: start dragging right away.
    pub fn on_primary_press(&mut self, point: Point, target: PressTarget) -> Option<GestureIntent> {
        if !self.intent.is_idle() {
            return None;
        }
        let pointer_offset = point - target.bounds.center();
        self.intent = DragIntent::Active {
            file_id: target.file_id,
            pointer_offset,
            live_point: point,
        };
        Some(GestureIntent::Begin {
            file_id: target.file_id,
            pointer_offset,
        })
    }

    /// Touch press: remember where it started, but do not drag yet.
    pub fn on_touch_press(&mut self, point: Point, target: PressTarget) {
        if !self.intent.is_idle() {
            return;
        }
        self.intent = DragIntent::PendingConfirmation {
            start_point: point,
            file_id: target.file_id,
            captured_bounds: target.bounds,
        };
    }

    pub fn on_pointer_move(&mut self, point: Point) -> Option<GestureIntent> {
        match &mut self.intent {
            DragIntent::Idle => None,
            DragIntent::PendingConfirmation {
                start_point,
                file_id,
                captured_bounds,
            } => {
                if start_point.distance(point) <= DRAG_THRESHOLD {
                    return None;
                }
                let file_id = *file_id;
                let pointer_offset = *start_point - captured_bounds.center();
                self.intent = DragIntent::Active {
                    file_id,
                    pointer_offset,
                    live_point: point,
                };
                Some(GestureIntent::Begin { file_id, pointer_offset })
            }
            DragIntent::Active { file_id, live_point, .. } => {
                *live_point = point;
                Some(GestureIntent::Update {
                    file_id: *file_id,
                    live_point: point,
                })
            }
        }
    }

    pub fn on_pointer_release(&mut self, point: Point) -> Option<GestureIntent> {
        match std::mem::take(&mut self.intent) {
            DragIntent::Active { file_id, .. } => Some(GestureIntent::End {
                file_id,
                final_point: point,
            }),
            // A tap; handled by whoever listens for clicks.
            DragIntent::PendingConfirmation { .. } | DragIntent::Idle => None,
        }
    }

    /// Abandon whatever is in progress.
    pub fn cancel(&mut self) -> Option<GestureIntent> {
        match std::mem::take(&mut self.intent) {
            DragIntent::Active { file_id, .. } => Some(GestureIntent::Cancel { file_id }),
            DragIntent::PendingConfirmation { .. } | DragIntent::Idle => None,
        }
    }

    /// Drop all drag state without emitting anything.
    pub fn reset(&mut self) {
        self.intent = DragIntent::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseButton;
    use crate::surface::SurfaceId;
    use std::time::Duration;

    fn bounds() -> Rect {
        // Center at (120, 120).
        Rect::new(100.0, 100.0, 140.0, 140.0)
    }

    fn press_touch(r: &mut GestureRecognizer, guard: &SurfaceGuard, now: Instant, at: Point) {
        r.handle(PointerEvent::touch_press(at, 1, bounds()), guard, now);
    }

    #[test]
    fn test_mouse_press_starts_drag_with_offset() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();

        let out = r.handle(
            PointerEvent::mouse_press(MouseButton::Left, Point::new(110.0, 125.0), 1, bounds()),
            &guard,
            now,
        );

        assert_eq!(
            out,
            Some(GestureIntent::Begin {
                file_id: 1,
                pointer_offset: Vec2::new(-10.0, 5.0)
            })
        );
        assert!(r.intent().is_active());
    }

    #[test]
    fn test_secondary_button_never_drags() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();

        for button in [MouseButton::Right, MouseButton::Middle] {
            let out = r.handle(PointerEvent::mouse_press(button, Point::new(120.0, 120.0), 1, bounds()), &guard, now);
            assert_eq!(out, None);
            assert!(r.intent().is_idle());
        }
    }

    #[test]
    fn test_press_on_empty_canvas_ignored() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let out = r.handle(
            PointerEvent::Press {
                source: InputSource::Mouse(MouseButton::Left),
                position: Point::new(1.0, 1.0),
                target: None,
            },
            &guard,
            Instant::now(),
        );
        assert_eq!(out, None);
        assert!(r.intent().is_idle());
    }

    #[test]
    fn test_mouse_drag_commits_on_release() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();

        r.handle(PointerEvent::mouse_press(MouseButton::Left, Point::new(120.0, 120.0), 4, bounds()), &guard, now);
        let update = r.handle(PointerEvent::Move { position: Point::new(200.0, 150.0) }, &guard, now);
        assert_eq!(
            update,
            Some(GestureIntent::Update {
                file_id: 4,
                live_point: Point::new(200.0, 150.0)
            })
        );

        let end = r.handle(PointerEvent::Release { position: Point::new(210.0, 160.0) }, &guard, now);
        assert_eq!(
            end,
            Some(GestureIntent::End {
                file_id: 4,
                final_point: Point::new(210.0, 160.0)
            })
        );
        assert!(r.intent().is_idle());
    }

    #[test]
    fn test_touch_within_threshold_is_tap() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();
        press_touch(&mut r, &guard, now, Point::new(120.0, 120.0));
        assert!(matches!(r.intent(), DragIntent::PendingConfirmation { .. }));

        // Wander around but never further than 10px from the press point.
        for p in [Point::new(126.0, 120.0), Point::new(120.0, 130.0), Point::new(127.0, 127.0)] {
            assert_eq!(r.handle(PointerEvent::Move { position: p }, &guard, now), None);
        }
        let out = r.handle(PointerEvent::Release { position: Point::new(127.0, 127.0) }, &guard, now);
        assert_eq!(out, None);
        assert!(r.intent().is_idle());
    }

    #[test]
    fn test_touch_exactly_at_threshold_stays_pending() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();
        press_touch(&mut r, &guard, now, Point::new(120.0, 120.0));

        assert_eq!(r.handle(PointerEvent::Move { position: Point::new(130.0, 120.0) }, &guard, now), None);
        assert!(matches!(r.intent(), DragIntent::PendingConfirmation { .. }));
    }

    #[test]
    fn test_touch_promotion_uses_captured_bounds() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();
        press_touch(&mut r, &guard, now, Point::new(115.0, 118.0));

        let mut begins = 0;
        let mut offset = None;
        for x in [118.0, 122.0, 130.0, 140.0, 160.0] {
            if let Some(GestureIntent::Begin { pointer_offset, .. }) =
                r.handle(PointerEvent::Move { position: Point::new(x, 118.0) }, &guard, now)
            {
                begins += 1;
                offset = Some(pointer_offset);
            }
        }

        assert_eq!(begins, 1);
        // Offset from the press point to the center of the bounds captured at press.
        assert_eq!(offset, Some(Vec2::new(-5.0, -2.0)));
        match r.intent() {
            DragIntent::Active { live_point, pointer_offset, .. } => {
                assert_eq!(live_point, Point::new(160.0, 118.0));
                assert_eq!(pointer_offset, Vec2::new(-5.0, -2.0));
            }
            other => panic!("Expected active drag, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_touch_does_not_arm() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let out = r.handle(
            PointerEvent::Press {
                source: InputSource::Touch { touches: 2 },
                position: Point::new(120.0, 120.0),
                target: Some(PressTarget { file_id: 1, bounds: bounds() }),
            },
            &guard,
            Instant::now(),
        );
        assert_eq!(out, None);
        assert!(r.intent().is_idle());
    }

    #[test]
    fn test_press_suppressed_after_surface_close() {
        let t0 = Instant::now();
        let mut guard = SurfaceGuard::new();
        guard.surface_opened(SurfaceId::FileMenu);
        guard.surface_closed(SurfaceId::FileMenu, t0);

        let mut r = GestureRecognizer::new();
        for ms in [0, 50, 199] {
            let now = t0 + Duration::from_millis(ms);
            r.handle(PointerEvent::mouse_press(MouseButton::Left, Point::new(120.0, 120.0), 1, bounds()), &guard, now);
            press_touch(&mut r, &guard, now, Point::new(120.0, 120.0));
            assert!(r.intent().is_idle());
        }

        let later = t0 + Duration::from_millis(250);
        r.handle(PointerEvent::mouse_press(MouseButton::Left, Point::new(120.0, 120.0), 1, bounds()), &guard, later);
        assert!(r.intent().is_active());
    }

    #[test]
    fn test_press_suppressed_while_surface_open() {
        let mut guard = SurfaceGuard::new();
        guard.surface_opened(SurfaceId::UploadDialog);
        let mut r = GestureRecognizer::new();
        r.handle(
            PointerEvent::mouse_press(MouseButton::Left, Point::new(120.0, 120.0), 1, bounds()),
            &guard,
            Instant::now(),
        );
        assert!(r.intent().is_idle());
    }

    #[test]
    fn test_release_right_after_close_cancels() {
        let t0 = Instant::now();
        let mut guard = SurfaceGuard::new();
        let mut r = GestureRecognizer::new();
        r.handle(PointerEvent::mouse_press(MouseButton::Left, Point::new(120.0, 120.0), 2, bounds()), &guard, t0);

        let closed = t0 + Duration::from_millis(500);
        guard.surface_closed(SurfaceId::CanvasMenu, closed);
        let out = r.handle(PointerEvent::Release { position: Point::new(300.0, 300.0) }, &guard, closed);

        assert_eq!(out, Some(GestureIntent::Cancel { file_id: 2 }));
        assert!(r.intent().is_idle());
    }

    #[test]
    fn test_second_press_ignored_while_dragging() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();
        r.handle(PointerEvent::mouse_press(MouseButton::Left, Point::new(120.0, 120.0), 1, bounds()), &guard, now);

        let out = r.handle(PointerEvent::mouse_press(MouseButton::Left, Point::new(10.0, 10.0), 2, bounds()), &guard, now);
        assert_eq!(out, None);
        assert_eq!(r.intent().file_id(), Some(1));

        let mut touch = GestureRecognizer::new();
        press_touch(&mut touch, &guard, now, Point::new(120.0, 120.0));
        touch.handle(PointerEvent::touch_press(Point::new(0.0, 0.0), 9, bounds()), &guard, now);
        assert_eq!(touch.intent().file_id(), Some(1));
    }

    #[test]
    fn test_cancel_event() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        let now = Instant::now();
        r.handle(PointerEvent::mouse_press(MouseButton::Left, Point::new(120.0, 120.0), 6, bounds()), &guard, now);

        assert_eq!(r.handle(PointerEvent::Cancel, &guard, now), Some(GestureIntent::Cancel { file_id: 6 }));
        assert_eq!(r.handle(PointerEvent::Cancel, &guard, now), None);
    }

    #[test]
    fn test_move_while_idle_is_ignored() {
        let mut r = GestureRecognizer::new();
        let guard = SurfaceGuard::new();
        assert_eq!(
            r.handle(PointerEvent::Move { position: Point::new(1.0, 1.0) }, &guard, Instant::now()),
            None
        );
        assert!(r.intent().is_idle());
    }
}
