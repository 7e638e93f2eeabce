//! Unified pointer events for mouse and touch input.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::file::FileId;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Only the primary button may start a drag; the secondary one belongs
    /// to context menus.
    pub fn is_primary(self) -> bool {
        self == MouseButton::Left
    }
}

/// Physical origin of a pointer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    /// Mouse press with the given button. Unambiguous: a press starts a drag.
    Mouse(MouseButton),
    /// Touch press with the number of fingers currently down.
    Touch { touches: u32 },
}

/// The file icon under the pointer when it was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressTarget {
    pub file_id: FileId,
    /// Visual bounds of the icon in screen coordinates at press time.
    pub bounds: Rect,
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Press {
        source: InputSource,
        position: Point,
        /// `None` when the press landed on empty canvas.
        target: Option<PressTarget>,
    },
    Move {
        position: Point,
    },
    Release {
        position: Point,
    },
    /// The platform interrupted the stream (touchcancel, focus loss).
    Cancel,
}

impl PointerEvent {
    /// Mouse press on a file icon.
    pub fn mouse_press(button: MouseButton, position: Point, file_id: FileId, bounds: Rect) -> Self {
        Self::Press {
            source: InputSource::Mouse(button),
            position,
            target: Some(PressTarget { file_id, bounds }),
        }
    }

    /// Single-finger touch on a file icon.
    pub fn touch_press(position: Point, file_id: FileId, bounds: Rect) -> Self {
        Self::Press {
            source: InputSource::Touch { touches: 1 },
            position,
            target: Some(PressTarget { file_id, bounds }),
        }
    }

    /// Pointer position carried by the event, if any.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Press { position, .. } | Self::Move { position } | Self::Release { position } => Some(*position),
            Self::Cancel => None,
        }
    }
}
