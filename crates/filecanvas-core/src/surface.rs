//! Registry of modal and menu surfaces that can swallow canvas input.
//!
//! Every dialog or menu reports its open/close transitions here. The guard
//! answers whether a press on the canvas should be ignored, either because a
//! surface is still open or because one closed a moment ago and the press is
//! really the dismissal click.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// How long after a surface closes canvas presses stay suppressed.
pub const DISMISS_SUPPRESSION: Duration = Duration::from_millis(200);

/// Identifies one modal or menu surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    /// Context menu on a file icon.
    FileMenu,
    /// Context menu on empty canvas.
    CanvasMenu,
    /// Upload confirmation dialog.
    UploadDialog,
    /// Pickup code entry dialog.
    PickupCodeDialog,
    /// Delete confirmation dialog.
    ConfirmDialog,
    /// Settings dialog.
    SettingsDialog,
    /// Any other surface, keyed by a caller-chosen number.
    Other(u32),
}

/// Tracks open surfaces and the last close time.
#[derive(Debug, Clone, Default)]
pub struct SurfaceGuard {
    open: HashSet<SurfaceId>,
    last_close: Option<Instant>,
}

impl SurfaceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface became visible.
    pub fn surface_opened(&mut self, id: SurfaceId) {
        self.open.insert(id);
    }

    /// A surface was dismissed at `now`.
    pub fn surface_closed(&mut self, id: SurfaceId, now: Instant) {
        self.open.remove(&id);
        self.last_close = Some(now);
    }

    /// Whether any surface is currently open.
    pub fn any_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Whether a surface closed within [`DISMISS_SUPPRESSION`] of `now`.
    pub fn recently_closed(&self, now: Instant) -> bool {
        self.last_close
            .is_some_and(|closed| now.saturating_duration_since(closed) < DISMISS_SUPPRESSION)
    }

    /// Whether a canvas press at `now` must be ignored.
    pub fn blocks_input(&self, now: Instant) -> bool {
        self.any_open() || self.recently_closed(now)
    }

    /// Forget all surfaces.
    pub fn reset(&mut self) {
        self.open.clear();
        self.last_close = None;
    }
}
