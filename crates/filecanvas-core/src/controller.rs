//! Canvas orchestration.
//!
//! The controller is the only writer of the [`FileStore`]. Everything that
//! changes the file set funnels through [`CanvasController::apply_local_intent`]
//! or [`CanvasController::apply_remote_event`], both of which end in the
//! same idempotent store operations. It runs on a single thread: the shell
//! calls [`CanvasController::tick`] from its loop and forwards pointer input
//! as it arrives, passing the current time to both.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kurbo::{Point, Rect};

use crate::api::{FileApi, HttpFileApi, PickupCode, ProgressFn, UploadRequest};
use crate::error::{CanvasError, CanvasResult};
use crate::file::{FileEntry, FileId};
use crate::gesture::{DragIntent, GestureIntent, GestureRecognizer};
use crate::input::PointerEvent;
use crate::position_sync::PositionSync;
use crate::protocol::ServerEvent;
use crate::realtime::{ConnectionState, NativeWebSocket, RealtimeChannel, Transport};
use crate::settings::{share_url, DeepLink, Settings};
use crate::store::FileStore;
use crate::surface::{SurfaceGuard, SurfaceId};
use crate::viewport::Viewport;

/// Delay between the initial load and opening a deep-linked file.
pub const AUTO_OPEN_DELAY: Duration = Duration::from_millis(500);

/// Store changes that originate on this client.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalIntent {
    /// Full list fetched from the server.
    Loaded(Vec<FileEntry>),
    /// Upload confirmed by the server.
    Added(FileEntry),
    /// Drag committed.
    Moved { id: FileId, x: f64, y: f64 },
    /// Deleted or downloaded.
    Removed { id: FileId },
}

/// Things the shell has to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Start downloading `url` and save it as `file_name`.
    OpenFile { id: FileId, file_name: String, url: String },
    /// Ask the user for the file's pickup code, then call
    /// [`CanvasController::open_with_code`].
    PickupCodeRequired {
        id: FileId,
        file_name: String,
        /// Code carried by a deep link, for prefilling.
        suggested_code: Option<String>,
    },
}

/// A deep-linked file waiting for the canvas to settle.
#[derive(Debug, Clone)]
struct ScheduledOpen {
    id: FileId,
    code: Option<String>,
    due: Instant,
}

/// Orchestrates input, realtime deltas and server confirmation over one store.
pub struct CanvasController<T: Transport> {
    settings: Settings,
    store: FileStore,
    gestures: GestureRecognizer,
    surfaces: SurfaceGuard,
    viewport: Viewport,
    channel: RealtimeChannel<T>,
    position_sync: PositionSync,
    api: Arc<dyn FileApi>,
    /// One-shot marker from the startup link: file id and optional code.
    pending_open: Option<(FileId, Option<String>)>,
    scheduled_open: Option<ScheduledOpen>,
    loaded: bool,
    torn_down: bool,
}

impl CanvasController<NativeWebSocket> {
    /// Controller talking to a real server over HTTP and WebSocket.
    pub fn native(settings: Settings, deep_link: DeepLink) -> CanvasResult<Self> {
        let mut settings = settings;
        deep_link.apply_to(&mut settings);
        let api = Arc::new(HttpFileApi::new(settings.clone())?);
        Ok(Self::new(settings, deep_link, api, NativeWebSocket::new()))
    }
}

impl<T: Transport> CanvasController<T> {
    /// Create a controller. The deep link seeds the server address and the
    /// pending auto-open marker.
    pub fn new(settings: Settings, deep_link: DeepLink, api: Arc<dyn FileApi>, transport: T) -> Self {
        let mut settings = settings;
        deep_link.apply_to(&mut settings);
        let channel = RealtimeChannel::new(transport, settings.ws_url());
        Self {
            settings,
            store: FileStore::new(),
            gestures: GestureRecognizer::new(),
            surfaces: SurfaceGuard::new(),
            viewport: Viewport::default(),
            channel,
            position_sync: PositionSync::new(Arc::clone(&api)),
            api,
            pending_open: deep_link.file_id.map(|id| (id, deep_link.code.clone())),
            scheduled_open: None,
            loaded: false,
            torn_down: false,
        }
    }

    // --- Accessors for the presentation layer ---

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Live files, newest first.
    pub fn files(&self) -> &[FileEntry] {
        self.store.list()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn drag_intent(&self) -> DragIntent {
        self.gestures.intent()
    }

    /// Render position of the dragged icon relative to the canvas origin.
    pub fn drag_position(&self) -> Option<Point> {
        self.viewport.drag_position(&self.gestures.intent())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Whether live updates are configured at all.
    pub fn realtime_enabled(&self) -> bool {
        self.channel.is_enabled()
    }

    /// When the next realtime connection attempt is due, if one is pending.
    pub fn reconnect_due(&self) -> Option<Instant> {
        self.channel.reconnect_due()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn has_pending_open(&self) -> bool {
        self.pending_open.is_some()
    }

    /// Update the canvas bounds in screen coordinates.
    pub fn set_canvas_bounds(&mut self, bounds: Rect) {
        self.viewport = Viewport::new(bounds);
    }

    // --- Surface registration ---

    pub fn surface_opened(&mut self, id: SurfaceId) {
        self.surfaces.surface_opened(id);
    }

    pub fn surface_closed(&mut self, id: SurfaceId, now: Instant) {
        self.surfaces.surface_closed(id, now);
    }

    // --- Store entry points ---

    /// Apply a change made on this client.
    pub fn apply_local_intent(&mut self, intent: LocalIntent) {
        match intent {
            LocalIntent::Loaded(entries) => self.store.replace_all(entries),
            LocalIntent::Added(entry) => {
                self.store.apply_add(entry);
            }
            LocalIntent::Moved { id, x, y } => {
                self.store.apply_move(id, x, y);
            }
            LocalIntent::Removed { id } => {
                self.store.apply_remove(id);
            }
        }
    }

    /// Apply a delta pushed by the server. A move for a file that is being
    /// dragged here still lands; the last one applied wins.
    pub fn apply_remote_event(&mut self, event: ServerEvent) {
        log::debug!("Remote event for file {}", event.file_id());
        match event {
            ServerEvent::Added(entry) => {
                self.store.apply_add(entry);
            }
            ServerEvent::Removed { id } => {
                self.store.apply_remove(id);
            }
            ServerEvent::Moved { id, x, y } => {
                self.store.apply_move(id, x, y);
            }
        }
    }

    // --- Lifecycle ---

    /// Start the realtime channel, fetch the file list, then check the
    /// deep-link marker.
    ///
    /// A failed fetch leaves the canvas empty and is returned, but the
    /// channel keeps running and the marker is still consumed.
    pub fn load(&mut self, now: Instant) -> CanvasResult<()> {
        if self.torn_down {
            return Ok(());
        }
        // Connect first so deltas racing the fetch are buffered, not lost.
        self.channel.start(now);
        let result = self.refresh();
        self.loaded = true;
        self.check_deep_link(now);
        result
    }

    /// Re-fetch the full list, replacing local state.
    pub fn refresh(&mut self) -> CanvasResult<()> {
        match self.api.list_files() {
            Ok(files) => {
                self.apply_local_intent(LocalIntent::Loaded(files));
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to fetch file list: {}", e);
                Err(e)
            }
        }
    }

    fn check_deep_link(&mut self, now: Instant) {
        // Consumed exactly once, whether or not the file is here.
        let Some((id, code)) = self.pending_open.take() else {
            return;
        };
        if self.store.contains(id) {
            log::info!("Opening linked file {} shortly", id);
            self.scheduled_open = Some(ScheduledOpen {
                id,
                code,
                due: now + AUTO_OPEN_DELAY,
            });
        } else {
            log::info!("Linked file {} is not on the canvas", id);
        }
    }

    /// Run one loop iteration: apply realtime deltas, collect confirmation
    /// outcomes and fire due timers.
    pub fn tick(&mut self, now: Instant) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        if self.torn_down {
            return events;
        }

        for delta in self.channel.poll(now) {
            self.apply_remote_event(delta);
        }
        self.position_sync.drain();

        if self.scheduled_open.as_ref().is_some_and(|s| now >= s.due) {
            if let Some(scheduled) = self.scheduled_open.take() {
                match self.open(scheduled.id) {
                    Ok(ControllerEvent::PickupCodeRequired { id, file_name, .. }) => {
                        events.push(ControllerEvent::PickupCodeRequired {
                            id,
                            file_name,
                            suggested_code: scheduled.code,
                        });
                    }
                    Ok(event) => events.push(event),
                    Err(e) => log::warn!("Auto-open of file {} failed: {}", scheduled.id, e),
                }
            }
        }
        events
    }

    /// Stop everything: no reconnects, no drag, no pending timers.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.channel.shutdown();
        self.gestures.reset();
        self.surfaces.reset();
        self.scheduled_open = None;
        self.pending_open = None;
    }

    // --- Input ---

    /// Feed pointer input. Returns the gesture intent for the renderer.
    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> Option<GestureIntent> {
        if self.torn_down {
            return None;
        }
        let intent = self.gestures.handle(event, &self.surfaces, now)?;
        if let GestureIntent::End { file_id, final_point } = intent {
            self.commit_move(file_id, final_point);
        }
        Some(intent)
    }

    fn commit_move(&mut self, id: FileId, final_point: Point) {
        if !self.store.contains(id) {
            log::debug!("File {} vanished during drag, dropping move", id);
            return;
        }
        let (x, y) = self.viewport.to_percent(final_point);
        self.apply_local_intent(LocalIntent::Moved { id, x, y });
        if self.settings.is_configured() {
            self.position_sync.confirm(id, x, y);
        }
    }

    /// Number of position confirmations still on the wire.
    pub fn pending_confirmations(&self) -> usize {
        self.position_sync.in_flight()
    }

    // --- Foreground actions ---

    /// Move a file without a gesture, e.g. from the command line.
    pub fn move_file(&mut self, id: FileId, x: f64, y: f64) -> CanvasResult<()> {
        self.require_server()?;
        for (axis, v) in [("x", x), ("y", y)] {
            if !(0.0..=100.0).contains(&v) {
                return Err(CanvasError::Validation(format!("{} must be within 0..=100, got {}", axis, v)));
            }
        }
        if !self.store.contains(id) {
            return Err(CanvasError::NotFound(id));
        }
        self.apply_local_intent(LocalIntent::Moved { id, x, y });
        self.position_sync.confirm(id, x, y);
        Ok(())
    }

    /// Upload a file and pin it where it was dropped.
    pub fn upload(&mut self, request: UploadRequest, progress: Option<ProgressFn>) -> CanvasResult<FileEntry> {
        self.require_server()?;
        request.validate()?;
        let entry = self.api.upload(request, progress)?;
        log::info!("Uploaded {} as file {}", entry.original_name, entry.id);
        self.apply_local_intent(LocalIntent::Added(entry.clone()));
        Ok(entry)
    }

    /// Delete a file. It disappears locally right away; a server failure is
    /// returned but not undone locally.
    pub fn delete(&mut self, id: FileId) -> CanvasResult<()> {
        self.require_server()?;
        self.apply_local_intent(LocalIntent::Removed { id });
        self.api.delete_file(id)
    }

    /// Open (download) a file. Files behind a pickup code need
    /// [`CanvasController::open_with_code`] instead.
    pub fn open(&mut self, id: FileId) -> CanvasResult<ControllerEvent> {
        self.require_server()?;
        let entry = self.store.get(id).ok_or(CanvasError::NotFound(id))?;
        if entry.has_pickup_code {
            return Ok(ControllerEvent::PickupCodeRequired {
                id,
                file_name: entry.original_name.clone(),
                suggested_code: None,
            });
        }
        self.consume(id, None)
    }

    /// Verify a pickup code and open the file.
    pub fn open_with_code(&mut self, id: FileId, code: &str) -> CanvasResult<ControllerEvent> {
        let code = PickupCode::parse(code)?;
        self.require_server()?;
        if !self.store.contains(id) {
            return Err(CanvasError::NotFound(id));
        }
        self.api.verify_pickup_code(id, &code)?;
        self.consume(id, Some(&code))
    }

    /// Downloads are one-shot: the file leaves the canvas once handed out.
    fn consume(&mut self, id: FileId, code: Option<&PickupCode>) -> CanvasResult<ControllerEvent> {
        let url = self.api.download_url(id, code)?;
        let file_name = self
            .store
            .get(id)
            .map(|e| e.original_name.clone())
            .ok_or(CanvasError::NotFound(id))?;
        self.apply_local_intent(LocalIntent::Removed { id });
        Ok(ControllerEvent::OpenFile { id, file_name, url })
    }

    /// Link that opens `id` on this server for whoever follows it.
    pub fn share_url(&self, origin: &str, id: FileId, code: Option<&str>) -> CanvasResult<String> {
        self.require_server()?;
        share_url(origin, self.settings.server.trim(), id, code)
            .map_err(|e| CanvasError::Validation(format!("Invalid origin: {}", e)))
    }

    fn require_server(&self) -> CanvasResult<()> {
        if self.settings.is_configured() {
            Ok(())
        } else {
            Err(CanvasError::NotConfigured)
        }
    }
}
