//! FileCanvas Core Library
//!
//! Platform-agnostic state and logic for a shared canvas of files: pointer
//! gestures, the local file store, realtime deltas and the REST client.

pub mod api;
pub mod controller;
pub mod error;
pub mod file;
pub mod gesture;
pub mod input;
pub mod position_sync;
pub mod protocol;
pub mod realtime;
pub mod settings;
pub mod store;
pub mod surface;
pub mod viewport;

pub use api::{FileApi, HttpFileApi, PickupCode, ProgressFn, UploadRequest};
pub use controller::{CanvasController, ControllerEvent, LocalIntent, AUTO_OPEN_DELAY};
pub use error::{CanvasError, CanvasResult};
pub use file::{FileEntry, FileId};
pub use gesture::{DragIntent, GestureIntent, GestureRecognizer, DRAG_THRESHOLD};
pub use input::{InputSource, MouseButton, PointerEvent, PressTarget};
pub use position_sync::{PositionSync, SyncOutcome};
pub use protocol::{ClientMessage, ProtocolError, ServerEvent};
pub use realtime::{ConnectionState, NativeWebSocket, RealtimeChannel, Transport, TransportEvent, RECONNECT_DELAY};
pub use settings::{share_url, DeepLink, Settings};
pub use store::FileStore;
pub use surface::{SurfaceGuard, SurfaceId, DISMISS_SUPPRESSION};
pub use viewport::Viewport;
