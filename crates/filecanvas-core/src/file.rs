//! File entries pinned on the canvas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned file identifier.
pub type FileId = u64;

/// A file pinned at a percentage position on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Unique among live entries, stable for the entry's lifetime.
    pub id: FileId,
    /// Name the server stored the blob under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Name the file was uploaded with.
    pub original_name: String,
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Horizontal position, percent of canvas width.
    pub x: f64,
    /// Vertical position, percent of canvas height.
    pub y: f64,
    /// Whether downloading requires a pickup code.
    #[serde(default)]
    pub has_pickup_code: bool,
    pub created_at: DateTime<Utc>,
}

impl FileEntry {
    /// Create an entry with no pickup code, timestamped now.
    pub fn new(id: FileId, original_name: impl Into<String>, mime_type: impl Into<String>, size: u64, x: f64, y: f64) -> Self {
        Self {
            id,
            filename: None,
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size,
            x,
            y,
            has_pickup_code: false,
            created_at: Utc::now(),
        }
    }

    /// Current position as `(x, y)` percentages.
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Payload of a remote removal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemovedPayload {
    pub id: FileId,
}

/// Payload of a remote or local move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovedPayload {
    pub id: FileId,
    pub x: f64,
    pub y: f64,
}
