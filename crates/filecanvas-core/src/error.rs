//! Error types.

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors surfaced by canvas operations.
///
/// Only user-initiated actions return these. Background reconciliation
/// (position confirmation, reconnects, realtime parsing) logs and moves on.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// No server address is configured; the networked feature is disabled.
    #[error("No server configured")]
    NotConfigured,
    /// The server answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// The request never got a usable answer.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A realtime payload could not be understood.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Input rejected locally before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The requested file is not on the canvas.
    #[error("File not found: {0}")]
    NotFound(u64),
}

impl CanvasError {
    /// Whether this is a transport-level failure (network or non-2xx).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Http(_) | Self::Io(_))
    }
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;
