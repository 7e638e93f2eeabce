//! Realtime wire protocol.
//!
//! Every frame is a JSON object `{"type": ..., "payload": ...}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::file::{FileEntry, FileId, MovedPayload, RemovedPayload};

pub const TYPE_SUBSCRIBE: &str = "file:subscribe";
pub const TYPE_NEW: &str = "file:new";
pub const TYPE_DELETED: &str = "file:deleted";
pub const TYPE_MOVED: &str = "file:moved";

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Ask the server to start forwarding file deltas.
    #[serde(rename = "file:subscribe")]
    Subscribe,
}

impl ClientMessage {
    pub fn to_json(&self) -> String {
        // A unit-variant tagged enum always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"type":"{TYPE_SUBSCRIBE}"}}"#))
    }
}

/// Raw frame before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<Value>,
}

/// File-set deltas pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Added(FileEntry),
    Removed { id: FileId },
    Moved { id: FileId, x: f64, y: f64 },
}

/// A realtime frame that could not be turned into a [`ServerEvent`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Unrecognized message type: {0}")]
    UnknownType(String),
    #[error("Message {kind} has no payload")]
    MissingPayload { kind: String },
    #[error("Invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ServerEvent {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        match envelope.kind.as_str() {
            TYPE_NEW => Ok(Self::Added(payload(&envelope)?)),
            TYPE_DELETED => {
                let RemovedPayload { id } = payload(&envelope)?;
                Ok(Self::Removed { id })
            }
            TYPE_MOVED => {
                let MovedPayload { id, x, y } = payload(&envelope)?;
                Ok(Self::Moved { id, x, y })
            }
            _ => Err(ProtocolError::UnknownType(envelope.kind)),
        }
    }

    /// Id of the file this event concerns.
    pub fn file_id(&self) -> FileId {
        match self {
            Self::Added(entry) => entry.id,
            Self::Removed { id } | Self::Moved { id, .. } => *id,
        }
    }
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, ProtocolError> {
    let value = envelope.payload.clone().ok_or_else(|| ProtocolError::MissingPayload {
        kind: envelope.kind.clone(),
    })?;
    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload {
        kind: envelope.kind.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_serialize() {
        assert_eq!(ClientMessage::Subscribe.to_json(), r#"{"type":"file:subscribe"}"#);
    }

    #[test]
    fn test_parse_new() {
        let json = r#"{"type":"file:new","payload":{"id":5,"originalName":"a.png","mimeType":"image/png","size":3,"x":30,"y":40,"hasPickupCode":false,"createdAt":"2024-05-01T12:00:00Z"},"timestamp":1714564800000}"#;
        match ServerEvent::parse(json).unwrap() {
            ServerEvent::Added(entry) => {
                assert_eq!(entry.id, 5);
                assert_eq!(entry.position(), (30.0, 40.0));
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_deleted_and_moved() {
        let deleted = ServerEvent::parse(r#"{"type":"file:deleted","payload":{"id":9}}"#).unwrap();
        assert_eq!(deleted, ServerEvent::Removed { id: 9 });

        let moved = ServerEvent::parse(r#"{"type":"file:moved","payload":{"id":9,"x":12.5,"y":80}}"#).unwrap();
        assert_eq!(moved, ServerEvent::Moved { id: 9, x: 12.5, y: 80.0 });
        assert_eq!(moved.file_id(), 9);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(ServerEvent::parse("not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(ServerEvent::parse(r#"{"payload":{}}"#), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_unknown_type() {
        match ServerEvent::parse(r#"{"type":"file:renamed","payload":{"id":1}}"#) {
            Err(ProtocolError::UnknownType(kind)) => assert_eq!(kind, "file:renamed"),
            other => panic!("Expected unknown type, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_payload() {
        assert!(matches!(
            ServerEvent::parse(r#"{"type":"file:moved","payload":{"id":"x"}}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
        assert!(matches!(
            ServerEvent::parse(r#"{"type":"file:deleted"}"#),
            Err(ProtocolError::MissingPayload { .. })
        ));
    }
}
