//! Wire types for the copilot WebSocket protocol.
//!
//! ## Frames
//!
//! Client to server, once on open:
//! ```json
//! {"user_id": "analyst@example.com"}
//! ```
//!
//! Client to server, per request:
//! ```json
//! {"message_history": [{"role": "user", "content": "..."}], "request": {...}}
//! ```
//!
//! Server to client:
//! ```json
//! {"response": {"role": "assistant", "action": "stream_chat", "props": {"part": 1}, "content": "..."}}
//! ```
//! Any other server frame is ignored.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chat::{ChatMessage, Role};

/// First frame sent after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub user_id: String,
}

impl Handshake {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// One prior turn, as replayed to the backend with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub message_history: Vec<HistoryEntry>,
    pub request: ChatMessage,
}

impl OutboundEnvelope {
    /// Build a request frame replaying every prior log entry.
    pub fn new<'a>(
        history: impl IntoIterator<Item = &'a ChatMessage>,
        request: ChatMessage,
    ) -> Self {
        Self {
            message_history: history.into_iter().map(HistoryEntry::from).collect(),
            request,
        }
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Server frame carrying a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub response: ChatMessage,
}

impl InboundEnvelope {
    /// Decode a text frame. Anything that is not a well-formed
    /// `{"response": ChatMessage}` object yields `None`.
    pub fn decode(frame: &str) -> Option<Self> {
        match serde_json::from_str::<InboundEnvelope>(frame) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                debug!(error = %e, "Ignoring unrecognized frame");
                None
            }
        }
    }
}
