//! Duplex transport between a chat session and the copilot backend.
//!
//! The session only needs to push text frames out; inbound frames arrive as
//! [`TransportEvent`]s on a channel returned by the concrete connector (see
//! [`websocket::connect`]).
//!
//! Connections are never re-established automatically. When the socket
//! closes, the event channel yields [`TransportEvent::Closed`] and the
//! session is over.

pub mod websocket;

use thiserror::Error;

pub use websocket::{connect, WsChannel};

/// Connection state, numbered like the browser WebSocket constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame from the server.
    Frame(String),
    /// The connection is gone, with a reason when one is known.
    Closed { reason: Option<String> },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Connection closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outbound half of a connection.
///
/// Sends are fire-and-forget: an implementation queues the frame and returns.
pub trait Transport: Send {
    fn ready_state(&self) -> ReadyState;

    fn send_text(&self, text: String) -> Result<(), TransportError>;
}
