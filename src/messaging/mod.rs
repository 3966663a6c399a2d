//! Messaging for copilot-chat.
//!
//! Two directions meet here:
//!
//! - **Wire**: [`InboundEnvelope`], [`OutboundEnvelope`] and [`Handshake`]
//!   are the JSON frames exchanged with the backend.
//! - **Views**: a [`ChatSession`](crate::chat::ChatSession) publishes a
//!   [`LogEvent`] on its [`LogBus`] after every change, and renderers such
//!   as [`TerminalRenderer`] subscribe.
//!
//! ```text
//!   WebSocket ──frame──▶ ChatSession ──LogEvent──▶ LogBus ──▶ TerminalRenderer
//!       ▲                    │
//!       └──OutboundEnvelope──┘
//! ```

mod bus;
mod renderer;
mod types;

pub use bus::{BusError, LogBus, LogChange, LogEvent, LogReceiver, LogSender};
pub use renderer::TerminalRenderer;
pub use types::{Handshake, HistoryEntry, InboundEnvelope, OutboundEnvelope};
