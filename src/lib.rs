//! copilot-chat
//!
//! Terminal client for a dashboard copilot that talks JSON over a
//! WebSocket.
//!
//! ## Main Components
//!
//! - [`chat`] - Message model, the streaming log fold, request dispatch and
//!   the [`ChatSession`] container
//! - [`transport`] - WebSocket transport and the [`Transport`] seam
//! - [`messaging`] - Wire envelopes, the log event bus and the terminal renderer
//! - [`config`] - Configuration file and XDG paths
//! - [`cli`] - REPL commands and the interactive / single prompt runners
//!
//! ## Quick Start
//!
//! ```ignore
//! use copilot_chat::{connect, Action, ChatSession, Handshake};
//!
//! let (channel, mut events) = connect("ws://localhost:8000/copilot/ws", &Handshake::new("maria")).await?;
//! let mut session = ChatSession::new(channel);
//! session.submit(Action::StreamChat, "Why did revenue dip in March?")?;
//! while let Some(TransportEvent::Frame(text)) = events.recv().await {
//!     session.receive_frame(&text);
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod config;
pub mod messaging;
pub mod transport;

pub use chat::{
    build_request, Action, AdditionalType, ChatMessage, ChatSession, DispatchError, FoldOutcome,
    LogSnapshot, MessageLog, Props, Role,
};
pub use config::{ChatConfig, ChatView, ConfigError};
pub use messaging::{Handshake, LogBus, LogChange, LogEvent, TerminalRenderer};
pub use transport::{connect, ReadyState, Transport, TransportError, TransportEvent, WsChannel};
