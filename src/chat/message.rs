//! Chat message types.
//!
//! Defines the message record exchanged with the copilot backend and kept in
//! the session's [`MessageLog`](super::MessageLog).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key/value payload attached to a message (chart spec, entity id, part index).
pub type Props = serde_json::Map<String, Value>;

/// Key inside [`Props`] carrying the fragment index of a streamed reply.
pub const PART_KEY: &str = "part";

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// What a message asks for or carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Chat,
    LoadContext,
    LoadingResponse,
    StreamChat,
}

/// Rendering hint for assistant replies that carry structured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdditionalType {
    Chart,
    Metric,
    Trend,
}

impl AdditionalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdditionalType::Chart => "chart",
            AdditionalType::Metric => "metric",
            AdditionalType::Trend => "trend",
        }
    }
}

/// A single chat message
///
/// Unknown `role`, `action` or `additional_type` tags fail to decode, so a
/// frame carrying one never reaches the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub action: Action,
    #[serde(default)]
    pub additional_type: Option<AdditionalType>,
    #[serde(default)]
    pub channel: Option<u32>,
    #[serde(default)]
    pub props: Option<Props>,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, action: Action, content: impl Into<String>) -> Self {
        Self {
            role,
            action,
            additional_type: None,
            channel: Some(0),
            props: None,
            content: content.into(),
        }
    }

    pub fn user(action: Action, content: impl Into<String>) -> Self {
        Self::new(Role::User, action, content)
    }

    pub fn assistant(action: Action, content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, action, content)
    }

    /// Placeholder shown while waiting for the first reply.
    pub fn loading() -> Self {
        Self::assistant(Action::LoadingResponse, "")
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_additional_type(mut self, kind: AdditionalType) -> Self {
        self.additional_type = Some(kind);
        self
    }

    pub fn is_loading(&self) -> bool {
        self.action == Action::LoadingResponse
    }

    /// True for an assistant message that streamed fragments can extend.
    pub fn is_streaming_reply(&self) -> bool {
        self.role == Role::Assistant && self.action == Action::StreamChat
    }

    /// Fragment index recorded in `props.part`, if any.
    pub fn part(&self) -> Option<&Value> {
        self.props.as_ref().and_then(|props| props.get(PART_KEY))
    }

    pub fn append_content(&mut self, text: &str) {
        self.content.push_str(text);
    }
}
