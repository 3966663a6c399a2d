//! Turning user intents into request messages.

use serde_json::Value;
use thiserror::Error;

use super::message::{Action, AdditionalType, ChatMessage, Props};

pub const DATASET_ID_KEY: &str = "dataset_id";
pub const ENTITY_ID_KEY: &str = "entity_id";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Build the user-role request for `action`.
///
/// `input` is the composer text and is used verbatim for `chat` and
/// `stream_chat`. `load_context` ignores it and requires `props` with
/// `dataset_id` and `entity_id`.
pub fn build_request(
    action: Action,
    props: Option<&Props>,
    input: &str,
) -> Result<ChatMessage, DispatchError> {
    match action {
        Action::Chat | Action::StreamChat => Ok(ChatMessage::user(action, input)),
        Action::LoadContext => {
            let props = props.ok_or_else(|| {
                DispatchError::InvalidArgument("load_context requires props".to_string())
            })?;
            let dataset_id = required(props, DATASET_ID_KEY)?;
            let entity_id = required(props, ENTITY_ID_KEY)?;
            let content = context_prompt(entity_id);

            let mut request_props = Props::new();
            request_props.insert(DATASET_ID_KEY.to_string(), dataset_id.clone());
            request_props.insert(ENTITY_ID_KEY.to_string(), entity_id.clone());

            Ok(ChatMessage::user(Action::LoadContext, content)
                .with_props(request_props)
                .with_additional_type(AdditionalType::Trend))
        }
        Action::LoadingResponse => Err(DispatchError::InvalidArgument(
            "loading_response is not a request action".to_string(),
        )),
    }
}

/// Props for a `load_context` request.
pub fn context_props(dataset_id: impl Into<Value>, entity_id: impl Into<Value>) -> Props {
    let mut props = Props::new();
    props.insert(DATASET_ID_KEY.to_string(), dataset_id.into());
    props.insert(ENTITY_ID_KEY.to_string(), entity_id.into());
    props
}

fn required<'a>(props: &'a Props, key: &str) -> Result<&'a Value, DispatchError> {
    match props.get(key) {
        Some(Value::Null) | None => Err(DispatchError::InvalidArgument(format!(
            "load_context props missing `{}`",
            key
        ))),
        Some(value) => Ok(value),
    }
}

fn context_prompt(entity_id: &Value) -> String {
    let entity = match entity_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("Load the trend context for entity {}", entity)
}
