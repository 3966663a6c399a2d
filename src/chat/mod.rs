//! Chat state: message model, log, dispatch and the session container.

mod dispatch;
mod log;
mod message;
mod session;

pub use dispatch::{build_request, context_props, DispatchError, DATASET_ID_KEY, ENTITY_ID_KEY};
pub use log::{FoldOutcome, LogSnapshot, MessageLog};
pub use message::{Action, AdditionalType, ChatMessage, Props, Role, PART_KEY};
pub use session::ChatSession;
