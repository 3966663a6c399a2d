//! Slash command parsing for the REPL.

use crate::chat::Action;

/// One parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send `text` with `action`.
    Send { action: Action, text: String },
    /// Load a dataset entity into the backend's context.
    LoadContext {
        dataset_id: String,
        entity_id: String,
    },
    History,
    Help,
    Quit,
    /// Blank line; nothing to do.
    Empty,
    /// Malformed or unknown command, with a hint for the user.
    Invalid(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  <text>                          ask the copilot (streaming unless --no-stream)
  /chat <text>                    ask and wait for a single reply
  /stream <text>                  ask with a streamed reply
  /context <dataset_id> <entity>  load an entity into the conversation
  /history                        print the conversation so far
  /help                           show this help
  /quit, /exit                    leave";

/// Parse one line of input. Plain text is sent with `default_action`.
pub fn parse_command(line: &str, default_action: Action) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send {
            action: default_action,
            text: line.to_string(),
        };
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "chat" | "stream" if args.is_empty() => {
            Command::Invalid(format!("Usage: /{} <text>", name))
        }
        "chat" => Command::Send {
            action: Action::Chat,
            text: args.to_string(),
        },
        "stream" => Command::Send {
            action: Action::StreamChat,
            text: args.to_string(),
        },
        "context" => {
            let parts: Vec<&str> = args.split_whitespace().collect();
            match parts.as_slice() {
                [dataset_id, entity_id] => Command::LoadContext {
                    dataset_id: dataset_id.to_string(),
                    entity_id: entity_id.to_string(),
                },
                _ => Command::Invalid("Usage: /context <dataset_id> <entity_id>".to_string()),
            }
        }
        "history" => Command::History,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Invalid(format!("Unknown command: /{}. Type /help", name)),
    }
}

/// Parse a `DATASET:ENTITY` pair for `--context`.
pub fn parse_context_arg(value: &str) -> Result<(String, String), String> {
    match value.split_once(':') {
        Some((dataset, entity)) if !dataset.is_empty() && !entity.is_empty() => {
            Ok((dataset.to_string(), entity.to_string()))
        }
        _ => Err(format!("expected DATASET:ENTITY, got '{}'", value)),
    }
}
