//! CLI components.

pub mod commands;
pub mod runner;

pub use commands::{parse_command, parse_context_arg, Command, HELP_TEXT};
pub use runner::{run_interactive, run_single_prompt};
