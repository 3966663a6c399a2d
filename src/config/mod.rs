//! Configuration management.

mod settings;
mod xdg;

pub use settings::{ChatConfig, ChatView, ConfigError, ConfigOverrides};
pub use xdg::XdgDirs;
