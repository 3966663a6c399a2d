//! Client configuration loaded from a JSON file.
//!
//! Resolution order: built-in defaults, then the config file, then
//! overrides from the command line or environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::XdgDirs;
use crate::chat::Action;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid backend host: {0}")]
    InvalidHost(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Which dashboard view's copilot to talk to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ChatView {
    #[default]
    Copilot,
    Trends,
}

impl ChatView {
    /// WebSocket path for this view.
    pub fn path(&self) -> &'static str {
        match self {
            ChatView::Copilot => "/copilot/ws",
            ChatView::Trends => "/trends/copilot/ws",
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Backend base URL, `ws(s)://` or `http(s)://`.
    pub backend_host: String,
    pub view: ChatView,
    /// Identity sent in the handshake frame.
    pub user_id: String,
    /// Send plain input as `stream_chat` rather than `chat`.
    pub stream: bool,
    /// Single prompt mode stops once a reply has started and no frame has
    /// arrived for this long.
    pub idle_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backend_host: "ws://localhost:8000".to_string(),
            view: ChatView::default(),
            user_id: "anonymous".to_string(),
            stream: true,
            idle_timeout_secs: 5,
        }
    }
}

/// Values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_host: Option<String>,
    pub view: Option<ChatView>,
    pub user_id: Option<String>,
    pub stream: Option<bool>,
    pub idle_timeout_secs: Option<u64>,
}

impl ChatConfig {
    /// Load from `path` if given, else from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = XdgDirs::new().config_file();
                if default_path.exists() {
                    Self::load_from_path(&default_path)
                } else {
                    debug!(path = %default_path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config: ChatConfig = serde_json::from_str(&content)?;
        config.expand_env_vars(|key| std::env::var(key).ok())?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.backend_host {
            self.backend_host = host;
        }
        if let Some(view) = overrides.view {
            self.view = view;
        }
        if let Some(user_id) = overrides.user_id {
            self.user_id = user_id;
        }
        if let Some(stream) = overrides.stream {
            self.stream = stream;
        }
        if let Some(secs) = overrides.idle_timeout_secs {
            self.idle_timeout_secs = secs;
        }
    }

    /// Replace `$VAR` and `${VAR}` references in string fields.
    ///
    /// A reference that `var` cannot resolve is an error.
    pub fn expand_env_vars(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        self.backend_host = expand_env_var(&self.backend_host, &var)?;
        self.user_id = expand_env_var(&self.user_id, &var)?;
        Ok(())
    }

    /// Full WebSocket URL for the configured view.
    pub fn ws_url(&self) -> Result<String, ConfigError> {
        let host = self.backend_host.trim().trim_end_matches('/');
        let invalid = || ConfigError::InvalidHost(self.backend_host.clone());

        let (scheme, rest) = host.split_once("://").ok_or_else(invalid)?;
        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            _ => return Err(invalid()),
        };
        if rest.is_empty() {
            return Err(invalid());
        }

        Ok(format!("{}://{}{}", scheme, rest, self.view.path()))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Action used for plain input lines.
    pub fn default_action(&self) -> Action {
        if self.stream {
            Action::StreamChat
        } else {
            Action::Chat
        }
    }
}

fn expand_env_var(
    input: &str,
    var: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    shellexpand::env_with_context(input, |name: &str| {
        var(name).map(Some).ok_or(std::env::VarError::NotPresent)
    })
    .map(|s| s.into_owned())
    .map_err(|e| ConfigError::EnvVarNotFound(e.var_name))
}
