//! XDG Base Directory support.

use std::path::PathBuf;

const APP_DIR: &str = "copilot-chat";

/// XDG directory paths for copilot-chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XdgDirs {
    /// Config directory (~/.config/copilot-chat or XDG_CONFIG_HOME/copilot-chat)
    pub config: PathBuf,
}

impl XdgDirs {
    /// Get XDG directories, respecting environment variables.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::resolve(home, |key| std::env::var(key).ok())
    }

    /// Resolve directories against `home`, reading overrides through `var`.
    pub fn resolve(home: PathBuf, var: impl Fn(&str) -> Option<String>) -> Self {
        let base = |key: &str, fallback: &str| {
            var(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(fallback))
                .join(APP_DIR)
        };

        Self {
            config: base("XDG_CONFIG_HOME", ".config"),
        }
    }

    /// Default config file location.
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
