//! Default values and runtime path resolution.

use crate::config::types::{Config, PollConfig, StoreConfig};
use crate::registry::DEFAULT_WINDOWS_KEY;
use std::path::PathBuf;
use std::time::Duration;

/// Roughly one frame at 60Hz.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Environment variable overriding the base directory.
pub const WINLINK_HOME_ENV: &str = "WINLINK_HOME";

impl Default for Config {
    fn default() -> Self {
        if let Some(dir) = std::env::var_os(WINLINK_HOME_ENV).filter(|v| !v.is_empty()) {
            return Self {
                winlink_dir: PathBuf::from(dir),
            };
        }

        let winlink_dir = match dirs::home_dir() {
            Some(home) => home.join(".winlink"),
            None => {
                eprintln!(
                    "Warning: Could not find home directory. Set HOME or {}. \
                    Using fallback directory.",
                    WINLINK_HOME_ENV
                );
                std::env::temp_dir().join(".winlink")
            }
        };
        Self { winlink_dir }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// User config file inside the base directory.
    pub fn user_config_path(&self) -> PathBuf {
        self.winlink_dir.join("config.toml")
    }

    /// Default directory of the file-backed shared store.
    pub fn default_store_dir(&self) -> PathBuf {
        self.winlink_dir.join("store")
    }

    /// Directory backing the session storage of a named session.
    pub fn session_dir(&self, session: &str) -> PathBuf {
        self.winlink_dir.join("sessions").join(session)
    }
}

impl StoreConfig {
    /// Configured store directory, or the default under `config.winlink_dir`.
    pub fn dir_or_default(&self, config: &Config) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| config.default_store_dir())
    }

    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_WINDOWS_KEY)
    }
}

impl PollConfig {
    pub fn frame_interval_ms(&self) -> u64 {
        self.frame_interval_ms.unwrap_or(DEFAULT_FRAME_INTERVAL_MS)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::WinlinkConfig;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = WinlinkConfig::default();
        assert_eq!(config.store.key(), "windows");
        assert_eq!(config.poll.frame_interval_ms(), 16);
        assert_eq!(config.poll.frame_interval(), Duration::from_millis(16));
    }

    #[test]
    fn test_store_dir_defaults_under_base_dir() {
        let runtime = Config {
            winlink_dir: PathBuf::from("/tmp/wl"),
        };
        let store = StoreConfig::default();
        assert_eq!(store.dir_or_default(&runtime), PathBuf::from("/tmp/wl/store"));

        let store = StoreConfig {
            dir: Some(PathBuf::from("/srv/shared")),
            key: None,
        };
        assert_eq!(store.dir_or_default(&runtime), PathBuf::from("/srv/shared"));
    }

    #[test]
    fn test_runtime_paths() {
        let runtime = Config {
            winlink_dir: PathBuf::from("/tmp/wl"),
        };
        assert_eq!(runtime.user_config_path(), PathBuf::from("/tmp/wl/config.toml"));
        assert_eq!(
            runtime.session_dir("left"),
            PathBuf::from("/tmp/wl/sessions/left")
        );
    }
}
