//! Configuration type definitions.
//!
//! # Example Configuration
//!
//! ```toml
//! [store]
//! dir = "/tmp/winlink-store"
//! key = "windows"
//!
//! [poll]
//! frame_interval_ms = 16
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime paths derived from the environment, not from config files.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for all winlink data (default: ~/.winlink, or `WINLINK_HOME`)
    pub winlink_dir: PathBuf,
}

/// Configuration loaded from TOML config files.
///
/// Loaded from the user config (`<winlink_dir>/config.toml`) and then the
/// project config (`./.winlink/config.toml`); project values win.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WinlinkConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub poll: PollConfig,
}

/// Where the shared store lives.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoreConfig {
    /// Directory of the file-backed store.
    /// Default: `<winlink_dir>/store`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Key holding the window snapshot.
    /// Default: `windows`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PollConfig {
    /// Milliseconds between two `update()` ticks of the host loop.
    /// Default: 16.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_interval_ms: Option<u64>,
}
