//! # Configuration System
//!
//! Hierarchical TOML configuration.
//!
//! ## Configuration Hierarchy
//!
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.winlink/config.toml` (or `$WINLINK_HOME/config.toml`)
//! 3. **Project config** - `./.winlink/config.toml`
//! 4. **CLI arguments** - Command-line flags (highest priority)
//!
//! ## Usage Example
//!
//! ```toml
//! # ~/.winlink/config.toml
//! [store]
//! dir = "/tmp/winlink-demo"
//!
//! [poll]
//! frame_interval_ms = 33
//! ```
//!
//! ```rust,no_run
//! use winlink_core::config::{Config, WinlinkConfig};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Config::new();
//!     let config = WinlinkConfig::load_hierarchy(&runtime)?;
//!     let store_dir = config.store.dir_or_default(&runtime);
//!     println!("{}", store_dir.display());
//!     Ok(())
//! }
//! ```

pub mod defaults;
pub mod loading;
pub mod types;
pub mod validation;

pub use defaults::{DEFAULT_FRAME_INTERVAL_MS, WINLINK_HOME_ENV};
pub use types::{Config, PollConfig, StoreConfig, WinlinkConfig};
pub use validation::validate_config;

impl WinlinkConfig {
    /// See [`loading::load_hierarchy`].
    pub fn load_hierarchy(runtime: &Config) -> Result<Self, crate::errors::ConfigError> {
        loading::load_hierarchy(runtime)
    }

    /// See [`validation::validate_config`].
    pub fn validate(&self) -> Result<(), crate::errors::ConfigError> {
        validation::validate_config(self)
    }
}
