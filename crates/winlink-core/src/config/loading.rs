//! Configuration loading and merging.
//!
//! Later sources override earlier ones:
//! 1. **Hardcoded defaults**
//! 2. **User config** - `<winlink_dir>/config.toml`
//! 3. **Project config** - `./.winlink/config.toml`
//! 4. **CLI arguments** - applied by the caller

use crate::config::types::{Config, PollConfig, StoreConfig, WinlinkConfig};
use crate::config::validation::validate_config;
use crate::errors::ConfigError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load and merge the user and project config files, then validate.
///
/// # Errors
///
/// Missing files are skipped. Unreadable or unparsable files and an
/// invalid merged result are errors.
pub fn load_hierarchy(runtime: &Config) -> Result<WinlinkConfig, ConfigError> {
    let mut config = WinlinkConfig::default();

    match load_config_file(&runtime.user_config_path()) {
        Ok(user_config) => config = merge_configs(config, user_config),
        Err(ConfigError::ConfigNotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    let project_path = std::env::current_dir()?
        .join(".winlink")
        .join("config.toml");
    match load_config_file(&project_path) {
        Ok(project_config) => config = merge_configs(config, project_config),
        Err(ConfigError::ConfigNotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    validate_config(&config)?;
    Ok(config)
}

/// Load a single configuration file.
pub fn load_config_file(path: &Path) -> Result<WinlinkConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        Err(e) => return Err(ConfigError::IoError { source: e }),
    };

    let config = toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        message: format!("'{}': {}", path.display(), e),
    })?;
    debug!(event = "core.config.file_loaded", path = %path.display());
    Ok(config)
}

/// Merge two configurations, field by field; set fields of
/// `override_config` win.
pub fn merge_configs(base: WinlinkConfig, override_config: WinlinkConfig) -> WinlinkConfig {
    WinlinkConfig {
        store: StoreConfig {
            dir: override_config.store.dir.or(base.store.dir),
            key: override_config.store.key.or(base.store.key),
        },
        poll: PollConfig {
            frame_interval_ms: override_config
                .poll
                .frame_interval_ms
                .or(base.poll.frame_interval_ms),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let err = load_config_file(&temp.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_partial_config_parses() {
        let config: WinlinkConfig = toml::from_str(
            r#"
[poll]
frame_interval_ms = 50
"#,
        )
        .unwrap();
        assert_eq!(config.poll.frame_interval_ms(), 50);
        assert_eq!(config.store.key(), "windows");
        assert_eq!(config.store.dir, None);
    }

    #[test]
    fn test_user_then_project_merge() {
        let temp = tempfile::tempdir().unwrap();
        let user_path = temp.path().join("user.toml");
        let project_path = temp.path().join("project.toml");
        fs::write(
            &user_path,
            r#"
[store]
dir = "/srv/winlink"
key = "desk"

[poll]
frame_interval_ms = 40
"#,
        )
        .unwrap();
        fs::write(
            &project_path,
            r#"
[store]
key = "demo"
"#,
        )
        .unwrap();

        let user = load_config_file(&user_path).unwrap();
        let project = load_config_file(&project_path).unwrap();
        let merged = merge_configs(user, project);

        assert_eq!(merged.store.dir, Some(PathBuf::from("/srv/winlink")));
        assert_eq!(merged.store.key(), "demo");
        assert_eq!(merged.poll.frame_interval_ms(), 40);
    }

    #[test]
    fn test_load_hierarchy_reads_user_config() {
        let temp = tempfile::tempdir().unwrap();
        let runtime = Config {
            winlink_dir: temp.path().to_path_buf(),
        };
        fs::write(
            runtime.user_config_path(),
            "[poll]\nframe_interval_ms = 25\n",
        )
        .unwrap();

        // Tests run from the crate directory, which has no ./.winlink
        let config = load_hierarchy(&runtime).unwrap();
        assert_eq!(config.poll.frame_interval_ms(), 25);
    }

    #[test]
    fn test_load_hierarchy_rejects_invalid_values() {
        let temp = tempfile::tempdir().unwrap();
        let runtime = Config {
            winlink_dir: temp.path().to_path_buf(),
        };
        fs::write(runtime.user_config_path(), "[poll]\nframe_interval_ms = 0\n").unwrap();

        let err = load_hierarchy(&runtime).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
    }
}
