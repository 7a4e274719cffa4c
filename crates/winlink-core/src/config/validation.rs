use crate::config::types::WinlinkConfig;
use crate::errors::ConfigError;
use crate::store::file::validate_key;

/// Upper bound for the frame interval; anything slower is not a frame loop.
pub const MAX_FRAME_INTERVAL_MS: u64 = 10_000;

/// Validate the merged configuration.
///
/// # Errors
///
/// Returns `InvalidConfiguration` for an unusable store key or directory,
/// or a frame interval outside `1..=10000` ms.
pub fn validate_config(config: &WinlinkConfig) -> Result<(), ConfigError> {
    if let Some(key) = &config.store.key
        && let Err(e) = validate_key(key)
    {
        return Err(ConfigError::InvalidConfiguration {
            message: format!("store.key: {}", e),
        });
    }

    if let Some(dir) = &config.store.dir
        && dir.as_os_str().is_empty()
    {
        return Err(ConfigError::InvalidConfiguration {
            message: "store.dir cannot be empty".to_string(),
        });
    }

    if let Some(interval) = config.poll.frame_interval_ms
        && !(1..=MAX_FRAME_INTERVAL_MS).contains(&interval)
    {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "poll.frame_interval_ms must be between 1 and {}, got {}",
                MAX_FRAME_INTERVAL_MS, interval
            ),
        });
    }

    Ok(())
}
