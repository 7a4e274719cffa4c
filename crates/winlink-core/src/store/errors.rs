use std::fmt;
use std::path::PathBuf;

use crate::errors::WinlinkError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Shared store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Invalid store key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("Failed to acquire store lock: {message}")]
    LockFailed { message: String },

    #[error("Failed to watch store: {message}")]
    WatchFailed { message: String },

    #[error("IO operation failed on '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn unavailable(msg: impl fmt::Display) -> Self {
        Self::Unavailable {
            message: msg.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

impl WinlinkError for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "STORE_UNAVAILABLE",
            StoreError::InvalidKey { .. } => "STORE_INVALID_KEY",
            StoreError::LockFailed { .. } => "STORE_LOCK_FAILED",
            StoreError::WatchFailed { .. } => "STORE_WATCH_FAILED",
            StoreError::IoError { .. } => "STORE_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, StoreError::InvalidKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_display() {
        let err = StoreError::InvalidKey {
            key: "../etc".to_string(),
            reason: "only alphanumeric characters, '-' and '_' are allowed",
        };
        assert_eq!(
            err.to_string(),
            "Invalid store key '../etc': only alphanumeric characters, '-' and '_' are allowed"
        );
        assert_eq!(err.error_code(), "STORE_INVALID_KEY");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = StoreError::io(
            "/tmp/store/windows.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/store/windows.json"));
        assert_eq!(err.error_code(), "STORE_IO_ERROR");
        assert!(!err.is_user_error());
    }
}
