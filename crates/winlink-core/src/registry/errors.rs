use crate::errors::WinlinkError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Store operation failed: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("Failed to serialize snapshot: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Window is not registered")]
    NotRegistered,
}

impl WinlinkError for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            RegistryError::Store { source } => source.error_code(),
            RegistryError::Serialization { .. } => "REGISTRY_SERIALIZATION_FAILED",
            RegistryError::NotRegistered => "REGISTRY_NOT_REGISTERED",
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            RegistryError::Store { source } => source.is_user_error(),
            RegistryError::Serialization { .. } => false,
            RegistryError::NotRegistered => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_delegates_code() {
        let err = RegistryError::from(StoreError::unavailable("offline"));
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
        assert!(!err.is_user_error());
        assert_eq!(
            err.to_string(),
            "Store operation failed: Shared store unavailable: offline"
        );
    }

    #[test]
    fn test_not_registered() {
        let err = RegistryError::NotRegistered;
        assert_eq!(err.error_code(), "REGISTRY_NOT_REGISTERED");
        assert!(err.is_user_error());
    }
}
