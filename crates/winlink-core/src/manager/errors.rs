use crate::errors::WinlinkError;
use crate::registry::RegistryError;
use crate::store::StoreError;

use super::state::LifecycleState;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WinlinkError for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            SyncError::InvalidState { .. } => "SYNC_INVALID_STATE",
            SyncError::Registry(e) => e.error_code(),
            SyncError::Store(e) => e.error_code(),
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            SyncError::InvalidState { .. } => true,
            SyncError::Registry(e) => e.is_user_error(),
            SyncError::Store(e) => e.is_user_error(),
        }
    }
}
