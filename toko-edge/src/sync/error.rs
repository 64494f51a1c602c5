use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use super::storage::QueueStoreError;

/// Sync queue errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transient, the item stays queued
    #[error("Replay failed: {0}")]
    Replay(String),

    /// Transient, the backend did not answer in time
    #[error("Replay timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Storage(#[from] QueueStoreError),

    #[error("Device is offline")]
    Offline,

    #[error("No pending operations to sync")]
    NothingToDrain,

    #[error("A drain is already running")]
    AlreadyDraining,

    #[error("Remote client error: {0}")]
    Client(String),
}

pub type SyncResult<T> = Result<T, SyncError>;

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::Replay(_) => AppError::with_message(ErrorCode::SyncReplayFailed, message),
            SyncError::Timeout(_) => AppError::with_message(ErrorCode::TimeoutError, message),
            SyncError::Offline => AppError::with_message(ErrorCode::SyncOffline, message),
            SyncError::NothingToDrain | SyncError::AlreadyDraining => {
                AppError::with_message(ErrorCode::SyncNothingPending, message)
            }
            SyncError::Storage(QueueStoreError::Serialization(_)) => {
                tracing::error!(error = %message, "Sync queue data is unreadable");
                AppError::with_message(ErrorCode::StorageCorrupted, message)
            }
            SyncError::Storage(_) => {
                tracing::error!(error = %message, "Sync queue storage error");
                AppError::database(message)
            }
            SyncError::Client(_) => AppError::network(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_transient() {
        let err: AppError = SyncError::Timeout("no answer after 30s".to_string()).into();
        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert!(err.code.is_transient());
    }

    #[test]
    fn test_unreadable_queue_reports_corruption() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = SyncError::Storage(QueueStoreError::Serialization(bad)).into();
        assert_eq!(err.code, ErrorCode::StorageCorrupted);

        let other: AppError =
            SyncError::Storage(QueueStoreError::Unavailable("disk".to_string())).into();
        assert_eq!(other.code, ErrorCode::DatabaseError);
    }
}
