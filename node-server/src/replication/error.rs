use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("sync batch of {size} entries exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("replication is disabled")]
    Disabled,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ReplicationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::EntryNotFound(id) => Self::NotFound(format!("Log entry {id}")),
            other => Self::Storage(other),
        }
    }
}

pub type ReplicationResult<T> = Result<T, ReplicationError>;

impl From<ReplicationError> for AppError {
    fn from(err: ReplicationError) -> Self {
        match err {
            ReplicationError::NotFound(what) => {
                AppError::with_message(ErrorCode::LogEntryNotFound, format!("{what} not found"))
            }
            ReplicationError::Validation(msg) => {
                AppError::with_message(ErrorCode::SyncBatchInvalid, msg)
            }
            ReplicationError::BatchTooLarge { size, max } => {
                AppError::new(ErrorCode::SyncBatchTooLarge)
                    .with_detail("size", size)
                    .with_detail("max_entries", max)
            }
            ReplicationError::Disabled => AppError::new(ErrorCode::ReplicationDisabled),
            ReplicationError::Storage(e) => AppError::database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_unknown_entry_maps_to_not_found() {
        let err: ReplicationError = StorageError::EntryNotFound(5).into();
        assert!(matches!(err, ReplicationError::NotFound(ref what) if what == "Log entry 5"));

        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::LogEntryNotFound);
        assert_eq!(app.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_batch_too_large_details() {
        let app: AppError = ReplicationError::BatchTooLarge {
            size: 1001,
            max: 1000,
        }
        .into();
        assert_eq!(app.code, ErrorCode::SyncBatchTooLarge);
        assert_eq!(app.details.unwrap().get("size").unwrap(), 1001);
    }

    #[test]
    fn test_disabled_is_bad_request() {
        let app: AppError = ReplicationError::Disabled.into();
        assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.message, "Replication is disabled");
    }
}
