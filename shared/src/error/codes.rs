//! Error codes returned by a node
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Replication errors
//! - 4xxx: Record errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,

    // ==================== 1xxx: Replication ====================
    /// Replication is disabled on this node
    ReplicationDisabled = 1001,
    /// Sync batch exceeds the accepted size
    SyncBatchTooLarge = 1002,
    /// Sync batch entry is malformed
    SyncBatchInvalid = 1003,
    /// Operation log entry not found
    LogEntryNotFound = 1004,

    // ==================== 4xxx: Record ====================
    /// Domain record not found
    RecordNotFound = 4001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Numeric value of this code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",

            ErrorCode::ReplicationDisabled => "Replication is disabled",
            ErrorCode::SyncBatchTooLarge => "Sync batch is too large",
            ErrorCode::SyncBatchInvalid => "Sync batch is invalid",
            ErrorCode::LogEntryNotFound => "Operation log entry not found",

            ErrorCode::RecordNotFound => "Record not found",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),

            1001 => Ok(ErrorCode::ReplicationDisabled),
            1002 => Ok(ErrorCode::SyncBatchTooLarge),
            1003 => Ok(ErrorCode::SyncBatchInvalid),
            1004 => Ok(ErrorCode::LogEntryNotFound),

            4001 => Ok(ErrorCode::RecordNotFound),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
