//! Error system shared by every node
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ErrorBody`]: `{success: false, code, message, details}` on the wire
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Replication errors
//! - 4xxx: Record errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorBody, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::SyncBatchTooLarge)
//!     .with_detail("max_entries", 1000);
//!
//! let body = ErrorBody::from(&err);
//! assert!(!body.success);
//! assert_eq!(body.code.code(), 1002);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ErrorBody};
