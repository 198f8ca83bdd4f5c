//! # API Error Type
//!
//! Unified error type surfaced to the UI layer and the CLI.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Petal                                  │
//! │                                                                         │
//! │  Shop facade                                                           │
//! │  Result<T, ApiError>                                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Domain rule? ─── CoreError::InsufficientStock ──┐                     │
//! │         │         (kind() → ErrorKind)           │                     │
//! │         ▼                                        ▼                     │
//! │  Storage?     ─── DbError::QueryFailed ──────► ApiError {code, message}│
//! │                   (logged, generic message)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The UI switches on `code`; `message` is for display.

use petal_core::{CoreError, ErrorKind};
use petal_db::DbError;
use serde::Serialize;

use crate::state::ConfigError;

/// Error returned from shop operations.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for 3f2c…: available 1, requested 2"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses. One per [`ErrorKind`], plus the
/// app-only `Config` and `Internal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidQuantity,
    InsufficientStock,
    NotFound,
    InvalidState,
    InvalidAmount,
    InvalidStemCount,
    ValidationError,
    DatabaseError,
    ConfigError,
    Internal,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidQuantity => ErrorCode::InvalidQuantity,
            ErrorKind::InsufficientStock => ErrorCode::InsufficientStock,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::InvalidState => ErrorCode::InvalidState,
            ErrorKind::InvalidAmount => ErrorCode::InvalidAmount,
            ErrorKind::InvalidStemCount => ErrorCode::InvalidStemCount,
            ErrorKind::Validation => ErrorCode::ValidationError,
            ErrorKind::Storage => ErrorCode::DatabaseError,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Domain errors keep their own message; it is already user-facing.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::new(err.kind().into(), err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;
