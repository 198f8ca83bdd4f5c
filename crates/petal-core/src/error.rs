//! # Error Types
//!
//! Domain-specific error types for petal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  petal-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Flat classification the UI switches on         │
//! │                                                                         │
//! │  petal-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  petal-shop errors (app)                                               │
//! │  └── ApiError         - What the UI layer sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product ID, batch ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. None of these are recovered silently; they are surfaced to the caller

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors raised by the stock, order and batch logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A quantity was zero, negative, or otherwise not a positive integer.
    #[error("Invalid quantity for {field}: {value} (must be a positive integer)")]
    InvalidQuantity { field: String, value: i64 },

    /// Not enough stems on hand to apply a deduction.
    ///
    /// ## User Workflow
    /// ```text
    /// Commit cart (needs 7 roses)
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "rose-red", available: 5, requested: 7 }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 stems of Red Rose in stock", cart kept for retry
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Entity is in a lifecycle state that forbids the operation.
    ///
    /// ## When This Occurs
    /// - Recording a water change or cut on a discarded batch
    /// - Editing a committed or discarded cart
    #[error("{entity} {id} is {state}, cannot perform operation")]
    InvalidState {
        entity: String,
        id: String,
        state: String,
    },

    /// Monetary amount must be strictly positive.
    #[error("Invalid amount: {cents} cents (must be greater than zero)")]
    InvalidAmount { cents: i64 },

    /// A batch must hold at least one stem.
    #[error("Invalid stem count: {count} (must be greater than zero)")]
    InvalidStemCount { count: i64 },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A stem count does not fit in an i64.
    #[error("Stem count for {field} is too large")]
    StemOverflow { field: String },

    /// A money amount does not fit in an i64 count of cents.
    #[error("Amount for {field} is too large")]
    AmountOverflow { field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            state: state.into(),
        }
    }

    /// Creates an InvalidQuantity error for the named field.
    pub fn invalid_quantity(field: impl Into<String>, value: i64) -> Self {
        CoreError::InvalidQuantity {
            field: field.into(),
            value,
        }
    }

    pub fn stem_overflow(field: impl Into<String>) -> Self {
        CoreError::StemOverflow {
            field: field.into(),
        }
    }

    pub fn amount_overflow(field: impl Into<String>) -> Self {
        CoreError::AmountOverflow {
            field: field.into(),
        }
    }

    /// Returns the flat classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidQuantity { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::StemOverflow { .. } => ErrorKind::InvalidQuantity,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidState { .. } => ErrorKind::InvalidState,
            CoreError::InvalidAmount { .. } | CoreError::AmountOverflow { .. } => {
                ErrorKind::InvalidAmount
            }
            CoreError::InvalidStemCount { .. } => ErrorKind::InvalidStemCount,
            CoreError::CartTooLarge { .. } | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Flat error classification handed to the UI layer.
///
/// One value per failure class the caller is expected to react to.
/// `Storage` is never produced by petal-core; petal-db uses it for
/// durable-store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidQuantity,
    InsufficientStock,
    NotFound,
    InvalidState,
    InvalidAmount,
    InvalidStemCount,
    Validation,
    Storage,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before domain logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unknown unit or task kind).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
