//! # Validation Module
//!
//! Input validation for catalog edits and counter input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Shop facade / CLI                                            │
//! │  └── Parsing of user input (ids, units, task kinds)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + domain constructors                            │
//! │  ├── Field checks (names, notes, prices, package sizes, care days)            │
//! │  └── Domain rules (Cart, Batch::new, StockReason::validate_delta)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (amount_cents > 0)                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use petal_core::validation::{validate_product_name, validate_units_per_package};
//!
//! assert!(validate_product_name("Red Rose").is_ok());
//! assert!(validate_units_per_package(0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest care interval accepted, in days.
pub const MAX_CARE_DAYS: i64 = 365;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or arrangement name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a free-text note on a stock adjustment.
pub fn validate_note(note: &str) -> ValidationResult<()> {
    if note.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: 500,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price or cost in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (e.g. greenery given away)
///
/// ## Example
/// ```rust
/// use petal_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(250).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a package size. A package holds at least one stem.
pub fn validate_units_per_package(units: i64) -> ValidationResult<()> {
    if units <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "units_per_package".to_string(),
        });
    }
    Ok(())
}

/// Validates a care interval in days.
///
/// ## Rules
/// - Between 1 and MAX_CARE_DAYS
pub fn validate_care_days(field: &str, days: i64) -> ValidationResult<()> {
    if !(1..=MAX_CARE_DAYS).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_CARE_DAYS,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
