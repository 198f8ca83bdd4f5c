//! # petal-core: Pure Domain Logic for Petal
//!
//! The perishable-inventory and order-composition rules of a flower shop,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Petal Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 petal-shop (app / workshop CLI)                 │   │
//! │  │    Shop facade ──► shrinkage policy ──► notifications           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ petal-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   units   │  │   cart    │  │   batch   │  │ schedule  │  │   │
//! │  │   │ pkg→stems │  │ Order     │  │ lifecycle │  │ due tasks │  │   │
//! │  │   │           │  │ Composer  │  │   rules   │  │ projection│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    petal-db (Database Layer)                    │   │
//! │  │   Stock Ledger, Transaction Recorder, batches, order commit     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockAdjustment, Transaction, Batch, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`units`] - Unit Converter (packages → stems)
//! - [`cart`] - Order Composer cart state machine
//! - [`batch`] - Batch lifecycle rules and due-time derivation
//! - [`schedule`] - Maintenance task projection
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use petal_core::units::{to_stems_with, StockUnit};
//!
//! // 2 packages of 10 stems
//! assert_eq!(to_stems_with(10, 2, StockUnit::Package).unwrap(), 20);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod cart;
pub mod error;
pub mod money;
pub mod schedule;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartStatus, CompositionEntry, LineItem, OrderLine, StockLookup};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use schedule::DueTasks;
pub use types::*;
pub use units::{to_stems, StockUnit};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single cart line.
///
/// Catches typos at the counter (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
