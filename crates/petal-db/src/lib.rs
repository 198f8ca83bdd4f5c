//! # petal-db: Storage Layer for Petal
//!
//! SQLite persistence for the flower shop core, with sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Petal Data Flow                                │
//! │                                                                         │
//! │  Shop facade (record_shrinkage, commit_cart, list_due_tasks)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     petal-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ StockLedger   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Transactions  │    │ 001_init.sql │  │   │
//! │  │   │ ProductLocks  │    │ Orders        │    │              │  │   │
//! │  │   │               │    │ Batches       │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (petal.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Every stock change for a product runs while holding that product's
//! lock from [`locks::ProductLocks`], inside a single database
//! transaction. Multi-product operations lock in sorted id order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use petal_db::{Database, DbConfig};
//! use petal_core::StockAdjustment;
//!
//! let db = Database::new(DbConfig::new("petal.db")).await?;
//!
//! let receipt = db.stock().adjust(&StockAdjustment::shrinkage(&rose_id, 15)).await?;
//! let tasks = db.maintenance().list_due_tasks(chrono::Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use locks::ProductLocks;
pub use pool::{Database, DbConfig};

pub use repository::batch::{BatchRepository, NextDue};
pub use repository::maintenance::MaintenanceScheduler;
pub use repository::order::{Order, OrderLineRecord, OrderReceipt, OrderRepository};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::stock::{AdjustReceipt, StockLedger};
pub use repository::transaction::TransactionRecorder;
