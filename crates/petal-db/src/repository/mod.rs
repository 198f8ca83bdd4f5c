//! # Repository Module
//!
//! One repository per aggregate. All of them are cheap handles over the
//! shared pool; get them from [`crate::Database`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductRepository     catalog, pricing, care intervals                 │
//! │  StockLedger           adjust / adjust_with / movements  (locked)       │
//! │  TransactionRecorder   append-only income & expense entries             │
//! │  OrderRepository       cart commit, order history         (locked)     │
//! │  BatchRepository       batch lifecycle                                  │
//! │  MaintenanceScheduler  due-task projection over live batches            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock changes always go through [`stock::apply_adjustment`] on an open
//! transaction, whether they come from the ledger or an order commit.

pub mod batch;
pub mod maintenance;
pub mod order;
pub mod product;
pub mod stock;
pub mod transaction;
