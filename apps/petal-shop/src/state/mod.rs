//! # State Module
//!
//! Application state, one focused type per concern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐              │
//! │  │   Database   │  │  CartState   │  │   ShopConfig     │              │
//! │  │  (petal-db,  │  │  Arc<Mutex<  │  │  [shop]          │              │
//! │  │   pooled)    │  │    Cart      │  │  [database]      │              │
//! │  │              │  │  >>          │  │  [logging]       │              │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘              │
//! │                                                                         │
//! │  • Database: internal connection pool and product locks (thread-safe)  │
//! │  • CartState: exclusive access through a tokio Mutex                   │
//! │  • ShopConfig: read-only after startup                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;

pub use cart::CartState;
pub use config::{
    ConfigError, ConfigResult, DatabaseSection, LoggingSection, ShopConfig, ShopSection,
    DEFAULT_LOG_FILTER,
};
