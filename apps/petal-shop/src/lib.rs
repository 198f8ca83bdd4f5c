//! # Petal Shop
//!
//! Orchestration layer over `petal-core` and `petal-db`: configuration,
//! logging, the [`Shop`] facade and notifications.
//!
//! ## Module Organization
//! ```text
//! petal_shop/
//! ├── lib.rs          ◄─── You are here (tracing setup, re-exports)
//! ├── shop.rs         ◄─── Shop facade: stock, cart, maintenance, ledger
//! ├── notify.rs       ◄─── Notifier trait + LogNotifier
//! ├── state/
//! │   ├── config.rs   ◄─── ShopConfig (defaults → petal.toml → PETAL_*)
//! │   └── cart.rs     ◄─── CartState (Arc<Mutex<Cart>>)
//! └── error.rs        ◄─── ApiError {code, message}
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. ShopConfig::load        defaults, petal.toml, PETAL_* overrides     │
//! │  2. init_tracing            RUST_LOG, else [logging].filter             │
//! │  3. Shop::open              SQLite (WAL), migrations, LogNotifier       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod notify;
pub mod shop;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use notify::{LogNotifier, Notifier, NotifyError, ShopEvent};
pub use shop::{Shop, ShrinkageOutcome, ShrinkagePolicy};
pub use state::{CartState, ShopConfig};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=petal=trace` - Show trace for petal crates only
/// - Otherwise `default_filter` (from `[logging].filter`)
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(state::DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
