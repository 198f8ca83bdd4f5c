//! # Cart State
//!
//! Holds the cart currently being composed at the counter.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>`. A commit holds the lock across
//! the database call, so no line can change while stock is being deducted.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Empty ──add──► Building ──commit──► Committed ─┐                       │
//! │                    │                             ├─► start_new() ──► Empty
//! │                    └──────clear────► Discarded ──┘                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use petal_core::Cart;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new(now: DateTime<Utc>) -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::new(now))),
        }
    }

    /// Exclusive access to the cart.
    pub async fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().await
    }

    /// A copy of the cart for display.
    pub async fn snapshot(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    /// Replaces a committed or discarded cart with a fresh one and
    /// returns the old cart. A cart still in progress is left alone.
    pub async fn start_new(&self, now: DateTime<Utc>) -> Option<Cart> {
        let mut cart = self.cart.lock().await;
        if !cart.status().is_terminal() {
            return None;
        }
        Some(std::mem::replace(&mut *cart, Cart::new(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petal_core::{CartStatus, Product, StockUnit};

    fn rose() -> Product {
        Product {
            id: "rose".into(),
            name: "Red Rose".into(),
            price_cents: 250,
            cost_cents: 90,
            units_per_package: 10,
            stock: 50,
            care_days_water: 2,
            care_days_cut: 3,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_start_new_only_after_terminal() {
        let state = CartState::new(Utc::now());
        state
            .lock()
            .await
            .add_standard_item(&rose(), 2, StockUnit::Stem)
            .unwrap();

        assert!(state.start_new(Utc::now()).await.is_none());
        assert_eq!(state.snapshot().await.lines().len(), 1);

        state.lock().await.clear().unwrap();
        let old = state.start_new(Utc::now()).await.unwrap();
        assert_eq!(old.status(), CartStatus::Discarded);
        assert_eq!(state.snapshot().await.status(), CartStatus::Empty);
    }
}
