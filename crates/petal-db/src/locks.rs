//! # Per-Product Lock Arena
//!
//! Serializes stock adjustments per product identity.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductLocks                                                           │
//! │  HashMap<product_id, Arc<tokio::Mutex<()>>>                             │
//! │                                                                         │
//! │  adjust(rose)          → lock [rose]                                    │
//! │  commit(tulip, rose)   → lock [rose, tulip]   (always sorted by id)     │
//! │  commit(rose, lily)    → lock [lily, rose]                              │
//! │                                                                         │
//! │  Sorted acquisition means two carts with overlapping products can      │
//! │  never wait on each other in a cycle.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The SQL itself is also guarded (`WHERE stock + delta >= 0`), so the
//! locks give linearizable read-check-write inside this process while the
//! database keeps the non-negative invariant no matter what.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Held product locks. Released on drop.
#[derive(Debug)]
pub struct ProductGuards {
    ids: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ProductGuards {
    /// Product ids held, in acquisition order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// Shared arena of per-product async mutexes.
///
/// Cloning is cheap; every clone shares the same arena.
#[derive(Debug, Clone, Default)]
pub struct ProductLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, product_id: &str) -> Arc<AsyncMutex<()>> {
        // The std mutex only guards the map and is never held across await.
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(product_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Locks a single product.
    pub async fn lock(&self, product_id: &str) -> ProductGuards {
        self.lock_all([product_id]).await
    }

    /// Locks several products in sorted id order. Duplicates are ignored.
    pub async fn lock_all<I, S>(&self, product_ids: I) -> ProductGuards
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: BTreeSet<String> = product_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            trace!(product_id = %id, "Acquiring product lock");
            guards.push(self.slot(id).lock_owned().await);
        }

        ProductGuards {
            ids: ids.into_iter().collect(),
            _guards: guards,
        }
    }

    /// Number of products that have ever been locked.
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(map) => map.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_locks_are_sorted_and_deduplicated() {
        let locks = ProductLocks::new();
        let guards = locks.lock_all(["tulip", "rose", "tulip", "lily"]).await;
        assert_eq!(guards.ids(), &["lily", "rose", "tulip"]);
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn test_same_product_is_exclusive() {
        let locks = ProductLocks::new();
        let held = locks.lock("rose").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.lock("rose").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(held);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_products_do_not_block() {
        let locks = ProductLocks::new();
        let _rose = locks.lock("rose").await;
        let tulip = tokio::time::timeout(Duration::from_millis(100), locks.lock("tulip")).await;
        assert!(tulip.is_ok());
    }
}
