//! # Shop Facade
//!
//! The one entry point the UI layer and the CLI talk to. It resolves the
//! acting user, applies caller-side policy (shrinkage clamping) and fires
//! notifications once a mutation is durable.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_shrinkage(rose, 8 stems, Clamp)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockLedger::adjust_with ── policy(product) ──► -min(8, stock)         │
//! │       │                                                                 │
//! │       ▼ committed                                                       │
//! │  Notifier::notify(Shrinkage)  ── error? ──► warn!, result unchanged     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use petal_core::{
    to_stems, Batch, CompositionEntry, CoreError, DueTasks, Product, StockAdjustment,
    StockReason, StockUnit, TaskKind, Transaction,
};
use petal_db::{AdjustReceipt, Database, OrderReceipt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiResult;
use crate::notify::{LogNotifier, Notifier, ShopEvent};
use crate::state::{CartState, ShopConfig};

/// What to do when a write-off asks for more stems than are in stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShrinkagePolicy {
    /// Fail with `InsufficientStock`; nothing is written off.
    #[default]
    Reject,
    /// Write off whatever is left and report the difference.
    Clamp,
}

/// Result of a write-off.
#[derive(Debug, Clone, Serialize)]
pub struct ShrinkageOutcome {
    /// Stems asked for, after unit conversion.
    pub requested: i64,
    pub applied: i64,
    /// `requested - applied`
    pub clamped: i64,
    pub stock_after: i64,
    /// Expense posted for the applied stems, if they had a cost.
    pub transaction: Option<Transaction>,
}

pub struct Shop {
    db: Database,
    config: ShopConfig,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Shop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shop")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Shop {
    pub fn new(db: Database, config: ShopConfig, notifier: Arc<dyn Notifier>) -> Self {
        Shop {
            db,
            config,
            notifier,
        }
    }

    /// Connects to the configured database with the logging notifier.
    pub async fn open(config: ShopConfig) -> ApiResult<Self> {
        let db = Database::new(config.db_config()?).await?;
        Ok(Shop::new(db, config, Arc::new(LogNotifier)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    fn actor(&self, actor: Option<&str>) -> Option<String> {
        actor
            .map(str::to_string)
            .or_else(|| self.config.shop.default_actor.clone())
    }

    fn notify(&self, event: ShopEvent) {
        if let Err(err) = self.notifier.notify(&event) {
            warn!(error = %err, ?event, "Notifier failed; mutation kept");
        }
    }

    // =========================================================================
    // Catalog & Stock
    // =========================================================================

    pub async fn products(&self) -> ApiResult<Vec<Product>> {
        Ok(self.db.products().list_active().await?)
    }

    pub async fn stock(&self, product_id: &str) -> ApiResult<i64> {
        Ok(self.db.stock().get(product_id).await?)
    }

    /// Adds delivered stock, in stems or packages.
    pub async fn restock(
        &self,
        product_id: &str,
        quantity: i64,
        unit: StockUnit,
        actor: Option<&str>,
    ) -> ApiResult<AdjustReceipt> {
        let receipt = self
            .db
            .stock()
            .adjust_with(
                product_id,
                StockReason::Restock,
                None,
                self.actor(actor),
                |product| to_stems(product, quantity, unit),
            )
            .await?
            .ok_or_else(|| CoreError::invalid_quantity("restock", quantity))?;
        Ok(receipt)
    }

    /// Writes off wilted or damaged stems. The expense is valued at cost.
    pub async fn record_shrinkage(
        &self,
        product_id: &str,
        quantity: i64,
        unit: StockUnit,
        policy: ShrinkagePolicy,
        note: Option<&str>,
        actor: Option<&str>,
    ) -> ApiResult<ShrinkageOutcome> {
        let actor = self.actor(actor);
        let mut requested = 0;
        let mut product_name = String::new();

        let receipt = self
            .db
            .stock()
            .adjust_with(
                product_id,
                StockReason::Shrinkage,
                note.map(str::to_string),
                actor.clone(),
                |product| {
                    requested = to_stems(product, quantity, unit)?;
                    product_name = product.name.clone();
                    let applied = match policy {
                        ShrinkagePolicy::Reject => requested,
                        ShrinkagePolicy::Clamp => requested.min(product.stock),
                    };
                    Ok(-applied)
                },
            )
            .await?;

        let outcome = match receipt {
            Some(receipt) => ShrinkageOutcome {
                requested,
                applied: -receipt.movement.delta,
                clamped: requested + receipt.movement.delta,
                stock_after: receipt.stock_after(),
                transaction: receipt.transaction,
            },
            None => ShrinkageOutcome {
                requested,
                applied: 0,
                clamped: requested,
                stock_after: self.db.stock().get(product_id).await?,
                transaction: None,
            },
        };

        if outcome.clamped > 0 {
            debug!(
                product_id = %product_id,
                requested = outcome.requested,
                applied = outcome.applied,
                "Shrinkage clamped to available stock"
            );
        }

        if outcome.applied > 0 {
            self.notify(ShopEvent::Shrinkage {
                product_id: product_id.to_string(),
                product_name,
                stems: outcome.applied,
                clamped: outcome.clamped,
                value_cents: outcome
                    .transaction
                    .as_ref()
                    .map(|t| t.amount_cents)
                    .unwrap_or(0),
                actor,
            });
        }

        Ok(outcome)
    }

    /// Puts sold stems back and posts an offsetting expense.
    pub async fn reverse_sale(
        &self,
        product_id: &str,
        stems: i64,
        note: Option<&str>,
        actor: Option<&str>,
    ) -> ApiResult<AdjustReceipt> {
        let mut adjustment = StockAdjustment::new(product_id, stems, StockReason::SaleReversal);
        adjustment.note = note.map(str::to_string);
        adjustment.actor = self.actor(actor);
        Ok(self.db.stock().adjust(&adjustment).await?)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Adds a catalog product to the cart. Returns the line id.
    pub async fn add_to_cart(
        &self,
        cart: &CartState,
        product_id: &str,
        quantity: i64,
        unit: StockUnit,
    ) -> ApiResult<String> {
        let product = self.db.products().get(product_id).await?;
        let line_id = cart
            .lock()
            .await
            .add_standard_item(&product, quantity, unit)?;
        Ok(line_id)
    }

    /// Adds a custom arrangement, soft-checked against live stock.
    pub async fn add_custom_to_cart(
        &self,
        cart: &CartState,
        name: &str,
        unit_price_cents: i64,
        quantity: i64,
        composition: Vec<CompositionEntry>,
    ) -> ApiResult<String> {
        let catalog = self.db.products().list_active().await?;
        let line_id = cart.lock().await.add_custom_item(
            name,
            unit_price_cents,
            quantity,
            composition,
            catalog.as_slice(),
        )?;
        Ok(line_id)
    }

    /// Commits the current cart and starts a fresh one.
    ///
    /// On failure the cart keeps its lines so the clerk can adjust and
    /// retry.
    pub async fn commit_cart(
        &self,
        cart: &CartState,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<OrderReceipt> {
        let actor = self.actor(actor);
        let receipt = {
            let mut current = cart.lock().await;
            self.db
                .orders()
                .commit(&mut current, actor.as_deref(), now)
                .await?
        };
        cart.start_new(now).await;

        self.notify(ShopEvent::OrderCommitted {
            order_id: receipt.order.id.clone(),
            total_cents: receipt.order.total_cents,
            lines: receipt.lines.len(),
            actor,
        });

        Ok(receipt)
    }

    // =========================================================================
    // Batches & Maintenance
    // =========================================================================

    pub async fn create_batch(
        &self,
        source_product_id: &str,
        stem_count: i64,
        now: DateTime<Utc>,
    ) -> ApiResult<Batch> {
        Ok(self.db.batches().create(source_product_id, stem_count, now).await?)
    }

    pub async fn discard_batch(&self, batch_id: &str, now: DateTime<Utc>) -> ApiResult<Batch> {
        Ok(self.db.batches().discard(batch_id, now).await?)
    }

    pub async fn list_due_tasks(&self, now: DateTime<Utc>) -> ApiResult<DueTasks> {
        Ok(self.db.maintenance().list_due_tasks(now).await?)
    }

    pub async fn complete_task(
        &self,
        batch_id: &str,
        kind: TaskKind,
        now: DateTime<Utc>,
    ) -> ApiResult<Batch> {
        Ok(self.db.maintenance().complete_task(batch_id, kind, now).await?)
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    pub async fn ledger(&self, limit: u32) -> ApiResult<Vec<Transaction>> {
        Ok(self.db.transactions().list_recent(limit).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::notify::NotifyError;
    use chrono::Duration;
    use petal_core::{CartStatus, TransactionKind};
    use petal_db::{DbConfig, NewProduct};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<ShopEvent>>);

    impl Notifier for Recording {
        fn notify(&self, event: &ShopEvent) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    impl Notifier for Failing {
        fn notify(&self, _event: &ShopEvent) -> Result<(), NotifyError> {
            Err(NotifyError("chat webhook unreachable".into()))
        }
    }

    async fn shop_with(notifier: Arc<dyn Notifier>) -> (Shop, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rose = db
            .products()
            .create(NewProduct::new("Red Rose", 250, 90).units_per_package(10))
            .await
            .unwrap();
        let mut config = ShopConfig::default();
        config.shop.default_actor = Some("counter".into());
        (Shop::new(db, config, notifier), rose)
    }

    #[tokio::test]
    async fn test_restock_then_shrinkage() {
        let events = Arc::new(Recording::default());
        let (shop, rose) = shop_with(events.clone()).await;

        shop.restock(&rose.id, 50, StockUnit::Stem, None).await.unwrap();
        let receipt = shop
            .restock(&rose.id, 2, StockUnit::Package, None)
            .await
            .unwrap();
        assert_eq!(receipt.stock_after(), 70);
        assert!(receipt.transaction.is_none());

        let outcome = shop
            .record_shrinkage(
                &rose.id,
                15,
                StockUnit::Stem,
                ShrinkagePolicy::Reject,
                Some("wilted"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome.applied, 15);
        assert_eq!(outcome.clamped, 0);
        assert_eq!(outcome.stock_after, 55);

        let expense = outcome.transaction.unwrap();
        assert_eq!(expense.kind, TransactionKind::Expense);
        assert_eq!(expense.amount_cents, 15 * 90);
        assert_eq!(expense.actor.as_deref(), Some("counter"));

        let events = events.0.lock().unwrap();
        assert!(matches!(
            &events[0],
            ShopEvent::Shrinkage { stems: 15, value_cents: 1350, .. }
        ));
    }

    #[tokio::test]
    async fn test_shrinkage_policies() {
        let (shop, rose) = shop_with(Arc::new(LogNotifier)).await;
        shop.restock(&rose.id, 5, StockUnit::Stem, None).await.unwrap();

        let err = shop
            .record_shrinkage(&rose.id, 8, StockUnit::Stem, ShrinkagePolicy::Reject, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(shop.stock(&rose.id).await.unwrap(), 5);

        let outcome = shop
            .record_shrinkage(&rose.id, 8, StockUnit::Stem, ShrinkagePolicy::Clamp, None, None)
            .await
            .unwrap();
        assert_eq!((outcome.requested, outcome.applied, outcome.clamped), (8, 5, 3));
        assert_eq!(outcome.stock_after, 0);

        // Nothing left: clamps to zero without a movement.
        let empty = shop
            .record_shrinkage(&rose.id, 1, StockUnit::Package, ShrinkagePolicy::Clamp, None, None)
            .await
            .unwrap();
        assert_eq!((empty.requested, empty.applied, empty.clamped), (10, 0, 10));
        assert!(empty.transaction.is_none());
    }

    #[tokio::test]
    async fn test_failing_notifier_never_rolls_back() {
        let (shop, rose) = shop_with(Arc::new(Failing)).await;
        shop.restock(&rose.id, 20, StockUnit::Stem, None).await.unwrap();

        let cart = CartState::new(Utc::now());
        shop.add_to_cart(&cart, &rose.id, 1, StockUnit::Package)
            .await
            .unwrap();
        let receipt = shop.commit_cart(&cart, None, Utc::now()).await.unwrap();

        assert_eq!(receipt.order.total_cents, 2_500);
        assert_eq!(shop.stock(&rose.id).await.unwrap(), 10);
        assert_eq!(shop.ledger(10).await.unwrap().len(), 1);
        // A fresh cart is ready for the next customer.
        assert_eq!(cart.snapshot().await.status(), CartStatus::Empty);
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_cart() {
        let events = Arc::new(Recording::default());
        let (shop, rose) = shop_with(events.clone()).await;
        shop.restock(&rose.id, 4, StockUnit::Stem, None).await.unwrap();

        let cart = CartState::new(Utc::now());
        shop.add_to_cart(&cart, &rose.id, 6, StockUnit::Stem)
            .await
            .unwrap();
        let err = shop.commit_cart(&cart, None, Utc::now()).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let snapshot = cart.snapshot().await;
        assert_eq!(snapshot.status(), CartStatus::Building);
        assert_eq!(snapshot.lines().len(), 1);
        assert!(events.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_item_soft_check_uses_live_stock() {
        let (shop, rose) = shop_with(Arc::new(LogNotifier)).await;
        shop.restock(&rose.id, 6, StockUnit::Stem, None).await.unwrap();
        let cart = CartState::new(Utc::now());

        let err = shop
            .add_custom_to_cart(
                &cart,
                "Dozen roses",
                4_000,
                1,
                vec![CompositionEntry::new(&rose.id).with_color("red", 12)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        shop.add_custom_to_cart(
            &cart,
            "Half dozen",
            2_000,
            1,
            vec![CompositionEntry::new(&rose.id).with_color("red", 6)],
        )
        .await
        .unwrap();
        let receipt = shop
            .commit_cart(&cart, Some("ana"), Utc::now())
            .await
            .unwrap();
        assert_eq!(receipt.order.actor.as_deref(), Some("ana"));
        assert_eq!(shop.stock(&rose.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reverse_sale_posts_offsetting_expense() {
        let (shop, rose) = shop_with(Arc::new(LogNotifier)).await;
        let receipt = shop.reverse_sale(&rose.id, 3, Some("returned"), None).await.unwrap();
        assert_eq!(receipt.stock_after(), 3);
        let entry = receipt.transaction.unwrap();
        assert_eq!(entry.kind, TransactionKind::Expense);
        assert_eq!(entry.amount_cents, 750);
    }

    #[tokio::test]
    async fn test_maintenance_through_facade() {
        let (shop, rose) = shop_with(Arc::new(LogNotifier)).await;
        let t0 = Utc::now();
        let batch = shop.create_batch(&rose.id, 10, t0).await.unwrap();

        let due = shop.list_due_tasks(t0 + Duration::days(4)).await.unwrap();
        assert_eq!(due.len(), 2);

        shop.complete_task(&batch.id, TaskKind::WaterChange, t0 + Duration::days(4))
            .await
            .unwrap();
        let due: Vec<_> = shop
            .list_due_tasks(t0 + Duration::days(4))
            .await
            .unwrap()
            .iter()
            .collect();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, TaskKind::Cut);

        shop.discard_batch(&batch.id, t0 + Duration::days(4)).await.unwrap();
        assert!(shop
            .list_due_tasks(t0 + Duration::days(9))
            .await
            .unwrap()
            .is_empty());
    }
}
