//! # Stock Ledger
//!
//! The single writer of product stem counts.
//!
//! ## Adjust Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust(rose, -15, shrinkage)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock [rose]                         ← per-product lock arena           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  UPDATE products SET stock = stock - 15                                 │
//! │   WHERE id = rose AND stock - 15 >= 0 ← check + write in one statement  │
//! │  INSERT stock_movements (...)                                           │
//! │  INSERT transactions (expense, 15 × cost)                               │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  unlock                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rejected adjustment changes nothing: no clamping happens here. Callers
//! that want to clamp (the shrinkage affordance) use [`StockLedger::adjust_with`]
//! and decide the delta from the locked, current stock.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::locks::ProductLocks;
use crate::repository::product::fetch_product;
use crate::repository::transaction::insert_transaction;
use petal_core::validation::validate_note;
use petal_core::{
    CoreError, CoreResult, Product, StockAdjustment, StockMovement, StockReason, Transaction,
};

/// Result of one applied adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustReceipt {
    pub movement: StockMovement,
    /// The paired ledger entry, when the reason posts one.
    pub transaction: Option<Transaction>,
}

impl AdjustReceipt {
    pub fn stock_after(&self) -> i64 {
        self.movement.stock_after
    }
}

/// Whether [`apply_adjustment`] posts the reason's paired ledger entry.
///
/// Order commits post one aggregate income entry for the whole cart, so
/// their per-product sale deductions skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Posting {
    Paired,
    Skip,
}

/// Applies one adjustment on an open transaction.
///
/// The caller must hold the product's lock and commit the transaction.
/// Dropping the transaction after an error rolls everything back.
pub(crate) async fn apply_adjustment(
    conn: &mut SqliteConnection,
    product: &Product,
    adjustment: &StockAdjustment,
    posting: Posting,
    now: DateTime<Utc>,
) -> DbResult<AdjustReceipt> {
    adjustment.reason.validate_delta(adjustment.delta)?;
    if product.stock.checked_add(adjustment.delta).is_none() {
        return Err(CoreError::stem_overflow(&product.id).into());
    }

    let stock_after: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1 AND stock + ?2 >= 0
        RETURNING stock
        "#,
    )
    .bind(&product.id)
    .bind(adjustment.delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let stock_after = match stock_after {
        Some(stock) => stock,
        None => {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                    .bind(&product.id)
                    .fetch_optional(&mut *conn)
                    .await?;
            return Err(match available {
                Some(available) => CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    available,
                    requested: adjustment.delta.saturating_neg(),
                },
                None => CoreError::not_found("Product", &product.id),
            }
            .into());
        }
    };

    let movement = StockMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        delta: adjustment.delta,
        reason: adjustment.reason,
        note: adjustment.note.clone(),
        actor: adjustment.actor.clone(),
        stock_after,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, delta, reason, note, actor, stock_after, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.delta)
    .bind(movement.reason)
    .bind(&movement.note)
    .bind(&movement.actor)
    .bind(movement.stock_after)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    let transaction = match (posting, adjustment.reason.posts()) {
        (Posting::Paired, Some(kind)) => {
            let amount = adjustment.valuation(product)?;
            if amount.is_positive() {
                let entry = Transaction::new(
                    adjustment.describe(product),
                    amount,
                    kind,
                    now,
                    adjustment.actor.clone(),
                )?;
                insert_transaction(&mut *conn, &entry).await?;
                Some(entry)
            } else {
                // Zero-cost stock: nothing of value moved.
                debug!(product_id = %product.id, reason = adjustment.reason.as_str(), "Zero-value adjustment, no ledger entry");
                None
            }
        }
        _ => None,
    };

    Ok(AdjustReceipt {
        movement,
        transaction,
    })
}

/// Stock Ledger repository.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    locks: ProductLocks,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, locks: ProductLocks) -> Self {
        StockLedger { pool, locks }
    }

    /// Current stem count of a product.
    pub async fn get(&self, product_id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        stock.ok_or_else(|| DbError::not_found("Product", product_id))
    }

    /// Applies a signed stem delta.
    ///
    /// ## Errors
    /// - `InvalidQuantity` if the delta points the wrong way for the reason
    /// - `NotFound` for an unknown product
    /// - `InsufficientStock` if stock would go negative (nothing is applied)
    ///
    /// ## Side Effects
    /// - Appends a stock movement
    /// - Shrinkage and sale-reversal post an expense, sale posts income,
    ///   restock posts nothing
    pub async fn adjust(&self, adjustment: &StockAdjustment) -> DbResult<AdjustReceipt> {
        let delta = adjustment.delta;
        self.adjust_with(
            &adjustment.product_id,
            adjustment.reason,
            adjustment.note.clone(),
            adjustment.actor.clone(),
            |_| Ok(delta),
        )
        .await?
        .ok_or_else(|| CoreError::invalid_quantity(adjustment.reason.as_str(), 0).into())
    }

    /// Applies a delta computed by `policy` from the product as it is
    /// right now, under the product's lock.
    ///
    /// Returns `Ok(None)` when the policy decides on a zero delta.
    pub async fn adjust_with<F>(
        &self,
        product_id: &str,
        reason: StockReason,
        note: Option<String>,
        actor: Option<String>,
        policy: F,
    ) -> DbResult<Option<AdjustReceipt>>
    where
        F: FnOnce(&Product) -> CoreResult<i64>,
    {
        if let Some(note) = &note {
            validate_note(note).map_err(CoreError::from)?;
        }

        let _guard = self.locks.lock(product_id).await;
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let product = fetch_product(&mut *tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let delta = policy(&product)?;
        if delta == 0 {
            debug!(product_id = %product_id, reason = reason.as_str(), "Policy chose no change");
            return Ok(None);
        }

        let adjustment = StockAdjustment {
            product_id: product_id.to_string(),
            delta,
            reason,
            note,
            actor,
        };

        let receipt =
            apply_adjustment(&mut tx, &product, &adjustment, Posting::Paired, Utc::now()).await?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            product_id = %product_id,
            delta,
            reason = reason.as_str(),
            stock_after = receipt.movement.stock_after,
            "Stock adjusted"
        );
        Ok(Some(receipt))
    }

    /// Movement history of a product, newest first.
    pub async fn movements(&self, product_id: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, delta, reason, note, actor, stock_after, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};
    use petal_core::units::{to_stems, StockUnit};
    use petal_core::{ErrorKind, TransactionKind};

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rose = db
            .products()
            .create(NewProduct::new("Red Rose", 250, 90).units_per_package(10))
            .await
            .unwrap();
        db.stock()
            .adjust(&StockAdjustment::restock(&rose.id, 50))
            .await
            .unwrap();
        (db, rose)
    }

    #[tokio::test]
    async fn test_package_restock_then_shrinkage() {
        let (db, rose) = setup().await;
        assert_eq!(db.stock().get(&rose.id).await.unwrap(), 50);

        let stems = to_stems(&rose, 2, StockUnit::Package).unwrap();
        let receipt = db
            .stock()
            .adjust(&StockAdjustment::restock(&rose.id, stems))
            .await
            .unwrap();
        assert_eq!(receipt.stock_after(), 70);
        assert!(receipt.transaction.is_none());

        let receipt = db
            .stock()
            .adjust(&StockAdjustment::shrinkage(&rose.id, 15).with_note("wilted"))
            .await
            .unwrap();
        assert_eq!(receipt.stock_after(), 55);
        let expense = receipt.transaction.unwrap();
        assert_eq!(expense.kind, TransactionKind::Expense);
        assert_eq!(expense.amount_cents, 15 * 90);

        assert_eq!(db.stock().get(&rose.id).await.unwrap(), 55);
        let entries = db.transactions().list_recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, expense.id);
    }

    #[tokio::test]
    async fn test_overdraw_is_rejected_in_full() {
        let (db, rose) = setup().await;

        let err = db
            .stock()
            .adjust(&StockAdjustment::shrinkage(&rose.id, 51))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock {
                available: 50,
                requested: 51,
                ..
            })
        ));

        assert_eq!(db.stock().get(&rose.id).await.unwrap(), 50);
        assert!(db.transactions().list_recent(10).await.unwrap().is_empty());
        assert_eq!(db.stock().movements(&rose.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sale_posts_income_and_reversal_posts_expense() {
        let (db, rose) = setup().await;

        let sale = db
            .stock()
            .adjust(&StockAdjustment::new(&rose.id, -4, StockReason::Sale))
            .await
            .unwrap();
        let income = sale.transaction.unwrap();
        assert_eq!(income.kind, TransactionKind::Income);
        assert_eq!(income.amount_cents, 1000);

        let reversal = db
            .stock()
            .adjust(&StockAdjustment::new(&rose.id, 4, StockReason::SaleReversal))
            .await
            .unwrap();
        assert_eq!(reversal.stock_after(), 50);
        let expense = reversal.transaction.unwrap();
        assert_eq!(expense.kind, TransactionKind::Expense);
        assert_eq!(expense.amount_cents, 1000);
    }

    #[tokio::test]
    async fn test_wrong_direction_is_invalid_quantity() {
        let (db, rose) = setup().await;
        let err = db
            .stock()
            .adjust(&StockAdjustment::new(&rose.id, 5, StockReason::Shrinkage))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
        assert!(db
            .stock()
            .adjust(&StockAdjustment::restock(&rose.id, 0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_restock_past_i64_is_invalid_quantity() {
        let (db, rose) = setup().await;

        let err = db
            .stock()
            .adjust(&StockAdjustment::restock(&rose.id, i64::MAX))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
        assert!(matches!(err, DbError::Core(CoreError::StemOverflow { .. })));

        assert_eq!(db.stock().get(&rose.id).await.unwrap(), 50);
        assert_eq!(db.stock().movements(&rose.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sale_valued_past_i64_is_invalid_amount() {
        let (db, _) = setup().await;
        let pricey = db
            .products()
            .create(NewProduct::new("Blue Orchid", i64::MAX / 2, 100))
            .await
            .unwrap();
        db.stock()
            .adjust(&StockAdjustment::restock(&pricey.id, 3))
            .await
            .unwrap();

        let err = db
            .stock()
            .adjust(&StockAdjustment::new(&pricey.id, -3, StockReason::Sale))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);

        assert_eq!(db.stock().get(&pricey.id).await.unwrap(), 3);
        assert!(db.transactions().list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlong_note_is_rejected() {
        let (db, rose) = setup().await;

        let err = db
            .stock()
            .adjust(&StockAdjustment::shrinkage(&rose.id, 1).with_note("x".repeat(501)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.stock().get(&rose.id).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (db, _) = setup().await;
        assert_eq!(
            db.stock().get("ghost").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.stock()
                .adjust(&StockAdjustment::restock("ghost", 5))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_adjust_with_sees_current_stock() {
        let (db, rose) = setup().await;

        let receipt = db
            .stock()
            .adjust_with(&rose.id, StockReason::Shrinkage, None, None, |p| {
                Ok(-p.stock.min(80))
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.movement.delta, -50);
        assert_eq!(receipt.stock_after(), 0);

        let nothing = db
            .stock()
            .adjust_with(&rose.id, StockReason::Shrinkage, None, None, |p| {
                Ok(-p.stock.min(80))
            })
            .await
            .unwrap();
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn test_movements_newest_first() {
        let (db, rose) = setup().await;
        db.stock()
            .adjust(&StockAdjustment::shrinkage(&rose.id, 5).with_actor("ana"))
            .await
            .unwrap();

        let movements = db.stock().movements(&rose.id, 10).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].reason, StockReason::Shrinkage);
        assert_eq!(movements[0].actor.as_deref(), Some("ana"));
        assert_eq!(movements[0].stock_after, 45);
        assert_eq!(movements[1].reason, StockReason::Restock);
    }

    #[tokio::test]
    async fn test_stock_never_negative_under_random_sequence() {
        let (db, rose) = setup().await;
        let deltas = [-20, -40, 15, -30, -30, 7, -100, -25, 3, -1];

        let mut expected = 50;
        for delta in deltas {
            let adj = if delta > 0 {
                StockAdjustment::restock(&rose.id, delta)
            } else {
                StockAdjustment::shrinkage(&rose.id, -delta)
            };
            match db.stock().adjust(&adj).await {
                Ok(receipt) => {
                    expected += delta;
                    assert_eq!(receipt.stock_after(), expected);
                }
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
                    assert!(expected + delta < 0);
                }
            }
            assert!(db.stock().get(&rose.id).await.unwrap() >= 0);
        }
        assert_eq!(db.stock().get(&rose.id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_concurrent_shrinkage_never_overdraws() {
        let (db, rose) = setup().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = db.stock();
            let id = rose.id.clone();
            handles.push(tokio::spawn(async move {
                ledger.adjust(&StockAdjustment::shrinkage(&id, 10)).await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                applied += 1;
            }
        }

        assert_eq!(applied, 5);
        assert_eq!(db.stock().get(&rose.id).await.unwrap(), 0);
    }
}
