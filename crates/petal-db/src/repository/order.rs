//! # Order Repository
//!
//! Commits carts built by the Order Composer and keeps order history.
//!
//! ## Commit Flow (all-or-nothing)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(cart)                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  required = { lily: 2, rose: 7, tulip: 4 }   (units → stems, custom    │
//! │       │                                        allocations × quantity)  │
//! │       ▼                                                                 │
//! │  lock [lily, rose, tulip]                    sorted: no deadlocks       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   1. verify every product has enough stock   ─── any short? ──► drop tx │
//! │   2. deduct each product (reason = sale)          InsufficientStock     │
//! │   3. one aggregate income transaction             cart stays Building   │
//! │   4. orders + order_lines rows                                          │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart → Committed                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::locks::ProductLocks;
use crate::repository::product::fetch_product;
use crate::repository::stock::{apply_adjustment, Posting};
use crate::repository::transaction::insert_transaction;
use petal_core::{
    Cart, CompositionEntry, CoreError, LineItem, OrderLine, StockAdjustment, StockMovement,
    StockReason, Transaction, TransactionKind,
};

// =============================================================================
// Records
// =============================================================================

/// A committed cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub cart_id: String,
    pub total_cents: i64,
    /// The income entry posted for this order.
    pub transaction_id: String,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stored order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderLineRecord {
    pub id: String,
    pub order_id: String,
    pub position: i64,
    /// `standard` or `custom`
    pub kind: String,
    pub product_id: Option<String>,
    pub name: String,
    /// Sale unit of a standard line.
    pub unit: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    /// JSON composition of a custom line.
    pub composition: Option<String>,
}

impl OrderLineRecord {
    fn from_line(order_id: &str, position: i64, line: &OrderLine) -> DbResult<Self> {
        let line_total_cents = line.line_total()?.cents();
        let record = match &line.item {
            LineItem::Standard {
                product_id,
                name,
                unit_price_cents,
                unit,
                ..
            } => OrderLineRecord {
                id: line.line_id.clone(),
                order_id: order_id.to_string(),
                position,
                kind: "standard".to_string(),
                product_id: Some(product_id.clone()),
                name: name.clone(),
                unit: Some(unit.as_str().to_string()),
                unit_price_cents: *unit_price_cents,
                quantity: line.quantity,
                line_total_cents,
                composition: None,
            },
            LineItem::Custom {
                name,
                unit_price_cents,
                composition,
            } => OrderLineRecord {
                id: line.line_id.clone(),
                order_id: order_id.to_string(),
                position,
                kind: "custom".to_string(),
                product_id: None,
                name: name.clone(),
                unit: None,
                unit_price_cents: *unit_price_cents,
                quantity: line.quantity,
                line_total_cents,
                composition: Some(serde_json::to_string(composition)?),
            },
        };
        Ok(record)
    }

    /// Decoded composition of a custom line; empty for standard lines.
    pub fn composition(&self) -> DbResult<Vec<CompositionEntry>> {
        match &self.composition {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Everything a successful commit produced.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order: Order,
    pub lines: Vec<OrderLineRecord>,
    pub transaction: Transaction,
    /// One sale movement per affected product, in product id order.
    pub movements: Vec<StockMovement>,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    locks: ProductLocks,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool, locks: ProductLocks) -> Self {
        OrderRepository { pool, locks }
    }

    /// Commits a cart: deducts every required stem and posts one income
    /// entry for the cart total, atomically.
    ///
    /// ## Errors
    /// - `InvalidState` unless the cart is `Building` with at least one line
    /// - `InvalidAmount` if the cart total is zero
    /// - `NotFound` if a product no longer exists or was deactivated
    /// - `InsufficientStock` for the first product (by id) that is short;
    ///   nothing is deducted and the cart stays `Building`
    pub async fn commit(
        &self,
        cart: &mut Cart,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<OrderReceipt> {
        cart.ensure_committable()?;
        let required = cart.stem_requirements()?;
        let total = cart.total()?;
        if !total.is_positive() {
            return Err(CoreError::InvalidAmount {
                cents: total.cents(),
            }
            .into());
        }

        let order_id = Uuid::new_v4().to_string();
        debug!(
            cart_id = %cart.id(),
            order_id = %order_id,
            products = required.len(),
            "Committing cart"
        );

        let _guards = self.locks.lock_all(required.keys()).await;
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        // 1. Verify everything before touching anything.
        let mut products = Vec::with_capacity(required.len());
        for (product_id, stems) in &required {
            let product = fetch_product(&mut *tx, product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| DbError::not_found("Product", product_id))?;
            if !product.has_stems(*stems) {
                warn!(
                    cart_id = %cart.id(),
                    product_id = %product_id,
                    available = product.stock,
                    requested = stems,
                    "Commit rejected, insufficient stock"
                );
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    available: product.stock,
                    requested: *stems,
                }
                .into());
            }
            products.push((product, *stems));
        }

        // 2. Deduct.
        let actor = actor.map(str::to_string);
        let mut movements = Vec::with_capacity(products.len());
        for (product, stems) in &products {
            let mut adjustment = StockAdjustment::new(&product.id, -stems, StockReason::Sale)
                .with_note(format!("order {}", order_id));
            adjustment.actor = actor.clone();
            let receipt =
                apply_adjustment(&mut tx, product, &adjustment, Posting::Skip, now).await?;
            movements.push(receipt.movement);
        }

        // 3. One aggregate income entry.
        let transaction = Transaction::new(
            describe_order(cart),
            total,
            TransactionKind::Income,
            now,
            actor.clone(),
        )?;
        insert_transaction(&mut *tx, &transaction).await?;

        // 4. Order history.
        let order = Order {
            id: order_id.clone(),
            cart_id: cart.id().to_string(),
            total_cents: total.cents(),
            transaction_id: transaction.id.clone(),
            actor,
            created_at: now,
        };
        let lines = cart
            .lines()
            .iter()
            .enumerate()
            .map(|(i, line)| OrderLineRecord::from_line(&order_id, i as i64, line))
            .collect::<DbResult<Vec<_>>>()?;
        insert_order(&mut tx, &order, &lines).await?;

        tx.commit().await.map_err(DbError::transaction)?;
        cart.mark_committed(&order_id)?;

        info!(
            order_id = %order_id,
            total_cents = order.total_cents,
            lines = lines.len(),
            "Cart committed"
        );

        Ok(OrderReceipt {
            order,
            lines,
            transaction,
            movements,
        })
    }

    /// Loads an order header and its lines.
    pub async fn get_order(&self, id: &str) -> DbResult<(Order, Vec<OrderLineRecord>)> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, cart_id, total_cents, transaction_id, actor, created_at \
             FROM orders WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))?;

        let lines = sqlx::query_as::<_, OrderLineRecord>(
            r#"
            SELECT id, order_id, position, kind, product_id, name, unit,
                   unit_price_cents, quantity, line_total_cents, composition
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok((order, lines))
    }

    /// Most recent orders first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, cart_id, total_cents, transaction_id, actor, created_at \
             FROM orders ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}

fn describe_order(cart: &Cart) -> String {
    let names: Vec<&str> = cart.lines().iter().map(OrderLine::name).take(3).collect();
    let more = cart.lines().len().saturating_sub(names.len());
    if more > 0 {
        format!("Order: {} and {} more", names.join(", "), more)
    } else {
        format!("Order: {}", names.join(", "))
    }
}

async fn insert_order(
    conn: &mut SqliteConnection,
    order: &Order,
    lines: &[OrderLineRecord],
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, cart_id, total_cents, transaction_id, actor, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&order.id)
    .bind(&order.cart_id)
    .bind(order.total_cents)
    .bind(&order.transaction_id)
    .bind(&order.actor)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;

    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, position, kind, product_id, name, unit,
                unit_price_cents, quantity, line_total_cents, composition
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(line.position)
        .bind(&line.kind)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(&line.unit)
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .bind(line.line_total_cents)
        .bind(&line.composition)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
