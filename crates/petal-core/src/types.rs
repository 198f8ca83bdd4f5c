//! # Domain Types
//!
//! Core domain types used throughout Petal.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ StockAdjustment │   │  Transaction    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  stock (stems)  │◄──│  delta (stems)  │──►│  amount (>0)    │       │
//! │  │  units/package  │   │  reason         │   │  income/expense │       │
//! │  │  care intervals │   └─────────────────┘   └─────────────────┘       │
//! │  └────────┬────────┘                                                    │
//! │           │ care_days_*                                                 │
//! │  ┌────────▼────────┐   ┌─────────────────┐                             │
//! │  │     Batch       │──►│ MaintenanceTask │  (derived, never stored)    │
//! │  │  last_*_at      │   │  due_at/overdue │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A flower product. `stock` is always a stem count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown at the counter and in the workshop.
    pub name: String,

    /// Sale price per stem, in cents.
    pub price_cents: i64,

    /// Purchase cost per stem, in cents. Drives shrinkage expenses.
    pub cost_cents: i64,

    /// Stems contained in one purchasing package (≥ 1).
    pub units_per_package: i64,

    /// Stems on hand. Never negative.
    pub stock: i64,

    /// Days a batch of this flower may go before its water is changed.
    pub care_days_water: i64,

    /// Days a batch of this flower may go before stems are re-cut.
    pub care_days_cut: i64,

    /// Soft delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Care intervals of this flower species.
    pub fn care_intervals(&self) -> CareIntervals {
        CareIntervals {
            water_days: self.care_days_water,
            cut_days: self.care_days_cut,
        }
    }

    /// Checks whether `stems` can be withdrawn right now.
    pub fn has_stems(&self, stems: i64) -> bool {
        self.stock >= stems
    }
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Why a product's stem count is changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockReason {
    /// Stems received from a supplier.
    Restock,
    /// Stems lost to spoilage or damage.
    Shrinkage,
    /// Stems sold at the counter.
    Sale,
    /// Stems returned to stock after a sale was undone.
    SaleReversal,
}

impl StockReason {
    /// Checks that the delta points the right way for this reason.
    ///
    /// ```text
    /// Restock, SaleReversal  → delta > 0
    /// Shrinkage, Sale        → delta < 0
    /// ```
    pub fn validate_delta(&self, delta: i64) -> CoreResult<()> {
        let ok = match self {
            StockReason::Restock | StockReason::SaleReversal => delta > 0,
            StockReason::Shrinkage | StockReason::Sale => delta < 0,
        };
        if ok {
            Ok(())
        } else {
            Err(CoreError::invalid_quantity(
                format!("{} delta", self.as_str()),
                delta,
            ))
        }
    }

    /// The ledger entry an adjustment with this reason posts, if any.
    pub fn posts(&self) -> Option<TransactionKind> {
        match self {
            StockReason::Restock => None,
            StockReason::Sale => Some(TransactionKind::Income),
            StockReason::Shrinkage | StockReason::SaleReversal => Some(TransactionKind::Expense),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockReason::Restock => "restock",
            StockReason::Shrinkage => "shrinkage",
            StockReason::Sale => "sale",
            StockReason::SaleReversal => "sale_reversal",
        }
    }
}

/// An intent to change one product's stem count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub product_id: String,
    /// Signed stem delta.
    pub delta: i64,
    pub reason: StockReason,
    pub note: Option<String>,
    /// Opaque caller identity, recorded for audit only.
    pub actor: Option<String>,
}

impl StockAdjustment {
    pub fn new(product_id: impl Into<String>, delta: i64, reason: StockReason) -> Self {
        StockAdjustment {
            product_id: product_id.into(),
            delta,
            reason,
            note: None,
            actor: None,
        }
    }

    /// Adds `stems` received from a supplier.
    pub fn restock(product_id: impl Into<String>, stems: i64) -> Self {
        Self::new(product_id, stems, StockReason::Restock)
    }

    /// Writes off `stems` lost to spoilage.
    pub fn shrinkage(product_id: impl Into<String>, stems: i64) -> Self {
        Self::new(product_id, -stems, StockReason::Shrinkage)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Amount of the paired ledger entry for this adjustment.
    ///
    /// Sales and reversals are valued at the sale price, shrinkage at cost.
    pub fn valuation(&self, product: &Product) -> CoreResult<Money> {
        let stems = self.delta.unsigned_abs();
        let unit = match self.reason {
            StockReason::Shrinkage => product.cost(),
            StockReason::Restock | StockReason::Sale | StockReason::SaleReversal => {
                product.price()
            }
        };
        i64::try_from(stems)
            .ok()
            .and_then(|stems| unit.checked_multiply_quantity(stems))
            .ok_or_else(|| CoreError::amount_overflow(self.describe(product)))
    }

    /// Ledger description for the paired entry.
    pub fn describe(&self, product: &Product) -> String {
        let label = match self.reason {
            StockReason::Restock => "Restock",
            StockReason::Shrinkage => "Shrinkage",
            StockReason::Sale => "Sale",
            StockReason::SaleReversal => "Sale reversal",
        };
        format!("{}: {} stems of {}", label, self.delta.unsigned_abs(), product.name)
    }
}

/// One applied adjustment, kept as an append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub delta: i64,
    pub reason: StockReason,
    pub note: Option<String>,
    pub actor: Option<String>,
    /// Stem count right after this movement was applied.
    pub stock_after: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// Direction of a financial movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// An immutable financial record. `amount_cents` is always a positive
/// magnitude; the direction lives in `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub actor: Option<String>,
}

impl Transaction {
    /// Builds a new ledger entry.
    ///
    /// ## Errors
    /// - `InvalidAmount` unless `amount` > 0
    /// - `Validation` for an empty description
    pub fn new(
        description: impl Into<String>,
        amount: Money,
        kind: TransactionKind,
        date: DateTime<Utc>,
        actor: Option<String>,
    ) -> CoreResult<Self> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidAmount {
                cents: amount.cents(),
            });
        }
        let description = description.into();
        if description.trim().is_empty() {
            return Err(crate::error::ValidationError::Required {
                field: "description".to_string(),
            }
            .into());
        }
        Ok(Transaction {
            id: Uuid::new_v4().to_string(),
            description,
            amount_cents: amount.cents(),
            kind,
            date,
            actor,
        })
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Signed contribution of this entry to the shop's net.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::Income => self.amount(),
            TransactionKind::Expense => Money::zero() - self.amount(),
        }
    }
}

/// Income/expense totals over a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerSummary {
    pub income: Money,
    pub expense: Money,
    pub entries: i64,
}

impl LedgerSummary {
    pub fn net(&self) -> Money {
        self.income - self.expense
    }

    /// Folds a set of entries into totals.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Transaction>) -> Self {
        entries
            .into_iter()
            .fold(LedgerSummary::default(), |mut acc, tx| {
                match tx.kind {
                    TransactionKind::Income => acc.income += tx.amount(),
                    TransactionKind::Expense => acc.expense += tx.amount(),
                }
                acc.entries += 1;
                acc
            })
    }
}

// =============================================================================
// Batch (Balde)
// =============================================================================

/// Lifecycle status of a batch. `Discarded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Active,
    Discarded,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "active",
            BatchStatus::Discarded => "discarded",
        }
    }
}

/// A bucket of already-withdrawn stems standing in water.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    /// Product whose care intervals drive this batch's schedule.
    pub source_product_id: String,
    pub stem_count: i64,
    pub status: BatchStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_water_change_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_cut_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub discarded_at: Option<DateTime<Utc>>,
}

/// Care intervals, in whole days, read live from the source product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CareIntervals {
    pub water_days: i64,
    pub cut_days: i64,
}

impl CareIntervals {
    pub fn water(&self) -> Duration {
        Duration::days(self.water_days)
    }

    pub fn cut(&self) -> Duration {
        Duration::days(self.cut_days)
    }
}

// =============================================================================
// Maintenance Task
// =============================================================================

/// The kind of care a batch needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    WaterChange,
    Cut,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::WaterChange => "water_change",
            TaskKind::Cut => "cut",
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "water" | "water_change" | "water-change" => Ok(TaskKind::WaterChange),
            "cut" | "stem_cut" => Ok(TaskKind::Cut),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "task kind".to_string(),
                reason: format!("unknown task '{}', expected water or cut", other),
            }
            .into()),
        }
    }
}

/// A due maintenance task. Projected from batch state, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MaintenanceTask {
    pub batch_id: String,
    pub kind: TaskKind,
    #[ts(as = "String")]
    pub due_at: DateTime<Utc>,
    /// True once `now` is strictly past `due_at`.
    pub overdue: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rose() -> Product {
        let now = Utc::now();
        Product {
            id: "rose".to_string(),
            name: "Red Rose".to_string(),
            price_cents: 250,
            cost_cents: 90,
            units_per_package: 10,
            stock: 50,
            care_days_water: 2,
            care_days_cut: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reason_direction() {
        assert!(StockReason::Restock.validate_delta(20).is_ok());
        assert!(StockReason::Restock.validate_delta(-20).is_err());
        assert!(StockReason::Shrinkage.validate_delta(-15).is_ok());
        assert!(StockReason::Sale.validate_delta(0).is_err());
        assert!(StockReason::SaleReversal.validate_delta(3).is_ok());
    }

    #[test]
    fn test_reason_posts() {
        assert_eq!(StockReason::Restock.posts(), None);
        assert_eq!(StockReason::Sale.posts(), Some(TransactionKind::Income));
        assert_eq!(StockReason::Shrinkage.posts(), Some(TransactionKind::Expense));
    }

    #[test]
    fn test_shrinkage_valued_at_cost() {
        let product = rose();
        let adj = StockAdjustment::shrinkage("rose", 15);
        assert_eq!(adj.delta, -15);
        assert_eq!(adj.valuation(&product).unwrap().cents(), 15 * 90);
        assert_eq!(adj.describe(&product), "Shrinkage: 15 stems of Red Rose");
    }

    #[test]
    fn test_valuation_overflow_is_invalid_amount() {
        let product = rose();
        let adj = StockAdjustment::new("rose", i64::MIN, StockReason::Sale);
        let err = adj.valuation(&product).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidAmount);
    }

    #[test]
    fn test_ledger_summary() {
        let now = Utc::now();
        let entry = |kind, cents| Transaction {
            id: "t".to_string(),
            description: "x".to_string(),
            amount_cents: cents,
            kind,
            date: now,
            actor: None,
        };
        let entries = vec![
            entry(TransactionKind::Income, 5000),
            entry(TransactionKind::Expense, 1350),
            entry(TransactionKind::Income, 750),
        ];
        let summary = LedgerSummary::from_entries(&entries);
        assert_eq!(summary.income.cents(), 5750);
        assert_eq!(summary.expense.cents(), 1350);
        assert_eq!(summary.net().cents(), 4400);
        assert_eq!(summary.entries, 3);
        assert_eq!(entries[1].signed_amount().cents(), -1350);
    }

    #[test]
    fn test_transaction_amount_must_be_positive() {
        let now = Utc::now();
        let err = Transaction::new("x", Money::zero(), TransactionKind::Income, now, None)
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidAmount { cents: 0 });
        assert!(Transaction::new(
            "x",
            Money::from_cents(-5),
            TransactionKind::Expense,
            now,
            None
        )
        .is_err());
        assert!(
            Transaction::new(" ", Money::from_cents(5), TransactionKind::Expense, now, None)
                .is_err()
        );

        let tx = Transaction::new(
            "Shrinkage",
            Money::from_cents(1350),
            TransactionKind::Expense,
            now,
            Some("ana".to_string()),
        )
        .unwrap();
        assert_eq!(tx.amount_cents, 1350);
        assert_eq!(tx.actor.as_deref(), Some("ana"));
    }

    #[test]
    fn test_task_kind_parsing() {
        assert_eq!("water".parse::<TaskKind>().unwrap(), TaskKind::WaterChange);
        assert_eq!("CUT".parse::<TaskKind>().unwrap(), TaskKind::Cut);
        assert!("prune".parse::<TaskKind>().is_err());
    }
}
