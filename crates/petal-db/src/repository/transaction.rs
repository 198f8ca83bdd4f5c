//! # Transaction Recorder
//!
//! Append-only financial ledger. Entries are never updated or deleted
//! (the schema enforces it with triggers); a correction is a new
//! offsetting entry.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use petal_core::{LedgerSummary, Money, Transaction, TransactionKind};

const TRANSACTION_COLUMNS: &str = "id, description, amount_cents, kind, date, actor";

/// Inserts an already-validated entry through any executor.
pub(crate) async fn insert_transaction<'e, E>(executor: E, entry: &Transaction) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        id = %entry.id,
        kind = ?entry.kind,
        amount_cents = entry.amount_cents,
        "Recording transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (id, description, amount_cents, kind, date, actor)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.description)
    .bind(entry.amount_cents)
    .bind(entry.kind)
    .bind(entry.date)
    .bind(&entry.actor)
    .execute(executor)
    .await?;

    Ok(())
}

/// Repository for the financial ledger.
#[derive(Debug, Clone)]
pub struct TransactionRecorder {
    pool: SqlitePool,
}

impl TransactionRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRecorder { pool }
    }

    /// Appends an immutable entry.
    ///
    /// ## Errors
    /// - `InvalidAmount` unless `amount` > 0
    pub async fn record(
        &self,
        description: &str,
        amount: Money,
        kind: TransactionKind,
        date: DateTime<Utc>,
        actor: Option<&str>,
    ) -> DbResult<Transaction> {
        let entry = Transaction::new(description, amount, kind, date, actor.map(str::to_string))?;
        insert_transaction(&self.pool, &entry).await?;

        info!(id = %entry.id, kind = ?kind, amount = %amount, "Transaction recorded");
        Ok(entry)
    }

    pub async fn get(&self, id: &str) -> DbResult<Transaction> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?1", TRANSACTION_COLUMNS);
        sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
    }

    /// Most recent entries first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions ORDER BY date DESC, rowid DESC LIMIT ?1",
            TRANSACTION_COLUMNS
        );
        let entries = sqlx::query_as::<_, Transaction>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Entries dated in `[from, to)`, oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE date >= ?1 AND date < ?2 ORDER BY date, rowid",
            TRANSACTION_COLUMNS
        );
        let entries = sqlx::query_as::<_, Transaction>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Income/expense totals for `[from, to)`.
    pub async fn summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<LedgerSummary> {
        let entries = self.list_between(from, to).await?;
        Ok(LedgerSummary::from_entries(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use petal_core::{CoreError, ErrorKind};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_record_and_get() {
        let db = setup().await;
        let entry = db
            .transactions()
            .record(
                "Wedding arrangement",
                Money::from_cents(18_000),
                TransactionKind::Income,
                day(1),
                Some("ana"),
            )
            .await
            .unwrap();

        let loaded = db.transactions().get(&entry.id).await.unwrap();
        assert_eq!(loaded, entry);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let db = setup().await;
        let err = db
            .transactions()
            .record("Nothing", Money::zero(), TransactionKind::Expense, day(1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidAmount { cents: 0 })));
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert!(db.transactions().list_recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_are_immutable() {
        let db = setup().await;
        let entry = db
            .transactions()
            .record("Vases", Money::from_cents(4_000), TransactionKind::Expense, day(2), None)
            .await
            .unwrap();

        let update = sqlx::query("UPDATE transactions SET amount_cents = 1 WHERE id = ?1")
            .bind(&entry.id)
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(&entry.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_list_between_and_summary() {
        let db = setup().await;
        let recorder = db.transactions();
        recorder
            .record("Sale", Money::from_cents(5_000), TransactionKind::Income, day(1), None)
            .await
            .unwrap();
        recorder
            .record("Shrinkage", Money::from_cents(1_350), TransactionKind::Expense, day(2), None)
            .await
            .unwrap();
        recorder
            .record("Sale", Money::from_cents(900), TransactionKind::Income, day(5), None)
            .await
            .unwrap();

        let window = recorder.list_between(day(1), day(3)).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].kind, TransactionKind::Income);

        let summary = recorder
            .summary(day(1), day(5) + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(summary.income.cents(), 5_900);
        assert_eq!(summary.expense.cents(), 1_350);
        assert_eq!(summary.net().cents(), 4_550);

        let recent = recorder.list_recent(1).await.unwrap();
        assert_eq!(recent[0].amount_cents, 900);
    }
}
