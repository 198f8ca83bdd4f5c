//! # Batch Repository
//!
//! Batch Lifecycle Manager. Owns batch records; never touches product
//! stock (stems in a batch are already withdrawn).
//!
//! Every mutation loads the batch, applies the rule from
//! `petal_core::batch`, then writes back with a status guard so a
//! concurrent discard cannot be overwritten.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use petal_core::{Batch, BatchStatus, CareIntervals, CoreError, TaskKind};

const BATCH_COLUMNS: &str = "id, source_product_id, stem_count, status, created_at, \
     last_water_change_at, last_cut_at, discarded_at";

/// A batch joined with its source product's current care intervals.
#[derive(Debug, Clone, sqlx::FromRow)]
struct BatchCareRow {
    #[sqlx(flatten)]
    batch: Batch,
    care_days_water: i64,
    care_days_cut: i64,
}

impl BatchCareRow {
    fn into_pair(self) -> (Batch, CareIntervals) {
        (
            self.batch,
            CareIntervals {
                water_days: self.care_days_water,
                cut_days: self.care_days_cut,
            },
        )
    }
}

/// Next due times of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextDue {
    pub batch_id: String,
    pub water_change: DateTime<Utc>,
    pub cut: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Creates an active batch of `stem_count` stems of a product.
    ///
    /// ## Errors
    /// - `InvalidStemCount` if `stem_count` ≤ 0
    /// - `NotFound` for an unknown source product
    pub async fn create(
        &self,
        source_product_id: &str,
        stem_count: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Batch> {
        let batch = Batch::new(source_product_id, stem_count, now)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(source_product_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Product", source_product_id));
        }

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, source_product_id, stem_count, status, created_at,
                last_water_change_at, last_cut_at, discarded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.source_product_id)
        .bind(batch.stem_count)
        .bind(batch.status)
        .bind(batch.created_at)
        .bind(batch.last_water_change_at)
        .bind(batch.last_cut_at)
        .bind(batch.discarded_at)
        .execute(&self.pool)
        .await?;

        info!(
            id = %batch.id,
            source_product_id = %source_product_id,
            stem_count,
            "Batch created"
        );
        Ok(batch)
    }

    pub async fn get(&self, id: &str) -> DbResult<Batch> {
        let sql = format!("SELECT {} FROM batches WHERE id = ?1", BATCH_COLUMNS);
        sqlx::query_as::<_, Batch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Batch", id))
    }

    /// Sets `last_water_change_at = now`.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown batch
    /// - `InvalidState` if the batch is discarded
    pub async fn record_water_change(&self, id: &str, now: DateTime<Utc>) -> DbResult<Batch> {
        self.record(id, TaskKind::WaterChange, now).await
    }

    /// Sets `last_cut_at = now`. Same errors as `record_water_change`.
    pub async fn record_cut(&self, id: &str, now: DateTime<Utc>) -> DbResult<Batch> {
        self.record(id, TaskKind::Cut, now).await
    }

    pub(crate) async fn record(
        &self,
        id: &str,
        kind: TaskKind,
        now: DateTime<Utc>,
    ) -> DbResult<Batch> {
        let mut batch = self.get(id).await?;
        batch.record_task(kind, now)?;

        let sql = match kind {
            TaskKind::WaterChange => {
                "UPDATE batches SET last_water_change_at = ?2 WHERE id = ?1 AND status = 'active'"
            }
            TaskKind::Cut => "UPDATE batches SET last_cut_at = ?2 WHERE id = ?1 AND status = 'active'",
        };
        let result = sqlx::query(sql)
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Discarded between our read and write.
            return Err(CoreError::invalid_state("Batch", id, BatchStatus::Discarded.as_str()).into());
        }

        debug!(id = %id, task = kind.as_str(), at = %now, "Batch care recorded");
        Ok(batch)
    }

    /// Retires a batch. Idempotent: discarding twice keeps the first
    /// `discarded_at`.
    pub async fn discard(&self, id: &str, now: DateTime<Utc>) -> DbResult<Batch> {
        let mut batch = self.get(id).await?;
        if !batch.discard(now) {
            debug!(id = %id, "Batch already discarded");
            return Ok(batch);
        }

        let result = sqlx::query(
            "UPDATE batches SET status = ?2, discarded_at = ?3 WHERE id = ?1 AND status = 'active'",
        )
        .bind(id)
        .bind(BatchStatus::Discarded)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return self.get(id).await;
        }

        info!(id = %id, "Batch discarded");
        Ok(batch)
    }

    /// Active batches with their source product's current care intervals,
    /// oldest first.
    pub async fn list_active_with_care(&self) -> DbResult<Vec<(Batch, CareIntervals)>> {
        let rows = sqlx::query_as::<_, BatchCareRow>(
            r#"
            SELECT
                b.id, b.source_product_id, b.stem_count, b.status, b.created_at,
                b.last_water_change_at, b.last_cut_at, b.discarded_at,
                p.care_days_water, p.care_days_cut
            FROM batches b
            INNER JOIN products p ON p.id = b.source_product_id
            WHERE b.status = 'active'
            ORDER BY b.created_at, b.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BatchCareRow::into_pair).collect())
    }

    /// Active batches, oldest first.
    pub async fn list_active(&self) -> DbResult<Vec<Batch>> {
        Ok(self
            .list_active_with_care()
            .await?
            .into_iter()
            .map(|(batch, _)| batch)
            .collect())
    }

    /// Current care intervals for a batch, read live from its product.
    pub async fn care_for(&self, id: &str) -> DbResult<(Batch, CareIntervals)> {
        let row = sqlx::query_as::<_, BatchCareRow>(
            r#"
            SELECT
                b.id, b.source_product_id, b.stem_count, b.status, b.created_at,
                b.last_water_change_at, b.last_cut_at, b.discarded_at,
                p.care_days_water, p.care_days_cut
            FROM batches b
            INNER JOIN products p ON p.id = b.source_product_id
            WHERE b.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Batch", id))?;

        Ok(row.into_pair())
    }

    /// Next water change and cut due times of a batch.
    pub async fn next_due(&self, id: &str) -> DbResult<NextDue> {
        let (batch, care) = self.care_for(id).await?;
        Ok(NextDue {
            water_change: batch.next_water_due(&care),
            cut: batch.next_cut_due(&care),
            batch_id: batch.id,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
