//! # Batch Lifecycle
//!
//! Pure rules for buckets of stems standing in water.
//!
//! ```text
//! active ──discard──► discarded   (terminal, operator decision only)
//!   │
//!   ├── record_water_change(now) → last_water_change_at = now
//!   └── record_cut(now)          → last_cut_at = now
//! ```
//!
//! Due times are never stored. They are derived from the batch's own
//! timestamps and the *current* care intervals of its source product, so
//! editing a product's interval reschedules every live batch of it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{Batch, BatchStatus, CareIntervals, TaskKind};

impl Batch {
    /// Creates an active batch with both care clocks started at `now`.
    ///
    /// ## Errors
    /// - `InvalidStemCount` if `stem_count` ≤ 0
    pub fn new(
        source_product_id: impl Into<String>,
        stem_count: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if stem_count <= 0 {
            return Err(CoreError::InvalidStemCount { count: stem_count });
        }
        Ok(Batch {
            id: Uuid::new_v4().to_string(),
            source_product_id: source_product_id.into(),
            stem_count,
            status: BatchStatus::Active,
            created_at: now,
            last_water_change_at: now,
            last_cut_at: now,
            discarded_at: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }

    fn ensure_active(&self) -> CoreResult<()> {
        if !self.is_active() {
            return Err(CoreError::invalid_state(
                "Batch",
                &self.id,
                self.status.as_str(),
            ));
        }
        Ok(())
    }

    pub fn record_water_change(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_active()?;
        self.last_water_change_at = now;
        Ok(())
    }

    pub fn record_cut(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_active()?;
        self.last_cut_at = now;
        Ok(())
    }

    /// Records that the task of `kind` was just done.
    pub fn record_task(&mut self, kind: TaskKind, now: DateTime<Utc>) -> CoreResult<()> {
        match kind {
            TaskKind::WaterChange => self.record_water_change(now),
            TaskKind::Cut => self.record_cut(now),
        }
    }

    /// Retires the batch. Returns `false` if it was already discarded.
    pub fn discard(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = BatchStatus::Discarded;
        self.discarded_at = Some(now);
        true
    }

    pub fn next_water_due(&self, care: &CareIntervals) -> DateTime<Utc> {
        self.last_water_change_at + care.water()
    }

    pub fn next_cut_due(&self, care: &CareIntervals) -> DateTime<Utc> {
        self.last_cut_at + care.cut()
    }

    pub fn next_due(&self, kind: TaskKind, care: &CareIntervals) -> DateTime<Utc> {
        match kind {
            TaskKind::WaterChange => self.next_water_due(care),
            TaskKind::Cut => self.next_cut_due(care),
        }
    }
}
