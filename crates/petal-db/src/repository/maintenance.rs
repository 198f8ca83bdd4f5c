//! # Maintenance Scheduler
//!
//! Due tasks are projected from live batch rows on every query
//! (`petal_core::schedule`). There is no task table.
//!
//! ```text
//! list_due_tasks(now) ──► active batches ⋈ products.care_days_* ──► DueTasks
//! complete_task(b, kind, now) ──► batches.last_*_at = now
//! ```

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::batch::BatchRepository;
use petal_core::{Batch, DueTasks, TaskKind};

#[derive(Debug, Clone)]
pub struct MaintenanceScheduler {
    batches: BatchRepository,
}

impl MaintenanceScheduler {
    pub fn new(batches: BatchRepository) -> Self {
        MaintenanceScheduler { batches }
    }

    /// Due and overdue tasks at `now`, most overdue first.
    pub async fn list_due_tasks(&self, now: DateTime<Utc>) -> DbResult<DueTasks> {
        let batches = self.batches.list_active_with_care().await?;
        let tasks = DueTasks::project(batches, now);
        debug!(count = tasks.len(), at = %now, "Projected due tasks");
        Ok(tasks)
    }

    /// Marks a task done. The task disappears from the due list until its
    /// interval elapses again.
    pub async fn complete_task(
        &self,
        batch_id: &str,
        kind: TaskKind,
        now: DateTime<Utc>,
    ) -> DbResult<Batch> {
        match kind {
            TaskKind::WaterChange => self.batches.record_water_change(batch_id, now).await,
            TaskKind::Cut => self.batches.record_cut(batch_id, now).await,
        }
    }
}
