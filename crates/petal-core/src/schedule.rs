//! # Maintenance Scheduler
//!
//! Projects due maintenance tasks from live batch state and a point in
//! time. Nothing here is stored: completing a task moves the batch's
//! `last_*_at` timestamp, and the task simply stops being projected.
//!
//! ## Ordering
//! ```text
//! 1. due_at ascending        (most overdue first)
//! 2. batch created_at asc    (oldest batch first)
//! 3. batch id, then kind     (water change before cut)
//! ```

use chrono::{DateTime, Utc};

use crate::types::{Batch, CareIntervals, MaintenanceTask, TaskKind};

const KINDS: [TaskKind; 2] = [TaskKind::WaterChange, TaskKind::Cut];

/// Sort key of one due task. Tasks themselves are built on iteration.
#[derive(Debug, Clone)]
struct DueKey {
    due_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    batch: usize,
    kind: TaskKind,
}

/// The due-task list for one instant.
///
/// Iterating is lazy and can be restarted any number of times with
/// [`DueTasks::iter`]; every pass yields the same finite sequence.
#[derive(Debug, Clone)]
pub struct DueTasks {
    now: DateTime<Utc>,
    batch_ids: Vec<String>,
    keys: Vec<DueKey>,
}

impl DueTasks {
    /// Builds the projection over `(batch, current care intervals)` pairs.
    ///
    /// Discarded batches never yield tasks. Each active batch yields at
    /// most one task per kind, and only once `due_at ≤ now`.
    pub fn project<I>(batches: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (Batch, CareIntervals)>,
    {
        let mut batch_ids = Vec::new();
        let mut keys = Vec::new();

        for (batch, care) in batches {
            if !batch.is_active() {
                continue;
            }
            let index = batch_ids.len();
            for kind in KINDS {
                let due_at = batch.next_due(kind, &care);
                if due_at <= now {
                    keys.push(DueKey {
                        due_at,
                        created_at: batch.created_at,
                        batch: index,
                        kind,
                    });
                }
            }
            batch_ids.push(batch.id);
        }

        keys.sort_by(|a, b| {
            a.due_at
                .cmp(&b.due_at)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| batch_ids[a.batch].cmp(&batch_ids[b.batch]))
                .then(a.kind.cmp(&b.kind))
        });

        DueTasks {
            now,
            batch_ids,
            keys,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MaintenanceTask> + '_ {
        self.keys.iter().map(move |key| MaintenanceTask {
            batch_id: self.batch_ids[key.batch].clone(),
            kind: key.kind,
            due_at: key.due_at,
            overdue: is_overdue(key.due_at, self.now),
        })
    }
}

/// Strictly past due.
pub fn is_overdue(due_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > due_at
}
