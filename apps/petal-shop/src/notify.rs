//! # Notifications
//!
//! Outbound alerts after a ledger mutation has been committed. Delivery is
//! fire-and-forget: a failing notifier is logged and the mutation stands.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Something worth telling staff about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ShopEvent {
    Shrinkage {
        product_id: String,
        product_name: String,
        /// Stems actually written off.
        stems: i64,
        /// Stems asked for but not available.
        clamped: i64,
        value_cents: i64,
        actor: Option<String>,
    },
    OrderCommitted {
        order_id: String,
        total_cents: i64,
        lines: usize,
        actor: Option<String>,
    },
}

#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &ShopEvent) -> Result<(), NotifyError>;
}

/// Default notifier: a tracing event per shop event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &ShopEvent) -> Result<(), NotifyError> {
        match event {
            ShopEvent::Shrinkage {
                product_name,
                stems,
                clamped,
                value_cents,
                ..
            } => info!(
                product = %product_name,
                stems,
                clamped,
                value_cents,
                "Shrinkage recorded"
            ),
            ShopEvent::OrderCommitted {
                order_id,
                total_cents,
                lines,
                ..
            } => info!(order_id = %order_id, total_cents, lines, "Order committed"),
        }
        Ok(())
    }
}
