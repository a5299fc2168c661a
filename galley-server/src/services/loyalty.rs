//! Loyalty point earning
//!
//! Point earning triggers only after a check reaches closed, as a
//! fire-and-forget call: it must never block or fail the close.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Loyalty/customer service seam
#[async_trait]
pub trait LoyaltyNotifier: Send + Sync {
    async fn check_closed(&self, check_id: &str, customer_id: &str, total: Decimal);
}

/// Dispatch a close notification without blocking the caller. Outside a
/// tokio runtime (unit tests, shutdown) the notification is skipped with
/// a log line.
pub fn notify_closed(
    notifier: &Arc<dyn LoyaltyNotifier>,
    check_id: String,
    customer_id: String,
    total: Decimal,
) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let notifier = notifier.clone();
            handle.spawn(async move {
                notifier.check_closed(&check_id, &customer_id, total).await;
            });
        }
        Err(_) => {
            tracing::debug!(check_id, "No runtime available, skipping loyalty notification");
        }
    }
}
