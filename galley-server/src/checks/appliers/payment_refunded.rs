//! PaymentRefunded event applier
//!
//! Accumulates the refund; the status flips to refunded only when the
//! full captured value (base + tip) has been returned.

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload, PaymentStatus};

pub struct PaymentRefundedApplier;

impl EventApplier for PaymentRefundedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::PaymentRefunded { payment_id, amount } = &event.payload {
            if let Some(payment) = snapshot
                .payments
                .iter_mut()
                .find(|p| p.payment_id == *payment_id)
            {
                payment.refunded_amount += *amount;
                if payment.refunded_amount >= payment.amount + payment.tip {
                    payment.status = PaymentStatus::Refunded;
                }
                payment.updated_at = event.timestamp;
            }
            super::finish(snapshot, event);
        }
    }
}
