//! PaymentVoided event applier

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload, PaymentStatus};

pub struct PaymentVoidedApplier;

impl EventApplier for PaymentVoidedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::PaymentVoided { payment_id } = &event.payload {
            if let Some(payment) = snapshot
                .payments
                .iter_mut()
                .find(|p| p.payment_id == *payment_id)
            {
                payment.status = PaymentStatus::Voided;
                payment.updated_at = event.timestamp;
            }
            super::finish(snapshot, event);
        }
    }
}
