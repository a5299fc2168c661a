//! PaymentCaptured event applier
//!
//! Two shapes share this event: capture of an existing authorization
//! (payment already in the snapshot, tip added now) and a cash-style
//! direct capture (payment created here, `tender_id` set).

use crate::checks::traits::EventApplier;
use rust_decimal::Decimal;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload, PaymentRecord, PaymentStatus};

pub struct PaymentCapturedApplier;

impl EventApplier for PaymentCapturedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::PaymentCaptured {
            payment_id,
            tender_id,
            amount,
            tip,
        } = &event.payload
        {
            match snapshot
                .payments
                .iter_mut()
                .find(|p| p.payment_id == *payment_id)
            {
                Some(payment) => {
                    payment.status = PaymentStatus::Captured;
                    payment.tip = *tip;
                    payment.updated_at = event.timestamp;
                }
                None => {
                    snapshot.payments.push(PaymentRecord {
                        payment_id: payment_id.clone(),
                        tender_id: tender_id.clone().unwrap_or_default(),
                        amount: *amount,
                        tip: *tip,
                        status: PaymentStatus::Captured,
                        gateway_txn_id: None,
                        refunded_amount: Decimal::ZERO,
                        created_at: event.timestamp,
                        updated_at: event.timestamp,
                    });
                }
            }
            super::finish(snapshot, event);
        }
    }
}
