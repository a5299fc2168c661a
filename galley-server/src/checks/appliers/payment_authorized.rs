//! PaymentAuthorized event applier
//!
//! Records the authorization. Authorized payments do not apply against
//! the balance until captured.

use crate::checks::traits::EventApplier;
use rust_decimal::Decimal;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload, PaymentRecord, PaymentStatus};

pub struct PaymentAuthorizedApplier;

impl EventApplier for PaymentAuthorizedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::PaymentAuthorized {
            payment_id,
            tender_id,
            amount,
            gateway_txn_id,
        } = &event.payload
        {
            snapshot.payments.push(PaymentRecord {
                payment_id: payment_id.clone(),
                tender_id: tender_id.clone(),
                amount: *amount,
                tip: Decimal::ZERO,
                status: PaymentStatus::Authorized,
                gateway_txn_id: Some(gateway_txn_id.clone()),
                refunded_amount: Decimal::ZERO,
                created_at: event.timestamp,
                updated_at: event.timestamp,
            });
            super::finish(snapshot, event);
        }
    }
}
