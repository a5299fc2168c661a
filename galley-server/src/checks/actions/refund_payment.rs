//! RecordRefund command handler
//!
//! Refunds always require a captured payment. Partial refunds reduce the
//! refundable balance; the status only flips to refunded when the refund
//! covers the full captured value (base + tip).

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::money;
use shared::check::{
    CheckEvent, CheckEventType, CommandErrorCode, EventPayload, PaymentStatus,
};

/// RecordRefund action
#[derive(Debug, Clone)]
pub struct RecordRefundAction {
    pub check_id: String,
    pub payment_id: String,
    pub amount: Decimal,
}

#[async_trait]
impl CommandHandler for RecordRefundAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        money::validate_amount(self.amount).map_err(|_| CheckError::InvalidAmount)?;

        // refunds are legal on closed checks; only a voided check is off
        // limits
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        if snapshot.is_voided() {
            return Err(CheckError::CheckAlreadyVoided(self.check_id.clone()));
        }

        let payment = snapshot
            .find_payment(&self.payment_id)
            .ok_or_else(|| CheckError::PaymentNotFound(self.payment_id.clone()))?;

        if payment.status != PaymentStatus::Captured {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::PaymentStateConflict,
                format!(
                    "Payment {} is {:?}, only captured payments can be refunded",
                    self.payment_id, payment.status
                ),
            ));
        }

        let refundable = payment.refundable_amount();
        if self.amount > refundable {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::InvalidAmount,
                format!(
                    "Refund amount {} exceeds refundable balance {}",
                    self.amount, refundable
                ),
            ));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::PaymentRefunded,
            EventPayload::PaymentRefunded {
                payment_id: self.payment_id.clone(),
                amount: self.amount,
            },
        );

        Ok(vec![event])
    }
}
