//! RecordCapture command handler
//!
//! Captures an authorized payment. The tip is added at capture time:
//! the captured value is `authorized amount + tip`, while the base
//! amount is what applies against the check balance.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{
    CheckEvent, CheckEventType, CommandErrorCode, EventPayload, PaymentStatus,
};

/// RecordCapture action
#[derive(Debug, Clone)]
pub struct RecordCaptureAction {
    pub check_id: String,
    pub payment_id: String,
    pub tip: Decimal,
}

#[async_trait]
impl CommandHandler for RecordCaptureAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        if self.tip < Decimal::ZERO {
            return Err(CheckError::InvalidAmount);
        }

        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let payment = snapshot
            .find_payment(&self.payment_id)
            .ok_or_else(|| CheckError::PaymentNotFound(self.payment_id.clone()))?;

        if payment.status != PaymentStatus::Authorized {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::PaymentStateConflict,
                format!(
                    "Payment {} is {:?}, only authorized payments can be captured",
                    self.payment_id, payment.status
                ),
            ));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::PaymentCaptured,
            EventPayload::PaymentCaptured {
                payment_id: self.payment_id.clone(),
                tender_id: None,
                amount: payment.amount,
                tip: self.tip,
            },
        );

        Ok(vec![event])
    }
}
