//! RecordPaymentVoid command handler
//!
//! Pre-capture cancel: only an authorized payment can be voided. A
//! captured payment must go through the refund path.

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{
    CheckEvent, CheckEventType, CommandErrorCode, EventPayload, PaymentStatus,
};

/// RecordPaymentVoid action
#[derive(Debug, Clone)]
pub struct RecordPaymentVoidAction {
    pub check_id: String,
    pub payment_id: String,
}

#[async_trait]
impl CommandHandler for RecordPaymentVoidAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let payment = snapshot
            .find_payment(&self.payment_id)
            .ok_or_else(|| CheckError::PaymentNotFound(self.payment_id.clone()))?;

        match payment.status {
            PaymentStatus::Authorized => {}
            PaymentStatus::Captured | PaymentStatus::Refunded => {
                return Err(CheckError::InvalidOperation(
                    CommandErrorCode::PaymentStateConflict,
                    format!(
                        "Payment {} is captured; use refund instead of void",
                        self.payment_id
                    ),
                ));
            }
            PaymentStatus::Voided => {
                return Err(CheckError::InvalidOperation(
                    CommandErrorCode::PaymentStateConflict,
                    format!("Payment {} is already voided", self.payment_id),
                ));
            }
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::PaymentVoided,
            EventPayload::PaymentVoided {
                payment_id: self.payment_id.clone(),
            },
        );

        Ok(vec![event])
    }
}
