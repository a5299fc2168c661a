//! CloseCheck command handler
//!
//! A check closes when the final payment clears the balance to zero.
//! Pending items and dangling (authorized, uncaptured) payments block
//! the close.

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{
    CheckEvent, CheckEventType, CommandErrorCode, EventPayload, PaymentStatus, PaymentSummaryItem,
};

/// CloseCheck action
#[derive(Debug, Clone)]
pub struct CloseCheckAction {
    pub check_id: String,
}

#[async_trait]
impl CommandHandler for CloseCheckAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let pending = snapshot.pending_count();
        if pending > 0 {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::PendingItemsRemain,
                format!("{pending} pending item(s) must be finalized or voided before closing"),
            ));
        }

        if snapshot.has_dangling_authorization() {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::PaymentStateConflict,
                "An authorized payment must be captured or voided before closing".to_string(),
            ));
        }

        let remaining = snapshot.remaining_due();
        if !remaining.is_zero() {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::BalanceOutstanding,
                format!("Balance of {remaining} is still due"),
            ));
        }

        let payment_summary: Vec<PaymentSummaryItem> = snapshot
            .payments
            .iter()
            .filter(|p| matches!(p.status, PaymentStatus::Captured | PaymentStatus::Refunded))
            .map(|p| PaymentSummaryItem {
                tender_id: p.tender_id.clone(),
                amount: p.applied_amount(),
            })
            .collect();

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::CheckClosed,
            EventPayload::CheckClosed {
                total: snapshot.total,
                payment_summary,
            },
        );

        Ok(vec![event])
    }
}
