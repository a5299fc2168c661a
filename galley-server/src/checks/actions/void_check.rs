//! VoidCheck command handler
//!
//! Cancel-transaction at the check level. Only legal while nothing has
//! been sent: send-then-cancel is not a check void, it is a per-item
//! void through the approval path. Captured payments also block the
//! void - money must be refunded, not erased.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{CheckEvent, CheckEventType, CommandErrorCode, EventPayload};

/// VoidCheck action
#[derive(Debug, Clone)]
pub struct VoidCheckAction {
    pub check_id: String,
    pub reason: Option<String>,
    pub authorizer_id: Option<String>,
    pub authorizer_name: Option<String>,
}

#[async_trait]
impl CommandHandler for VoidCheckAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        if snapshot.has_sent_items() {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::SentItemsRemain,
                "Check has sent items; void them individually with approval".to_string(),
            ));
        }

        if snapshot.applied_payment_total() > Decimal::ZERO {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::PaymentStateConflict,
                "Check has captured payments; refund them before voiding".to_string(),
            ));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::CheckVoided,
            EventPayload::CheckVoided {
                reason: self.reason.clone(),
                authorizer_id: self.authorizer_id.clone(),
                authorizer_name: self.authorizer_name.clone(),
            },
        );

        Ok(vec![event])
    }
}
