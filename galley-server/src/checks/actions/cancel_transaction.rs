//! CancelTransaction command handler
//!
//! Voids every unsent item in one atomic batch (the void-unsent-then-
//! sign-out path). Sent items are untouched; the caller learns how many
//! remain so it can warn that they need normal per-item handling.

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{CheckEvent, CheckEventType, EventPayload, ItemStatus};

/// CancelTransaction action
#[derive(Debug, Clone)]
pub struct CancelTransactionAction {
    pub check_id: String,
}

#[async_trait]
impl CommandHandler for CancelTransactionAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let mut events = Vec::new();
        for item in snapshot
            .items
            .iter()
            .filter(|i| !i.sent && i.item_status != ItemStatus::Voided)
        {
            let seq = ctx.next_sequence();
            events.push(metadata.event(
                seq,
                self.check_id.clone(),
                CheckEventType::ItemVoided,
                EventPayload::ItemVoided {
                    instance_id: item.instance_id.clone(),
                    item_name: item.name.clone(),
                    was_sent: false,
                    reason: Some("transaction cancelled".to_string()),
                    authorizer_id: None,
                    authorizer_name: None,
                },
            ));
        }

        Ok(events)
    }
}
