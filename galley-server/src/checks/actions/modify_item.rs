//! ModifyItem command handler
//!
//! Price overrides and modifier edits are only legal before the item is
//! sent. "Sent" is a hard boundary: past it, the only legal transition
//! is a void with approval.

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::money;
use shared::check::{
    CheckEvent, CheckEventType, CommandErrorCode, EventPayload, ItemChanges, ItemStatus,
};

/// ModifyItem action
#[derive(Debug, Clone)]
pub struct ModifyItemAction {
    pub check_id: String,
    pub instance_id: String,
    pub changes: ItemChanges,
}

#[async_trait]
impl CommandHandler for ModifyItemAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        if self.changes.is_empty() {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::ValidationFailed,
                "no changes supplied".to_string(),
            ));
        }
        money::validate_item_changes(&self.changes)?;

        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let item = snapshot
            .find_item(&self.instance_id)
            .ok_or_else(|| CheckError::ItemNotFound(self.instance_id.clone()))?;

        if item.item_status == ItemStatus::Voided {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::ItemAlreadyVoided,
                format!("Item {} is already voided", self.instance_id),
            ));
        }
        if item.sent {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::ItemAlreadySent,
                format!("Item {} has been sent and can no longer be edited", self.instance_id),
            ));
        }

        // snapshot previous values for the fields actually changing
        let previous = ItemChanges {
            unit_price: self.changes.unit_price.map(|_| item.unit_price),
            quantity: self.changes.quantity.map(|_| item.quantity),
            modifiers: self.changes.modifiers.as_ref().map(|_| item.modifiers.clone()),
            seat_number: self.changes.seat_number.and(item.seat_number),
        };

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::ItemModified,
            EventPayload::ItemModified {
                instance_id: self.instance_id.clone(),
                changes: Box::new(self.changes.clone()),
                previous: Box::new(previous),
            },
        );

        Ok(vec![event])
    }
}
