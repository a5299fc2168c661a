//! FinalizeItem command handler
//!
//! Pending items carry provisional modifiers ("fire now, finalize
//! later"). Finalizing replaces the modifiers and makes the item active.

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{
    CheckEvent, CheckEventType, CommandErrorCode, EventPayload, ItemModifier, ItemStatus,
};

/// FinalizeItem action
#[derive(Debug, Clone)]
pub struct FinalizeItemAction {
    pub check_id: String,
    pub instance_id: String,
    pub modifiers: Vec<ItemModifier>,
}

#[async_trait]
impl CommandHandler for FinalizeItemAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let item = snapshot
            .find_item(&self.instance_id)
            .ok_or_else(|| CheckError::ItemNotFound(self.instance_id.clone()))?;

        match item.item_status {
            ItemStatus::Pending => {}
            ItemStatus::Voided => {
                return Err(CheckError::InvalidOperation(
                    CommandErrorCode::ItemAlreadyVoided,
                    format!("Item {} is already voided", self.instance_id),
                ));
            }
            ItemStatus::Active => {
                return Err(CheckError::InvalidOperation(
                    CommandErrorCode::InvalidOperation,
                    format!("Item {} is not pending", self.instance_id),
                ));
            }
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::ItemFinalized,
            EventPayload::ItemFinalized {
                instance_id: self.instance_id.clone(),
                modifiers: self.modifiers.clone(),
            },
        );

        Ok(vec![event])
    }
}
