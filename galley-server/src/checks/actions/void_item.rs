//! VoidItem command handler
//!
//! An unsent item voids freely. A sent item has crossed into kitchen
//! routing; voiding it requires the manager-approval path (an authorizer
//! identity on the command).

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{CheckEvent, CheckEventType, CommandErrorCode, EventPayload, ItemStatus};

/// VoidItem action
#[derive(Debug, Clone)]
pub struct VoidItemAction {
    pub check_id: String,
    pub instance_id: String,
    pub reason: Option<String>,
    pub authorizer_id: Option<String>,
    pub authorizer_name: Option<String>,
}

#[async_trait]
impl CommandHandler for VoidItemAction {
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

        if item.item_status == ItemStatus::Voided {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::ItemAlreadyVoided,
                format!("Item {} is already voided", self.instance_id),
            ));
        }

        if item.sent && self.authorizer_id.is_none() {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::ApprovalRequired,
                format!(
                    "Item {} has been sent; voiding it requires manager approval",
                    self.instance_id
                ),
            ));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::ItemVoided,
            EventPayload::ItemVoided {
                instance_id: self.instance_id.clone(),
                item_name: item.name.clone(),
                was_sent: item.sent,
                reason: self.reason.clone(),
                authorizer_id: self.authorizer_id.clone(),
                authorizer_name: self.authorizer_name.clone(),
            },
        );

        Ok(vec![event])
    }
}
