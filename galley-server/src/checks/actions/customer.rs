//! AttachCustomer / DetachCustomer command handlers
//!
//! Loyalty attachment is optional metadata on the check; point earning
//! happens after close, outside the state machine.

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{CheckEvent, CheckEventType, CommandErrorCode, EventPayload};

#[derive(Debug, Clone)]
pub struct AttachCustomerAction {
    pub check_id: String,
    pub customer_id: String,
}

#[derive(Debug, Clone)]
pub struct DetachCustomerAction {
    pub check_id: String,
}

#[async_trait]
impl CommandHandler for AttachCustomerAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        if self.customer_id.is_empty() {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::ValidationFailed,
                "customer_id must not be empty".to_string(),
            ));
        }

        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::CustomerAttached,
            EventPayload::CustomerAttached {
                customer_id: self.customer_id.clone(),
            },
        );

        Ok(vec![event])
    }
}

#[async_trait]
impl CommandHandler for DetachCustomerAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        if snapshot.customer_id.is_none() {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::InvalidOperation,
                "No customer attached".to_string(),
            ));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::CustomerDetached,
            EventPayload::CustomerDetached {},
        );

        Ok(vec![event])
    }
}
