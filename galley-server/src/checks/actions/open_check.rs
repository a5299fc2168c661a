//! OpenCheck command handler

use async_trait::async_trait;

use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{CheckEvent, CheckEventType, EventPayload, OrderType};

/// OpenCheck action
///
/// `check_number` is always resolved before the action runs: either the
/// terminal supplied one from its reserved range, or the manager
/// allocated one server-side (outside the write transaction).
#[derive(Debug, Clone)]
pub struct OpenCheckAction {
    pub rvc_id: String,
    pub order_type: OrderType,
    pub check_number: i64,
    pub customer_id: Option<String>,
}

#[async_trait]
impl CommandHandler for OpenCheckAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        if self.rvc_id.is_empty() {
            return Err(CheckError::InvalidOperation(
                shared::check::CommandErrorCode::ValidationFailed,
                "rvc_id must not be empty".to_string(),
            ));
        }

        let check_id = uuid::Uuid::new_v4().to_string();
        let seq = ctx.next_sequence();

        let event = metadata.event(
            seq,
            check_id,
            CheckEventType::CheckOpened,
            EventPayload::CheckOpened {
                check_number: self.check_number,
                rvc_id: self.rvc_id.clone(),
                order_type: self.order_type,
                customer_id: self.customer_id.clone(),
            },
        );

        Ok(vec![event])
    }
}
