//! AddItems command handler

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::money;
use shared::check::{
    CheckEvent, CheckEventType, CheckItemInput, CheckItemSnapshot, EventPayload, ItemStatus,
};

/// AddItems action
///
/// `tax_rates` is resolved by CheckManager from the tax table, one rate
/// per input item, before the action runs.
#[derive(Debug, Clone)]
pub struct AddItemsAction {
    pub check_id: String,
    pub items: Vec<CheckItemInput>,
    pub tax_rates: Vec<Decimal>,
}

#[async_trait]
impl CommandHandler for AddItemsAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        if self.items.is_empty() {
            return Err(CheckError::InvalidOperation(
                shared::check::CommandErrorCode::ValidationFailed,
                "items must not be empty".to_string(),
            ));
        }
        for item in &self.items {
            money::validate_item(item)?;
        }

        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        let snapshots: Vec<CheckItemSnapshot> = self
            .items
            .iter()
            .zip(self.tax_rates.iter())
            .map(|(input, tax_rate)| CheckItemSnapshot {
                instance_id: input
                    .instance_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                menu_item_id: input.menu_item_id.clone(),
                name: input.name.clone(),
                unit_price: input.unit_price,
                quantity: input.quantity,
                modifiers: input.modifiers.clone(),
                seat_number: input.seat_number,
                tax_rate: *tax_rate,
                item_status: if input.pending {
                    ItemStatus::Pending
                } else {
                    ItemStatus::Active
                },
                sent: false,
                void_reason: None,
            })
            .collect();

        // duplicate instance ids would corrupt later item references
        for item in &snapshots {
            if snapshot.find_item(&item.instance_id).is_some() {
                return Err(CheckError::InvalidOperation(
                    shared::check::CommandErrorCode::ValidationFailed,
                    format!("duplicate item instance id: {}", item.instance_id),
                ));
            }
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::ItemsAdded,
            EventPayload::ItemsAdded { items: snapshots },
        );

        Ok(vec![event])
    }
}
