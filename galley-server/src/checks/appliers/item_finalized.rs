//! ItemFinalized event applier

use crate::checks::traits::EventApplier;
use shared::check::money;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload, ItemStatus};

pub struct ItemFinalizedApplier;

impl EventApplier for ItemFinalizedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::ItemFinalized {
            instance_id,
            modifiers,
        } = &event.payload
        {
            if let Some(item) = snapshot
                .items
                .iter_mut()
                .find(|i| i.instance_id == *instance_id)
            {
                item.modifiers = modifiers.clone();
                item.item_status = ItemStatus::Active;
            }
            money::recalculate_totals(snapshot);
            super::finish(snapshot, event);
        }
    }
}
