//! ItemVoided event applier

use crate::checks::traits::EventApplier;
use shared::check::money;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload, ItemStatus};

pub struct ItemVoidedApplier;

impl EventApplier for ItemVoidedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::ItemVoided {
            instance_id,
            reason,
            ..
        } = &event.payload
        {
            if let Some(item) = snapshot
                .items
                .iter_mut()
                .find(|i| i.instance_id == *instance_id)
            {
                item.item_status = ItemStatus::Voided;
                item.void_reason = reason.clone();
            }
            money::recalculate_totals(snapshot);
            super::finish(snapshot, event);
        }
    }
}
