//! ItemModified event applier

use crate::checks::traits::EventApplier;
use shared::check::money;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload};

pub struct ItemModifiedApplier;

impl EventApplier for ItemModifiedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::ItemModified {
            instance_id,
            changes,
            ..
        } = &event.payload
        {
            if let Some(item) = snapshot
                .items
                .iter_mut()
                .find(|i| i.instance_id == *instance_id)
            {
                if let Some(price) = changes.unit_price {
                    item.unit_price = price;
                }
                if let Some(quantity) = changes.quantity {
                    item.quantity = quantity;
                }
                if let Some(modifiers) = &changes.modifiers {
                    item.modifiers = modifiers.clone();
                }
                if let Some(seat) = changes.seat_number {
                    item.seat_number = Some(seat);
                }
            }
            money::recalculate_totals(snapshot);
            super::finish(snapshot, event);
        }
    }
}
