//! RoundSent event applier
//!
//! Marks every item in the round as sent (irreversible) and records the
//! round. Totals are untouched - sending changes routing state, not
//! money.

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload, RoundRecord};

pub struct RoundSentApplier;

impl EventApplier for RoundSentApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::RoundSent {
            round_number,
            items,
            ..
        } = &event.payload
        {
            for round_item in items {
                if let Some(item) = snapshot
                    .items
                    .iter_mut()
                    .find(|i| i.instance_id == round_item.instance_id)
                {
                    item.sent = true;
                }
            }
            snapshot.rounds.push(RoundRecord {
                round_number: *round_number,
                sent_at: event.timestamp,
                items: items.clone(),
            });
            super::finish(snapshot, event);
        }
    }
}
