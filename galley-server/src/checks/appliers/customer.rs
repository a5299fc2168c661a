//! CustomerAttached / CustomerDetached event appliers

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload};

pub struct CustomerAttachedApplier;

impl EventApplier for CustomerAttachedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::CustomerAttached { customer_id } = &event.payload {
            snapshot.customer_id = Some(customer_id.clone());
            super::finish(snapshot, event);
        }
    }
}

pub struct CustomerDetachedApplier;

impl EventApplier for CustomerDetachedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::CustomerDetached {} = &event.payload {
            snapshot.customer_id = None;
            super::finish(snapshot, event);
        }
    }
}
