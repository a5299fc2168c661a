//! CheckClosed event applier

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, CheckStatus, EventPayload};

pub struct CheckClosedApplier;

impl EventApplier for CheckClosedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::CheckClosed { .. } = &event.payload {
            snapshot.status = CheckStatus::Closed;
            snapshot.closed_at = Some(event.timestamp);
            super::finish(snapshot, event);
        }
    }
}
