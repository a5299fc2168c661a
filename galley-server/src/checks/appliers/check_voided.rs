//! CheckVoided event applier

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, CheckStatus, EventPayload};

pub struct CheckVoidedApplier;

impl EventApplier for CheckVoidedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::CheckVoided { .. } = &event.payload {
            snapshot.status = CheckStatus::Voided;
            snapshot.closed_at = Some(event.timestamp);
            super::finish(snapshot, event);
        }
    }
}
