//! CheckOpened event applier

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, CheckStatus, EventPayload};

pub struct CheckOpenedApplier;

impl EventApplier for CheckOpenedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::CheckOpened {
            check_number,
            rvc_id,
            order_type,
            customer_id,
        } = &event.payload
        {
            snapshot.check_id = event.check_id.clone();
            snapshot.check_number = *check_number;
            snapshot.rvc_id = rvc_id.clone();
            snapshot.workstation_id = event.workstation_id.clone();
            snapshot.employee_id = event.employee_id.clone();
            snapshot.employee_name = event.employee_name.clone();
            snapshot.order_type = *order_type;
            snapshot.customer_id = customer_id.clone();
            snapshot.status = CheckStatus::Open;
            snapshot.created_at = event.timestamp;

            super::finish(snapshot, event);
        }
    }
}
