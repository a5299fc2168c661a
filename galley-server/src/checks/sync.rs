//! Reconnect synchronization API
//!
//! Terminals catch up after a disconnect by last known sequence:
//! small gaps get incremental events, large gaps get a full sync of open
//! checks. The response carries the server epoch; a changed epoch means
//! the server restarted and the terminal must full-sync regardless of
//! the gap.

use super::manager::{CheckManager, ManagerResult};
use shared::sync::{SyncRequest, SyncResponse};

/// Maximum events returned in an incremental sync. Beyond this a full
/// sync is cheaper than replaying the event tail.
const MAX_INCREMENTAL_EVENTS: usize = 1000;

/// Sync service for handling reconnection
#[derive(Clone)]
pub struct SyncService {
    manager: CheckManager,
}

impl SyncService {
    pub fn new(manager: CheckManager) -> Self {
        Self { manager }
    }

    /// Handle a sync request
    pub fn sync(&self, request: SyncRequest) -> ManagerResult<SyncResponse> {
        let server_sequence = self.manager.get_current_sequence()?;
        let epoch = self.manager.epoch().to_string();

        if request.since_sequence >= server_sequence {
            return Ok(SyncResponse::incremental(vec![], server_sequence, epoch));
        }

        let gap = server_sequence - request.since_sequence;
        if gap > MAX_INCREMENTAL_EVENTS as u64 {
            let open_checks = self.manager.get_open_checks()?;
            return Ok(SyncResponse::full_sync(open_checks, server_sequence, epoch));
        }

        let events = self.manager.get_events_since(request.since_sequence)?;
        if events.len() > MAX_INCREMENTAL_EVENTS {
            let open_checks = self.manager.get_open_checks()?;
            return Ok(SyncResponse::full_sync(open_checks, server_sequence, epoch));
        }

        Ok(SyncResponse::incremental(events, server_sequence, epoch))
    }

    /// Verify a stored snapshot against a rebuild from its events.
    /// Returns false when drift is detected.
    pub fn verify_snapshot(&self, check_id: &str) -> ManagerResult<bool> {
        let stored = self.manager.get_snapshot(check_id)?;
        let Some(stored) = stored else {
            return Ok(false);
        };
        let rebuilt = self.manager.rebuild_snapshot(check_id)?;

        Ok(stored.status == rebuilt.status
            && stored.items == rebuilt.items
            && stored.total == rebuilt.total
            && stored.last_sequence == rebuilt.last_sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::storage::CheckStorage;
    use crate::locks::LockManager;
    use shared::check::{CheckCommand, CheckCommandPayload, OrderType};
    use std::sync::Arc;
    use std::time::Duration;

    fn create_test_manager() -> CheckManager {
        let storage = CheckStorage::open_in_memory().unwrap();
        let locks = Arc::new(LockManager::new(Duration::from_secs(60)));
        CheckManager::with_storage(storage, locks)
    }

    fn open_cmd(workstation: &str) -> CheckCommand {
        CheckCommand::new(
            workstation,
            "emp-1",
            "Test Operator",
            CheckCommandPayload::OpenCheck {
                rvc_id: "rvc-1".to_string(),
                order_type: OrderType::DineIn,
                check_number: None,
                customer_id: None,
            },
        )
    }

    #[test]
    fn incremental_sync_returns_the_gap() {
        let manager = create_test_manager();
        let sync = SyncService::new(manager.clone());

        manager.execute_command(open_cmd("ws-1"));
        manager.execute_command(open_cmd("ws-1"));

        let response = sync.sync(SyncRequest { since_sequence: 0 }).unwrap();
        assert!(!response.requires_full_sync);
        assert_eq!(response.events.len(), 2);
        assert_eq!(response.server_sequence, 2);

        let response = sync.sync(SyncRequest { since_sequence: 1 }).unwrap();
        assert_eq!(response.events.len(), 1);
    }

    #[test]
    fn up_to_date_terminal_gets_nothing() {
        let manager = create_test_manager();
        let sync = SyncService::new(manager.clone());
        manager.execute_command(open_cmd("ws-1"));

        let response = sync.sync(SyncRequest { since_sequence: 1 }).unwrap();
        assert!(!response.requires_full_sync);
        assert!(response.events.is_empty());
        assert_eq!(response.server_epoch, manager.epoch());
    }

    #[test]
    fn stored_snapshots_match_replay() {
        let manager = create_test_manager();
        let sync = SyncService::new(manager.clone());

        let response = manager.execute_command(open_cmd("ws-1"));
        let check_id = response.check_id.unwrap();

        assert!(sync.verify_snapshot(&check_id).unwrap());
    }
}
