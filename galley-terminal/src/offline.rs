//! Offline ledger - the always-local write path
//!
//! The terminal UI writes here for every mutation: the command is
//! applied optimistically to the replica (so the cashier sees it) and
//! appended to the sync queue (so the backend eventually does). When
//! the terminal is online the queue simply drains immediately.

use shared::check::{CheckCommand, CheckCommandPayload, CheckSnapshot};
use std::sync::Arc;

use crate::error::{TerminalError, TerminalResult};
use crate::numbering::ReservedNumbers;
use crate::projection;
use crate::queue::SyncQueue;
use crate::replica::LocalReplica;
use crate::session::OfflineSession;

/// Prefix of placeholder check ids; replaced by the server-assigned id
/// during reconciliation
const LOCAL_ID_PREFIX: &str = "local-";

pub struct OfflineLedger {
    replica: Arc<LocalReplica>,
    queue: Arc<SyncQueue>,
    numbers: ReservedNumbers,
}

impl OfflineLedger {
    pub fn new(replica: Arc<LocalReplica>, queue: Arc<SyncQueue>) -> Self {
        let numbers = ReservedNumbers::new(replica.clone());
        Self {
            replica,
            queue,
            numbers,
        }
    }

    pub fn numbers(&self) -> &ReservedNumbers {
        &self.numbers
    }

    /// Record a mutation attempted while offline: validate against the
    /// session's reduced privileges, apply the projection, enqueue.
    /// Returns the (possibly placeholder) check id.
    pub fn record(
        &self,
        session: &OfflineSession,
        mut command: CheckCommand,
    ) -> TerminalResult<String> {
        if !session.permits(&command.payload) {
            return Err(TerminalError::Rejected(format!(
                "operation not available offline for employee {}",
                session.employee_id
            )));
        }

        match &mut command.payload {
            CheckCommandPayload::OpenCheck { check_number, .. } => {
                // reserve a display number and a placeholder id
                if check_number.is_none() {
                    *check_number = Some(self.numbers.next()?);
                }
                let local_id = format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4());

                let mut snapshot = CheckSnapshot::new(local_id.clone());
                projection::apply_command(&mut snapshot, &command)?;
                self.replica.upsert_snapshot(&snapshot)?;
                self.replica.mark_provisional(&local_id)?;
                self.queue.enqueue(command, Some(local_id.clone()))?;
                Ok(local_id)
            }
            payload => {
                // give offline items stable client ids so later
                // references survive replay
                if let CheckCommandPayload::AddItems { items, .. } = payload {
                    for item in items.iter_mut() {
                        if item.instance_id.is_none() {
                            item.instance_id = Some(uuid::Uuid::new_v4().to_string());
                        }
                    }
                }

                let check_id = payload
                    .check_id()
                    .ok_or_else(|| TerminalError::Rejected("command targets no check".to_string()))?
                    .to_string();
                let mut snapshot = self
                    .replica
                    .get_snapshot(&check_id)?
                    .ok_or_else(|| {
                        TerminalError::Rejected(format!("check {check_id} not in local replica"))
                    })?;

                projection::apply_command(&mut snapshot, &command)?;
                self.replica.upsert_snapshot(&snapshot)?;
                self.queue.enqueue(command, None)?;
                Ok(check_id)
            }
        }
    }
}
