//! CheckManager - command processing and event generation
//!
//! The sole authority for check/item/payment transitions; every
//! mutation, issued live or replayed by the sync reconciler, passes
//! through here.
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Per-check critical section + payment-hold gate
//!     ├─ 3. Editing lock acquire (re-entrant, expiry steal)
//!     ├─ 4. Begin write transaction
//!     ├─ 5. Convert command to action and execute
//!     ├─ 6. Apply events to snapshots via EventApplier
//!     ├─ 7. Persist events, snapshots, open index, sequence
//!     ├─ 8. Mark command processed, commit
//!     ├─ 9. Broadcast event(s), notify loyalty after close
//!     └─ 10. Return response
//! ```

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::appliers::EventAction;
use super::numbering::NumberAllocator;
use super::storage::{CheckStorage, StorageError};
use super::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata, EventApplier};
use crate::locks::LockManager;
use crate::services::{LoyaltyNotifier, TaxTable};
use rust_decimal::Decimal;
use shared::check::{
    CheckCommand, CheckCommandPayload, CheckEvent, CheckSnapshot, CheckStatus, CommandErrorCode,
    CommandResponse, ResponseDetail,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 65536;

/// CheckManager for command processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Terminals use it to detect server restarts and trigger a full resync.
pub struct CheckManager {
    storage: CheckStorage,
    locks: Arc<LockManager>,
    tax: Arc<TaxTable>,
    allocator: NumberAllocator,
    event_tx: broadcast::Sender<CheckEvent>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
    loyalty: Option<Arc<dyn LoyaltyNotifier>>,
}

impl std::fmt::Debug for CheckManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckManager")
            .field("storage", &"<CheckStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl CheckManager {
    /// Create a new CheckManager with the given database path
    pub fn new(
        db_path: impl AsRef<Path>,
        locks: Arc<LockManager>,
        tax: Arc<TaxTable>,
        range_span: u64,
    ) -> ManagerResult<Self> {
        let storage = CheckStorage::open(db_path)?;
        Ok(Self::with_parts(storage, locks, tax, range_span))
    }

    fn with_parts(
        storage: CheckStorage,
        locks: Arc<LockManager>,
        tax: Arc<TaxTable>,
        range_span: u64,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "CheckManager started with new epoch");
        let allocator = NumberAllocator::new(storage.clone(), range_span);
        Self {
            storage,
            locks,
            tax,
            allocator,
            event_tx,
            epoch,
            loyalty: None,
        }
    }

    /// Create a CheckManager over existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(storage: CheckStorage, locks: Arc<LockManager>) -> Self {
        Self::with_parts(
            storage,
            locks,
            Arc::new(TaxTable::default()),
            super::numbering::DEFAULT_RANGE_SPAN,
        )
    }

    /// Create a CheckManager with an explicit tax table (for testing)
    #[cfg(test)]
    pub fn with_storage_and_tax(
        storage: CheckStorage,
        locks: Arc<LockManager>,
        tax: Arc<TaxTable>,
    ) -> Self {
        Self::with_parts(storage, locks, tax, super::numbering::DEFAULT_RANGE_SPAN)
    }

    /// Set the loyalty notifier invoked fire-and-forget after close
    pub fn set_loyalty_notifier(&mut self, notifier: Arc<dyn LoyaltyNotifier>) {
        self.loyalty = Some(notifier);
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<CheckEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &CheckStorage {
        &self.storage
    }

    /// Get the lock manager
    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Grant a fresh check-number range to a workstation
    pub fn grant_number_range(
        &self,
        workstation_id: &str,
    ) -> ManagerResult<shared::numbering::CheckNumberRange> {
        Ok(self.allocator.grant_range(workstation_id)?)
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: CheckCommand) -> CommandResponse {
        match self.process_command(cmd.clone()) {
            Ok((response, events)) => {
                // Broadcast events after successful commit
                for event in events {
                    if self.event_tx.send(event).is_err() {
                        tracing::debug!("Event broadcast skipped: no active receivers");
                        break;
                    }
                }
                response
            }
            Err(err) => CommandResponse::error(cmd.command_id, err.into()),
        }
    }

    /// Process command and return response with events
    fn process_command(
        &self,
        cmd: CheckCommand,
    ) -> ManagerResult<(CommandResponse, Vec<CheckEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before any locking)
        if let Some(applied_check) = self.storage.get_processed_command(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((
                CommandResponse::duplicate(cmd.command_id, applied_check),
                vec![],
            ));
        }

        // 2. Per-check critical section: lock-check + transition run as
        // one unit. OpenCheck targets a brand-new id and skips this.
        let _section_guard = cmd
            .payload
            .check_id()
            .map(|check_id| self.locks.critical_section(check_id).lock_arc());

        if let Some(check_id) = cmd.payload.check_id() {
            // 2a. Payment-hold gate: while a gateway call is in flight
            // only the owning payment attempt may mutate the check
            if let Some(holder_request) = self.locks.payment_hold(check_id)
                && holder_request != cmd.command_id
            {
                return Err(crate::locks::LockError::PaymentInFlight {
                    check_id: check_id.to_string(),
                }
                .into());
            }

            // 3. Editing lock: acquire-or-fail with holder identity
            self.locks
                .acquire(check_id, &cmd.workstation_id, &cmd.employee_id)?;
        }

        // 3b. Pre-resolve the check number for OpenCheck BEFORE the write
        // transaction (redb does not nest write transactions)
        let pre_generated_number = match &cmd.payload {
            CheckCommandPayload::OpenCheck {
                check_number: Some(number),
                ..
            } => {
                self.allocator
                    .observe_offline_number(&cmd.workstation_id, *number)?;
                Some(*number)
            }
            CheckCommandPayload::OpenCheck { check_number: None, .. } => {
                Some(self.allocator.next_for_workstation(&cmd.workstation_id)?)
            }
            _ => None,
        };

        // 4. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within the transaction
        if let Some(applied_check) = self
            .storage
            .get_processed_command_txn(&txn, &cmd.command_id)?
        {
            return Ok((
                CommandResponse::duplicate(cmd.command_id, applied_check),
                vec![],
            ));
        }

        let current_sequence = self.storage.get_current_sequence()?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            workstation_id: cmd.workstation_id.clone(),
            employee_id: cmd.employee_id.clone(),
            employee_name: cmd.employee_name.clone(),
            timestamp: cmd.timestamp,
        };

        // 5. Convert to action and execute.
        // OpenCheck gets the pre-resolved number; AddItems gets tax rates
        // resolved from the tax table.
        let action: CommandAction = match &cmd.payload {
            CheckCommandPayload::OpenCheck {
                rvc_id,
                order_type,
                customer_id,
                ..
            } => {
                let check_number = pre_generated_number.ok_or_else(|| {
                    CheckError::InvalidOperation(
                        CommandErrorCode::InternalError,
                        "check_number must be pre-resolved for OpenCheck".to_string(),
                    )
                })?;
                CommandAction::OpenCheck(super::actions::OpenCheckAction {
                    rvc_id: rvc_id.clone(),
                    order_type: *order_type,
                    check_number,
                    customer_id: customer_id.clone(),
                })
            }
            CheckCommandPayload::AddItems { check_id, items } => {
                let tax_rates: Vec<Decimal> = items
                    .iter()
                    .map(|i| self.tax.resolve(i.tax_group_id.as_deref()))
                    .collect();
                CommandAction::AddItems(super::actions::AddItemsAction {
                    check_id: check_id.clone(),
                    items: items.clone(),
                    tax_rates,
                })
            }
            _ => (&cmd).into(),
        };
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))?;

        // 6. Apply events to snapshots
        for event in &events {
            let mut snapshot = ctx
                .load_snapshot(&event.check_id)
                .unwrap_or_else(|_| CheckSnapshot::new(event.check_id.clone()));
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
            ctx.save_snapshot(snapshot);
        }

        // 7. Persist events
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }

        // 8. Persist snapshots and maintain the open-check index
        let mut settled_checks: Vec<(String, CheckStatus)> = Vec::new();
        for snapshot in ctx.modified_snapshots() {
            self.storage.store_snapshot(&txn, snapshot)?;
            match snapshot.status {
                CheckStatus::Open => {
                    self.storage.mark_check_open(&txn, &snapshot.check_id)?;
                }
                CheckStatus::Closed | CheckStatus::Voided => {
                    self.storage.mark_check_settled(&txn, &snapshot.check_id)?;
                    settled_checks.push((snapshot.check_id.clone(), snapshot.status));
                }
            }
        }

        // 9. Advance the sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // Build the response detail before ctx borrows end
        let detail = self.response_detail(&cmd, &events, &mut ctx);

        // 10. Mark command processed (recording the check it applied to,
        // so duplicate responses can still name it) and commit
        let applied_check_id = events
            .first()
            .map(|e| e.check_id.clone())
            .or_else(|| cmd.payload.check_id().map(str::to_string));
        self.storage
            .mark_command_processed(&txn, &cmd.command_id, applied_check_id.as_deref())?;
        txn.commit().map_err(StorageError::from)?;

        // 11. A fresh check starts locked by its opener, so the editing
        // session continues without a separate acquire round trip
        if matches!(&cmd.payload, CheckCommandPayload::OpenCheck { .. })
            && let Some(new_check_id) = events.first().map(|e| e.check_id.clone())
        {
            let _ = self
                .locks
                .acquire(&new_check_id, &cmd.workstation_id, &cmd.employee_id);
        }

        // 12. Post-commit bookkeeping for settled checks: release lock
        // state and fire loyalty notifications
        for (check_id, status) in &settled_checks {
            self.locks.forget_check(check_id);
            if *status == CheckStatus::Closed
                && let Some(notifier) = &self.loyalty
                && let Ok(Some(snapshot)) = self.storage.get_snapshot(check_id)
                && let Some(customer_id) = snapshot.customer_id.clone()
            {
                crate::services::loyalty::notify_closed(
                    notifier,
                    check_id.clone(),
                    customer_id,
                    snapshot.total,
                );
            }
        }

        // 13. Return response
        tracing::info!(
            command_id = %cmd.command_id,
            check_id = ?applied_check_id,
            event_count = events.len(),
            "Command processed"
        );
        let mut response = CommandResponse::success(cmd.command_id, applied_check_id);
        if let Some(detail) = detail {
            response = response.with_detail(detail);
        }
        Ok((response, events))
    }

    /// Operation-specific response detail (send and cancel report counts)
    fn response_detail(
        &self,
        cmd: &CheckCommand,
        events: &[CheckEvent],
        ctx: &mut CommandContext<'_>,
    ) -> Option<ResponseDetail> {
        match &cmd.payload {
            CheckCommandPayload::SendCheck { .. } => {
                let (round_number, item_count) = events
                    .iter()
                    .find_map(|e| match &e.payload {
                        shared::check::EventPayload::RoundSent {
                            round_number,
                            items,
                            ..
                        } => Some((Some(*round_number), items.len())),
                        _ => None,
                    })
                    .unwrap_or((None, 0));
                Some(ResponseDetail::RoundSent {
                    round_number,
                    item_count,
                })
            }
            CheckCommandPayload::CancelTransaction { check_id } => {
                let remaining_active = ctx
                    .load_snapshot(check_id)
                    .map(|s| s.active_items().count())
                    .unwrap_or(0);
                Some(ResponseDetail::TransactionCancelled {
                    voided_count: events.len(),
                    remaining_active,
                })
            }
            _ => None,
        }
    }

    // ========== Public Query Methods ==========

    /// Get a snapshot by check ID
    pub fn get_snapshot(&self, check_id: &str) -> ManagerResult<Option<CheckSnapshot>> {
        Ok(self.storage.get_snapshot(check_id)?)
    }

    /// Get all open check snapshots
    pub fn get_open_checks(&self) -> ManagerResult<Vec<CheckSnapshot>> {
        Ok(self.storage.get_open_checks()?)
    }

    /// Get the current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn get_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<CheckEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    /// Get all events for a specific check
    pub fn get_events_for_check(&self, check_id: &str) -> ManagerResult<Vec<CheckEvent>> {
        Ok(self.storage.get_events_for_check(check_id)?)
    }

    /// Rebuild a snapshot from events (for verification)
    pub fn rebuild_snapshot(&self, check_id: &str) -> ManagerResult<CheckSnapshot> {
        let events = self.storage.get_events_for_check(check_id)?;
        if events.is_empty() {
            return Err(ManagerError::Check(
                super::traits::CheckError::CheckNotFound(check_id.to_string()),
            ));
        }

        let mut snapshot = CheckSnapshot::new(check_id.to_string());
        for event in &events {
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
        }
        Ok(snapshot)
    }
}

// Make CheckManager Clone-able (storage and channels are shared handles)
impl Clone for CheckManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            locks: self.locks.clone(),
            tax: self.tax.clone(),
            allocator: self.allocator.clone(),
            event_tx: self.event_tx.clone(),
            epoch: self.epoch.clone(),
            loyalty: self.loyalty.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
