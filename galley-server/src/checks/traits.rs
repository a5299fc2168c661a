//! Seams of the command pipeline
//!
//! - `CommandHandler`: implemented by every action; validates against the
//!   loaded snapshot and emits events
//! - `EventApplier`: implemented by every applier; pure snapshot mutation
//! - `CommandContext`: transaction-scoped view of storage with a cache of
//!   snapshots modified by the in-flight command
//! - `CheckError`: the state machine's failure type, mapped to wire-level
//!   `CommandError` by the manager

use super::appliers::{
    CheckClosedApplier, CheckOpenedApplier, CheckVoidedApplier, CustomerAttachedApplier,
    CustomerDetachedApplier, EventAction, ItemFinalizedApplier, ItemModifiedApplier,
    ItemVoidedApplier, ItemsAddedApplier, PaymentAuthorizedApplier, PaymentCapturedApplier,
    PaymentRefundedApplier, PaymentVoidedApplier, RoundSentApplier,
};
use super::storage::{CheckStorage, StorageError};
use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use shared::check::{CheckEvent, CheckSnapshot, CommandErrorCode};
use std::collections::HashMap;
use thiserror::Error;

/// State machine errors
///
/// Illegal transitions carry enough structure for the caller (terminal UI
/// or sync reconciler) to decide retry vs. abandon.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Check not found: {0}")]
    CheckNotFound(String),

    #[error("Check already closed: {0}")]
    CheckAlreadyClosed(String),

    #[error("Check already voided: {0}")]
    CheckAlreadyVoided(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("{1}")]
    InvalidOperation(CommandErrorCode, String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for CheckError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::CheckNotFound(id) => CheckError::CheckNotFound(id),
            other => CheckError::Storage(other.to_string()),
        }
    }
}

impl From<shared::check::money::MoneyValidationError> for CheckError {
    fn from(err: shared::check::money::MoneyValidationError) -> Self {
        CheckError::InvalidOperation(CommandErrorCode::ValidationFailed, err.0)
    }
}

/// Metadata extracted from the originating command
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub workstation_id: String,
    pub employee_id: String,
    pub employee_name: String,
    /// Client timestamp (audit only; server time is authoritative)
    pub timestamp: i64,
}

impl CommandMetadata {
    /// Build an event for this command, allocating the given sequence
    pub fn event(
        &self,
        sequence: u64,
        check_id: String,
        event_type: shared::check::CheckEventType,
        payload: shared::check::EventPayload,
    ) -> CheckEvent {
        CheckEvent::new(
            sequence,
            check_id,
            self.workstation_id.clone(),
            self.employee_id.clone(),
            self.employee_name.clone(),
            self.command_id.clone(),
            Some(self.timestamp),
            event_type,
            payload,
        )
    }
}

/// Transaction-scoped command context
///
/// Snapshots loaded here are cached so an action and the subsequent
/// appliers observe the same instance; everything cached as modified is
/// persisted by the manager on commit.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a CheckStorage,
    sequence: u64,
    snapshots: HashMap<String, CheckSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a CheckStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            sequence: current_sequence,
            snapshots: HashMap::new(),
        }
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Load a snapshot, preferring the in-flight cache
    pub fn load_snapshot(&mut self, check_id: &str) -> Result<CheckSnapshot, CheckError> {
        if let Some(snapshot) = self.snapshots.get(check_id) {
            return Ok(snapshot.clone());
        }
        let snapshot = self
            .storage
            .get_snapshot_txn(self.txn, check_id)?
            .ok_or_else(|| CheckError::CheckNotFound(check_id.to_string()))?;
        Ok(snapshot)
    }

    /// Cache a modified snapshot for persistence on commit
    pub fn save_snapshot(&mut self, snapshot: CheckSnapshot) {
        self.snapshots.insert(snapshot.check_id.clone(), snapshot);
    }

    /// All snapshots touched by the in-flight command
    pub fn modified_snapshots(&self) -> impl Iterator<Item = &CheckSnapshot> {
        self.snapshots.values()
    }
}

/// Command handler - implemented by every action
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError>;
}

/// Event applier - implemented by every applier. Appliers are PURE: they
/// mutate the snapshot from the event payload and nothing else.
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent);
}
