//! redb-based storage layer for check event sourcing
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(check_id, sequence)` | `CheckEvent` | Event stream (append-only) |
//! | `snapshots` | `check_id` | `CheckSnapshot` | Snapshot cache |
//! | `open_checks` | `check_id` | `()` | Open check index |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `counters` | `&str` | `u64` | Global sequence, range high-water |
//! | `number_ranges` | `workstation_id` | `CheckNumberRange` | Reserved number ranges |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: the database file is always
//! in a consistent state, which matters for site controllers that lose
//! power without warning.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::check::{CheckEvent, CheckSnapshot};
use shared::numbering::CheckNumberRange;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Event stream: key = (check_id, sequence), value = JSON-serialized CheckEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Snapshot cache: key = check_id, value = JSON-serialized CheckSnapshot
const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Open check index: key = check_id, value = empty (existence check)
const OPEN_CHECKS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("open_checks");

/// Processed command ids: key = command_id, value = check id the command
/// applied to ("" when none). The value lets a duplicate response still
/// name the check, which offline reconcilers need for id remapping.
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("processed_commands");

/// Counters: key = "seq" or "range_high_water", value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Number ranges: key = workstation_id, value = JSON-serialized CheckNumberRange
const NUMBER_RANGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("number_ranges");

const SEQUENCE_KEY: &str = "seq";
const RANGE_HIGH_WATER_KEY: &str = "range_high_water";

/// Check numbers start here so real numbers are visually distinct from
/// test fixtures and slot ids
const FIRST_CHECK_NUMBER: u64 = 1000;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Check not found: {0}")]
    CheckNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Check store backed by redb
#[derive(Clone)]
pub struct CheckStorage {
    db: Arc<Database>,
}

impl CheckStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(OPEN_CHECKS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
            let _ = write_txn.open_table(NUMBER_RANGES_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(SEQUENCE_KEY)?.is_none() {
                counters.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Current global sequence number
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUNTERS_TABLE)?;
        Ok(table.get(SEQUENCE_KEY)?.map(|g| g.value()).unwrap_or(0))
    }

    /// Persist the sequence counter within a transaction
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Idempotency ==========

    /// Check id recorded for a processed command; `None` means the
    /// command has not been processed, `Some(None)` that it was
    /// processed without touching a check.
    pub fn get_processed_command(
        &self,
        command_id: &str,
    ) -> StorageResult<Option<Option<String>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table
            .get(command_id)?
            .map(|guard| Some(guard.value().to_string()).filter(|s| !s.is_empty())))
    }

    /// Idempotency re-check inside the write transaction (closes the race
    /// between the cheap pre-check and the commit)
    pub fn get_processed_command_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<Option<Option<String>>> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table
            .get(command_id)?
            .map(|guard| Some(guard.value().to_string()).filter(|s| !s.is_empty())))
    }

    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
        check_id: Option<&str>,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, check_id.unwrap_or(""))?;
        Ok(())
    }

    // ========== Events ==========

    pub fn store_event(&self, txn: &WriteTransaction, event: &CheckEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let value = serde_json::to_vec(event)?;
        table.insert((event.check_id.as_str(), event.sequence), value.as_slice())?;
        Ok(())
    }

    /// All events with sequence greater than `since`, ordered by sequence
    pub fn get_events_since(&self, since: u64) -> StorageResult<Vec<CheckEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;
        let mut events = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if key.value().1 > since {
                events.push(serde_json::from_slice::<CheckEvent>(value.value())?);
            }
        }
        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Every event for one check, ordered by sequence
    pub fn get_events_for_check(&self, check_id: &str) -> StorageResult<Vec<CheckEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;
        let mut events = Vec::new();
        for entry in table.range((check_id, 0u64)..=(check_id, u64::MAX))? {
            let (_, value) = entry?;
            events.push(serde_json::from_slice::<CheckEvent>(value.value())?);
        }
        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Snapshots ==========

    pub fn get_snapshot(&self, check_id: &str) -> StorageResult<Option<CheckSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        match table.get(check_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Snapshot read inside a write transaction (sees in-flight writes)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        check_id: &str,
    ) -> StorageResult<Option<CheckSnapshot>> {
        let table = txn.open_table(SNAPSHOTS_TABLE)?;
        match table.get(check_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &CheckSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.check_id.as_str(), value.as_slice())?;
        Ok(())
    }

    // ========== Open Check Index ==========

    pub fn mark_check_open(&self, txn: &WriteTransaction, check_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(OPEN_CHECKS_TABLE)?;
        table.insert(check_id, ())?;
        Ok(())
    }

    pub fn mark_check_settled(&self, txn: &WriteTransaction, check_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(OPEN_CHECKS_TABLE)?;
        table.remove(check_id)?;
        Ok(())
    }

    pub fn get_open_check_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OPEN_CHECKS_TABLE)?;
        let mut ids = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    pub fn get_open_checks(&self) -> StorageResult<Vec<CheckSnapshot>> {
        let ids = self.get_open_check_ids()?;
        let mut checks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(snapshot) = self.get_snapshot(&id)? {
                checks.push(snapshot);
            }
        }
        Ok(checks)
    }

    // ========== Number Ranges ==========

    /// Allocate a fresh disjoint range for a workstation off the monotone
    /// high-water mark. Runs in its own transaction; call outside the
    /// command transaction (redb does not nest write transactions).
    pub fn allocate_number_range(
        &self,
        workstation_id: &str,
        span: u64,
    ) -> StorageResult<CheckNumberRange> {
        let txn = self.db.begin_write()?;
        let range;
        {
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            let high_water = counters
                .get(RANGE_HIGH_WATER_KEY)?
                .map(|g| g.value())
                .unwrap_or(FIRST_CHECK_NUMBER);
            let start = high_water + 1;
            let end = high_water + span;
            counters.insert(RANGE_HIGH_WATER_KEY, end)?;
            range = CheckNumberRange::new(workstation_id, start as i64, end as i64);

            let mut ranges = txn.open_table(NUMBER_RANGES_TABLE)?;
            let value = serde_json::to_vec(&range)?;
            ranges.insert(workstation_id, value.as_slice())?;
        }
        txn.commit()?;
        tracing::info!(
            workstation_id,
            start = range.start,
            end = range.end,
            "Allocated check-number range"
        );
        Ok(range)
    }

    pub fn get_number_range(&self, workstation_id: &str) -> StorageResult<Option<CheckNumberRange>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NUMBER_RANGES_TABLE)?;
        match table.get(workstation_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn store_number_range(&self, range: &CheckNumberRange) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(NUMBER_RANGES_TABLE)?;
            let value = serde_json::to_vec(range)?;
            table.insert(range.workstation_id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}
