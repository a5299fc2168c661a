//! Sync queue - FIFO of mutations awaiting the backend
//!
//! Every mutation attempted while offline (or failing on network) is
//! appended here and drained strictly in enqueue order by the
//! reconciler. An entry leaves the queue only when the backend
//! acknowledged it, when the conflict it hit is moot, or when it lands
//! in the dead-letter table for an operator after the retry ceiling.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::check::CheckCommand;
use shared::util::now_millis;
use std::path::Path;
use std::sync::Arc;

use crate::error::TerminalResult;

/// Pending entries: key = monotonically assigned id (FIFO order)
const PENDING_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("pending");

/// Permanently failed entries, surfaced to an operator
const DEAD_LETTER_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("dead_letter");

/// Counter: key = "next_id"
const COUNTER_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counter");

const NEXT_ID_KEY: &str = "next_id";

/// One queued mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: u64,
    /// The command to replay verbatim; its command_id is the
    /// idempotency key
    pub command: CheckCommand,
    /// Placeholder id of a check this terminal created offline, so the
    /// reconciler can remap once the server assigns the real id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_check_id: Option<String>,
    pub created_at: i64,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A permanently failed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub entry: QueueEntry,
    pub failed_at: i64,
}

/// Durable FIFO queue backed by redb
#[derive(Clone)]
pub struct SyncQueue {
    db: Arc<Database>,
}

impl SyncQueue {
    pub fn open(path: impl AsRef<Path>) -> TerminalResult<Self> {
        let db = Database::create(path)?;
        let queue = Self { db: Arc::new(db) };
        queue.init_tables()?;
        Ok(queue)
    }

    fn init_tables(&self) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(PENDING_TABLE)?;
            let _ = txn.open_table(DEAD_LETTER_TABLE)?;
            let mut counter = txn.open_table(COUNTER_TABLE)?;
            if counter.get(NEXT_ID_KEY)?.is_none() {
                counter.insert(NEXT_ID_KEY, 1u64)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Append a mutation. Returns the queue id.
    pub fn enqueue(
        &self,
        command: CheckCommand,
        local_check_id: Option<String>,
    ) -> TerminalResult<u64> {
        let txn = self.db.begin_write()?;
        let id;
        {
            let mut counter = txn.open_table(COUNTER_TABLE)?;
            id = counter.get(NEXT_ID_KEY)?.map(|g| g.value()).unwrap_or(1);
            counter.insert(NEXT_ID_KEY, id + 1)?;

            let entry = QueueEntry {
                id,
                command,
                local_check_id,
                created_at: now_millis(),
                attempts: 0,
                last_error: None,
            };
            let mut pending = txn.open_table(PENDING_TABLE)?;
            let value = serde_json::to_vec(&entry)?;
            pending.insert(id, value.as_slice())?;
        }
        txn.commit()?;
        tracing::debug!(queue_id = id, "Mutation queued for sync");
        Ok(id)
    }

    /// The oldest pending entry, if any
    pub fn front(&self) -> TerminalResult<Option<QueueEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PENDING_TABLE)?;
        match table.first()? {
            Some((_, value)) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Remove an acknowledged (or moot) entry
    pub fn ack(&self, id: u64) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_TABLE)?;
            table.remove(id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Record a failed attempt; returns the new attempt count
    pub fn record_failure(&self, id: u64, error: &str) -> TerminalResult<u32> {
        let txn = self.db.begin_write()?;
        let attempts;
        {
            let mut table = txn.open_table(PENDING_TABLE)?;
            let entry = match table.get(id)? {
                Some(guard) => {
                    let mut entry: QueueEntry = serde_json::from_slice(guard.value())?;
                    entry.attempts += 1;
                    entry.last_error = Some(error.to_string());
                    Some(entry)
                }
                None => None,
            };
            match entry {
                Some(entry) => {
                    attempts = entry.attempts;
                    let value = serde_json::to_vec(&entry)?;
                    table.insert(id, value.as_slice())?;
                }
                None => attempts = 0,
            }
        }
        txn.commit()?;
        Ok(attempts)
    }

    /// Move an entry to the dead-letter table for operator attention
    pub fn dead_letter(&self, id: u64, error: &str) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut pending = txn.open_table(PENDING_TABLE)?;
            let entry = match pending.remove(id)? {
                Some(guard) => {
                    let mut entry: QueueEntry = serde_json::from_slice(guard.value())?;
                    entry.last_error = Some(error.to_string());
                    Some(entry)
                }
                None => None,
            };
            if let Some(entry) = entry {
                tracing::error!(
                    queue_id = id,
                    command_id = %entry.command.command_id,
                    error,
                    "Offline mutation permanently failed"
                );
                let mut dead = txn.open_table(DEAD_LETTER_TABLE)?;
                let record = DeadLetterEntry {
                    entry,
                    failed_at: now_millis(),
                };
                let value = serde_json::to_vec(&record)?;
                dead.insert(id, value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub fn pending_count(&self) -> TerminalResult<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PENDING_TABLE)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> TerminalResult<bool> {
        Ok(self.pending_count()? == 0)
    }

    /// Permanently failed entries, for the operator surface
    pub fn dead_letters(&self) -> TerminalResult<Vec<DeadLetterEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DEAD_LETTER_TABLE)?;
        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::check::CheckCommandPayload;

    fn queue() -> (tempfile::TempDir, SyncQueue) {
        let dir = tempfile::tempdir().unwrap();
        let queue = SyncQueue::open(dir.path().join("queue.redb")).unwrap();
        (dir, queue)
    }

    fn send_cmd(check_id: &str) -> CheckCommand {
        CheckCommand::new(
            "ws-1",
            "emp-1",
            "Test Operator",
            CheckCommandPayload::SendCheck {
                check_id: check_id.to_string(),
            },
        )
    }

    #[test]
    fn fifo_order_is_preserved() {
        let (_dir, queue) = queue();
        queue.enqueue(send_cmd("c1"), None).unwrap();
        queue.enqueue(send_cmd("c2"), None).unwrap();
        queue.enqueue(send_cmd("c3"), None).unwrap();

        let mut order = Vec::new();
        while let Some(entry) = queue.front().unwrap() {
            order.push(entry.command.payload.check_id().unwrap().to_string());
            queue.ack(entry.id).unwrap();
        }
        assert_eq!(order, vec!["c1", "c2", "c3"]);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn failures_accumulate_then_dead_letter() {
        let (_dir, queue) = queue();
        let id = queue.enqueue(send_cmd("c1"), None).unwrap();

        assert_eq!(queue.record_failure(id, "connection refused").unwrap(), 1);
        assert_eq!(queue.record_failure(id, "connection refused").unwrap(), 2);

        let entry = queue.front().unwrap().unwrap();
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.last_error.as_deref(), Some("connection refused"));

        queue.dead_letter(id, "gave up").unwrap();
        assert!(queue.is_empty().unwrap());

        let dead = queue.dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].entry.last_error.as_deref(), Some("gave up"));
    }
}
