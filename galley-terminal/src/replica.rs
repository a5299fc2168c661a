//! Local replica - the terminal's durable copy of check state
//!
//! The replica is consulted for every read and updated on every local
//! mutation, online or offline. It is a *copy*: while a network
//! partition exists it is never treated as authoritative, and the
//! reconciler overwrites it with the backend's canonical snapshots as
//! entries are acknowledged.
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `snapshots` | `check_id` | `CheckSnapshot` | Local check copies |
//! | `meta` | `&str` | JSON value | Sequence, epoch, number range |
//! | `id_map` | local id | server id | Placeholder id remapping |
//! | `provisional` | `check_id` | `()` | Checks not yet acknowledged |

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::check::CheckSnapshot;
use shared::numbering::CheckNumberRange;
use std::path::Path;
use std::sync::Arc;

use crate::error::{TerminalError, TerminalResult};

const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");
const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");
const ID_MAP_TABLE: TableDefinition<&str, &str> = TableDefinition::new("id_map");
const PROVISIONAL_TABLE: TableDefinition<&str, ()> = TableDefinition::new("provisional");

const LAST_SEQUENCE_KEY: &str = "last_sequence";
const SERVER_EPOCH_KEY: &str = "server_epoch";
const NUMBER_RANGE_KEY: &str = "number_range";

/// Terminal-local durable store
#[derive(Clone)]
pub struct LocalReplica {
    db: Arc<Database>,
}

impl LocalReplica {
    pub fn open(path: impl AsRef<Path>) -> TerminalResult<Self> {
        let db = Database::create(path)?;
        let replica = Self { db: Arc::new(db) };
        replica.init_tables()?;
        Ok(replica)
    }

    fn init_tables(&self) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = txn.open_table(META_TABLE)?;
            let _ = txn.open_table(ID_MAP_TABLE)?;
            let _ = txn.open_table(PROVISIONAL_TABLE)?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Snapshots ==========

    pub fn get_snapshot(&self, check_id: &str) -> TerminalResult<Option<CheckSnapshot>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SNAPSHOTS_TABLE)?;
        match table.get(check_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn upsert_snapshot(&self, snapshot: &CheckSnapshot) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
            let value = serde_json::to_vec(snapshot)?;
            table.insert(snapshot.check_id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn remove_snapshot(&self, check_id: &str) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
            table.remove(check_id)?;
            let mut provisional = txn.open_table(PROVISIONAL_TABLE)?;
            provisional.remove(check_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// All locally known open checks
    pub fn open_checks(&self) -> TerminalResult<Vec<CheckSnapshot>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SNAPSHOTS_TABLE)?;
        let mut checks = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let snapshot: CheckSnapshot = serde_json::from_slice(value.value())?;
            if snapshot.is_open() {
                checks.push(snapshot);
            }
        }
        Ok(checks)
    }

    /// Replace every snapshot with the backend's open-check set (full
    /// sync). Provisional markers are cleared; anything still queued
    /// will re-create its placeholder on replay.
    pub fn replace_all(&self, snapshots: &[CheckSnapshot]) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
            // redb has no truncate; drain keys first
            let existing: Vec<String> = table
                .iter()?
                .map(|entry| entry.map(|(k, _)| k.value().to_string()))
                .collect::<Result<_, _>>()?;
            for key in existing {
                table.remove(key.as_str())?;
            }
            for snapshot in snapshots {
                let value = serde_json::to_vec(snapshot)?;
                table.insert(snapshot.check_id.as_str(), value.as_slice())?;
            }

            let mut provisional = txn.open_table(PROVISIONAL_TABLE)?;
            let marked: Vec<String> = provisional
                .iter()?
                .map(|entry| entry.map(|(k, _)| k.value().to_string()))
                .collect::<Result<_, _>>()?;
            for key in marked {
                provisional.remove(key.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Provisional markers ==========

    /// Mark a check as not yet acknowledged by the backend
    pub fn mark_provisional(&self, check_id: &str) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROVISIONAL_TABLE)?;
            table.insert(check_id, ())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn clear_provisional(&self, check_id: &str) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROVISIONAL_TABLE)?;
            table.remove(check_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn is_provisional(&self, check_id: &str) -> TerminalResult<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROVISIONAL_TABLE)?;
        Ok(table.get(check_id)?.is_some())
    }

    // ========== Id remapping ==========

    /// Record that the backend assigned `server_id` for our placeholder
    pub fn map_id(&self, local_id: &str, server_id: &str) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ID_MAP_TABLE)?;
            table.insert(local_id, server_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Resolve a possibly-local id to its canonical form
    pub fn resolve_id(&self, id: &str) -> TerminalResult<String> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ID_MAP_TABLE)?;
        Ok(table
            .get(id)?
            .map(|guard| guard.value().to_string())
            .unwrap_or_else(|| id.to_string()))
    }

    /// Move a placeholder snapshot under its server-assigned id
    pub fn rename_check(&self, local_id: &str, server_id: &str) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
            let snapshot = match table.get(local_id)? {
                Some(guard) => {
                    let mut snapshot: CheckSnapshot = serde_json::from_slice(guard.value())?;
                    snapshot.check_id = server_id.to_string();
                    Some(snapshot)
                }
                None => None,
            };
            if let Some(snapshot) = snapshot {
                table.remove(local_id)?;
                let value = serde_json::to_vec(&snapshot)?;
                table.insert(server_id, value.as_slice())?;
            }

            let mut provisional = txn.open_table(PROVISIONAL_TABLE)?;
            if provisional.remove(local_id)?.is_some() {
                provisional.insert(server_id, ())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Meta ==========

    pub fn last_sequence(&self) -> TerminalResult<u64> {
        Ok(self.get_meta(LAST_SEQUENCE_KEY)?.unwrap_or(0))
    }

    pub fn set_last_sequence(&self, sequence: u64) -> TerminalResult<()> {
        self.set_meta(LAST_SEQUENCE_KEY, &sequence)
    }

    pub fn server_epoch(&self) -> TerminalResult<Option<String>> {
        self.get_meta(SERVER_EPOCH_KEY)
    }

    pub fn set_server_epoch(&self, epoch: &str) -> TerminalResult<()> {
        self.set_meta(SERVER_EPOCH_KEY, &epoch)
    }

    pub fn number_range(&self) -> TerminalResult<Option<CheckNumberRange>> {
        self.get_meta(NUMBER_RANGE_KEY)
    }

    pub fn set_number_range(&self, range: &CheckNumberRange) -> TerminalResult<()> {
        self.set_meta(NUMBER_RANGE_KEY, range)
    }

    fn get_meta<T: serde::de::DeserializeOwned>(&self, key: &str) -> TerminalResult<Option<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(META_TABLE)?;
        match table.get(key)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn set_meta<T: serde::Serialize>(&self, key: &str, value: &T) -> TerminalResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(META_TABLE)?;
            let bytes = serde_json::to_vec(value)?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica() -> (tempfile::TempDir, LocalReplica) {
        let dir = tempfile::tempdir().unwrap();
        let replica = LocalReplica::open(dir.path().join("replica.redb")).unwrap();
        (dir, replica)
    }

    #[test]
    fn snapshot_round_trip_and_rename() {
        let (_dir, replica) = replica();
        let snapshot = CheckSnapshot::new("local-1".to_string());
        replica.upsert_snapshot(&snapshot).unwrap();
        replica.mark_provisional("local-1").unwrap();

        replica.map_id("local-1", "server-1").unwrap();
        replica.rename_check("local-1", "server-1").unwrap();

        assert!(replica.get_snapshot("local-1").unwrap().is_none());
        let renamed = replica.get_snapshot("server-1").unwrap().unwrap();
        assert_eq!(renamed.check_id, "server-1");
        assert!(replica.is_provisional("server-1").unwrap());
        assert_eq!(replica.resolve_id("local-1").unwrap(), "server-1");
        assert_eq!(replica.resolve_id("other").unwrap(), "other");
    }

    #[test]
    fn meta_round_trip() {
        let (_dir, replica) = replica();
        assert_eq!(replica.last_sequence().unwrap(), 0);
        replica.set_last_sequence(42).unwrap();
        assert_eq!(replica.last_sequence().unwrap(), 42);

        assert!(replica.server_epoch().unwrap().is_none());
        replica.set_server_epoch("epoch-1").unwrap();
        assert_eq!(replica.server_epoch().unwrap().as_deref(), Some("epoch-1"));

        let range = CheckNumberRange::new("ws-1", 100, 199);
        replica.set_number_range(&range).unwrap();
        assert_eq!(replica.number_range().unwrap().unwrap(), range);
    }

    #[test]
    fn replace_all_swaps_the_working_set() {
        let (_dir, replica) = replica();
        replica
            .upsert_snapshot(&CheckSnapshot::new("old-1".to_string()))
            .unwrap();
        replica.mark_provisional("old-1").unwrap();

        let fresh = vec![
            CheckSnapshot::new("new-1".to_string()),
            CheckSnapshot::new("new-2".to_string()),
        ];
        replica.replace_all(&fresh).unwrap();

        assert!(replica.get_snapshot("old-1").unwrap().is_none());
        assert!(!replica.is_provisional("old-1").unwrap());
        assert_eq!(replica.open_checks().unwrap().len(), 2);
    }
}
