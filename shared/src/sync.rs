//! Reconnect sync protocol
//!
//! A terminal reconnecting after a disconnect catches up by sequence
//! number. Small gaps get incremental events; large gaps (or a server
//! restart, detected via the epoch) get a full snapshot sync.

use crate::check::{CheckEvent, CheckSnapshot};
use serde::{Deserialize, Serialize};

/// Sync request from a terminal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Terminal's last known sequence number
    pub since_sequence: u64,
}

/// Sync response to a terminal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Events since the requested sequence (incremental sync)
    pub events: Vec<CheckEvent>,
    /// Current open check snapshots (full sync)
    pub open_checks: Vec<CheckSnapshot>,
    /// Server's current sequence number
    pub server_sequence: u64,
    /// Whether the terminal must replace its replica wholesale
    pub requires_full_sync: bool,
    /// Server instance epoch - changes on restart, forcing a full sync
    pub server_epoch: String,
}

impl SyncResponse {
    pub fn full_sync(
        open_checks: Vec<CheckSnapshot>,
        server_sequence: u64,
        epoch: String,
    ) -> Self {
        Self {
            events: vec![],
            open_checks,
            server_sequence,
            requires_full_sync: true,
            server_epoch: epoch,
        }
    }

    pub fn incremental(events: Vec<CheckEvent>, server_sequence: u64, epoch: String) -> Self {
        Self {
            events,
            open_checks: vec![],
            server_sequence,
            requires_full_sync: false,
            server_epoch: epoch,
        }
    }
}
