//! Check-number allocation
//!
//! Numbers come from disjoint per-workstation ranges carved off a
//! monotone high-water mark, so terminals keep numbering while offline
//! and two workstations can never collide. Numbers are display-only;
//! correctness rides on the check id.

use super::storage::{CheckStorage, StorageResult};
use shared::numbering::CheckNumberRange;

/// Default numbers reserved per grant
pub const DEFAULT_RANGE_SPAN: u64 = 500;

/// Server-side allocator over the persisted ranges
#[derive(Clone)]
pub struct NumberAllocator {
    storage: CheckStorage,
    span: u64,
}

impl NumberAllocator {
    pub fn new(storage: CheckStorage, span: u64) -> Self {
        Self { storage, span }
    }

    /// Grant a fresh range to a workstation (terminal sync path). The
    /// previous range is abandoned; its unused numbers are never reissued.
    pub fn grant_range(&self, workstation_id: &str) -> StorageResult<CheckNumberRange> {
        self.storage.allocate_number_range(workstation_id, self.span)
    }

    /// Allocate the next number for a workstation server-side (online
    /// open without a terminal-supplied number). Rolls into a fresh range
    /// when the current one is exhausted.
    pub fn next_for_workstation(&self, workstation_id: &str) -> StorageResult<i64> {
        let mut range = match self.storage.get_number_range(workstation_id)? {
            Some(range) if !range.is_exhausted() => range,
            _ => self.storage.allocate_number_range(workstation_id, self.span)?,
        };
        // next() cannot fail here: the range was just checked or freshly allocated
        let number = range.next().unwrap_or(range.end);
        self.storage.store_number_range(&range)?;
        Ok(number)
    }

    /// Validate a terminal-supplied (offline-issued) number against the
    /// workstation's granted range. Out-of-range numbers are accepted but
    /// flagged - they can only happen when a terminal outlived its grant,
    /// and the number is display-only.
    pub fn observe_offline_number(&self, workstation_id: &str, number: i64) -> StorageResult<()> {
        match self.storage.get_number_range(workstation_id)? {
            Some(range) if range.contains(number) => {}
            Some(range) => {
                tracing::warn!(
                    workstation_id,
                    number,
                    range_start = range.start,
                    range_end = range.end,
                    "Offline check number outside the workstation's granted range"
                );
            }
            None => {
                tracing::warn!(
                    workstation_id,
                    number,
                    "Offline check number from a workstation with no granted range"
                );
            }
        }
        Ok(())
    }
}
