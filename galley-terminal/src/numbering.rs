//! Reserved check-number cursor
//!
//! The backend grants this workstation a disjoint range; the cursor
//! walks it locally so offline opens keep numbering without collisions.
//! An exhausted range is an explicit error the operator sees - a number
//! is never invented outside the grant.

use shared::numbering::CheckNumberRange;
use std::sync::Arc;

use crate::error::{TerminalError, TerminalResult};
use crate::replica::LocalReplica;

/// Cursor over the granted range, persisted in the replica
#[derive(Clone)]
pub struct ReservedNumbers {
    replica: Arc<LocalReplica>,
}

impl ReservedNumbers {
    pub fn new(replica: Arc<LocalReplica>) -> Self {
        Self { replica }
    }

    /// Install a freshly granted range (replacing any remainder)
    pub fn install(&self, range: CheckNumberRange) -> TerminalResult<()> {
        tracing::info!(
            workstation_id = %range.workstation_id,
            start = range.start,
            end = range.end,
            "Installed check-number range"
        );
        self.replica.set_number_range(&range)
    }

    /// Take the next reserved number
    pub fn next(&self) -> TerminalResult<i64> {
        let mut range = self
            .replica
            .number_range()?
            .ok_or(TerminalError::RangeExhausted)?;
        let number = range.next().ok_or(TerminalError::RangeExhausted)?;
        self.replica.set_number_range(&range)?;
        if range.remaining() <= 25 {
            tracing::warn!(
                remaining = range.remaining(),
                "Check-number range nearly exhausted; request a new grant"
            );
        }
        Ok(number)
    }

    pub fn remaining(&self) -> TerminalResult<i64> {
        Ok(self.replica.number_range()?.map(|r| r.remaining()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_survives_reopen_and_exhausts_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replica.redb");

        {
            let replica = Arc::new(LocalReplica::open(&path).unwrap());
            let numbers = ReservedNumbers::new(replica);
            numbers
                .install(CheckNumberRange::new("ws-1", 100, 101))
                .unwrap();
            assert_eq!(numbers.next().unwrap(), 100);
        }

        // a restart continues from the persisted cursor
        let replica = Arc::new(LocalReplica::open(&path).unwrap());
        let numbers = ReservedNumbers::new(replica);
        assert_eq!(numbers.next().unwrap(), 101);
        assert!(matches!(
            numbers.next().unwrap_err(),
            TerminalError::RangeExhausted
        ));
    }
}
