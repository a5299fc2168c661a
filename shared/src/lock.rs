//! Lock DTOs - exclusive per-check editing locks
//!
//! At most one live (non-expired) lock exists per check at any instant.
//! A lock is scoped to a workstation + employee pair and expires so a
//! crashed or abandoned terminal cannot block a check indefinitely.

use serde::{Deserialize, Serialize};

/// Identity of a lock holder, surfaced on conflict so the UI can show
/// "locked by X" instead of a bare error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockHolder {
    pub workstation_id: String,
    pub employee_id: String,
}

/// A granted editing lock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockInfo {
    pub check_id: String,
    pub workstation_id: String,
    pub employee_id: String,
    pub acquired_at: i64,
    pub expires_at: i64,
}

impl LockInfo {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn holder(&self) -> LockHolder {
        LockHolder {
            workstation_id: self.workstation_id.clone(),
            employee_id: self.employee_id.clone(),
        }
    }
}

/// Lock acquire/refresh/release request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRequest {
    pub check_id: String,
    pub workstation_id: String,
    pub employee_id: String,
}
