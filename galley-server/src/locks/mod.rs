//! Multi-workstation lock manager
//!
//! Serializes concurrent edits to one check across workstations. Locks
//! are advisory but enforced at the mutation boundary: every
//! check-mutating command acquires (or re-enters) the lock before the
//! state machine runs, inside the per-check critical section this
//! manager hands out, so lock + transition are atomic from the caller's
//! perspective.
//!
//! Locks expire. The TTL must cover a normal edit session while keeping
//! a genuinely abandoned check editable within a human-noticeable window;
//! it is a tuning parameter, not a correctness one.
//!
//! Payment holds are a separate short-lived table: while a gateway call
//! is in flight for a check, mutations from anyone but that payment
//! attempt are rejected even if the editing lock expires mid-flight.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use shared::lock::LockInfo;
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Lock errors
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Check {} is locked by workstation {}", .0.check_id, .0.workstation_id)]
    Held(LockInfo),

    #[error("A payment is in flight for check {check_id}")]
    PaymentInFlight { check_id: String },
}

pub type LockResult<T> = Result<T, LockError>;

/// In-process lock manager
///
/// State is deliberately not persisted: a backend restart drops every
/// lock, which is the same outcome `release_all` defines for a
/// workstation disconnect, and expiry bounds any remaining window.
pub struct LockManager {
    locks: DashMap<String, LockInfo>,
    /// Per-check critical sections serializing lock-check + transition
    sections: DashMap<String, Arc<Mutex<()>>>,
    /// check_id -> command/request id of the in-flight payment
    payment_holds: Arc<DashMap<String, String>>,
    ttl_ms: i64,
}

impl LockManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            sections: DashMap::new(),
            payment_holds: Arc::new(DashMap::new()),
            ttl_ms: ttl.as_millis() as i64,
        }
    }

    /// Acquire the editing lock for a check
    ///
    /// Succeeds when no live lock exists, when the holder is the same
    /// workstation (re-entrant, extends expiry), or when the existing
    /// lock has expired. On conflict the current holder is returned so
    /// the UI can show "locked by X".
    pub fn acquire(
        &self,
        check_id: &str,
        workstation_id: &str,
        employee_id: &str,
    ) -> LockResult<LockInfo> {
        let now = now_millis();
        let fresh = LockInfo {
            check_id: check_id.to_string(),
            workstation_id: workstation_id.to_string(),
            employee_id: employee_id.to_string(),
            acquired_at: now,
            expires_at: now + self.ttl_ms,
        };

        match self.locks.entry(check_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get();
                if existing.is_expired(now) {
                    tracing::debug!(
                        check_id,
                        previous_holder = %existing.workstation_id,
                        "Expired lock taken over"
                    );
                    occupied.insert(fresh.clone());
                    Ok(fresh)
                } else if existing.workstation_id == workstation_id {
                    // re-entrant: extend expiry, track the current operator
                    let mut renewed = fresh;
                    renewed.acquired_at = existing.acquired_at;
                    occupied.insert(renewed.clone());
                    Ok(renewed)
                } else {
                    Err(LockError::Held(existing.clone()))
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh.clone());
                Ok(fresh)
            }
        }
    }

    /// Extend a held lock. Fails if another workstation grabbed the lock
    /// after expiry; re-acquires when the lock has lapsed entirely.
    pub fn refresh(
        &self,
        check_id: &str,
        workstation_id: &str,
        employee_id: &str,
    ) -> LockResult<LockInfo> {
        self.acquire(check_id, workstation_id, employee_id)
    }

    /// Release a lock. No-op when already released, expired, or held by
    /// someone else.
    pub fn release(&self, check_id: &str, workstation_id: &str) {
        self.locks
            .remove_if(check_id, |_, lock| lock.workstation_id == workstation_id);
    }

    /// Release every lock held by a workstation (disconnect / logout),
    /// so orphaned locks never block other terminals. Returns the number
    /// released.
    pub fn release_all(&self, workstation_id: &str) -> usize {
        let before = self.locks.len();
        self.locks
            .retain(|_, lock| lock.workstation_id != workstation_id);
        let released = before - self.locks.len();
        if released > 0 {
            tracing::info!(workstation_id, released, "Released all workstation locks");
        }
        released
    }

    /// Current live holder, purging an expired entry on the way
    pub fn holder(&self, check_id: &str) -> Option<LockInfo> {
        let now = now_millis();
        self.locks.remove_if(check_id, |_, lock| lock.is_expired(now));
        self.locks.get(check_id).map(|entry| entry.value().clone())
    }

    /// The critical-section mutex for one check. Held by the manager for
    /// the whole lock-check + transition sequence.
    pub fn critical_section(&self, check_id: &str) -> Arc<Mutex<()>> {
        self.sections
            .entry(check_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the critical-section entry for a settled check
    pub fn forget_check(&self, check_id: &str) {
        self.sections.remove(check_id);
        self.locks.remove(check_id);
    }

    // ========== Payment Holds ==========

    /// Begin a payment hold for a check. Fails while another payment is
    /// in flight. The hold is released when the guard drops.
    pub fn begin_payment_hold(
        &self,
        check_id: &str,
        request_id: &str,
    ) -> LockResult<PaymentHoldGuard> {
        match self.payment_holds.entry(check_id.to_string()) {
            Entry::Occupied(_) => Err(LockError::PaymentInFlight {
                check_id: check_id.to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(request_id.to_string());
                Ok(PaymentHoldGuard {
                    holds: self.payment_holds.clone(),
                    check_id: check_id.to_string(),
                })
            }
        }
    }

    /// Request id of the in-flight payment for a check, if any
    pub fn payment_hold(&self, check_id: &str) -> Option<String> {
        self.payment_holds
            .get(check_id)
            .map(|entry| entry.value().clone())
    }
}

/// RAII guard for a payment hold
pub struct PaymentHoldGuard {
    holds: Arc<DashMap<String, String>>,
    check_id: String,
}

impl Drop for PaymentHoldGuard {
    fn drop(&mut self) {
        self.holds.remove(&self.check_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_workstation_sees_the_holder() {
        let locks = LockManager::new(Duration::from_secs(60));
        locks.acquire("c1", "ws-a", "emp-1").unwrap();

        let err = locks.acquire("c1", "ws-b", "emp-2").unwrap_err();
        match err {
            LockError::Held(info) => {
                assert_eq!(info.workstation_id, "ws-a");
                assert_eq!(info.employee_id, "emp-1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn same_workstation_reenters() {
        let locks = LockManager::new(Duration::from_secs(60));
        let first = locks.acquire("c1", "ws-a", "emp-1").unwrap();
        let second = locks.acquire("c1", "ws-a", "emp-2").unwrap();

        assert_eq!(first.acquired_at, second.acquired_at);
        assert!(second.expires_at >= first.expires_at);
        assert_eq!(second.employee_id, "emp-2");
    }

    #[test]
    fn expired_lock_can_be_taken_over() {
        let locks = LockManager::new(Duration::from_millis(30));
        locks.acquire("c1", "ws-a", "emp-1").unwrap();

        assert!(locks.acquire("c1", "ws-b", "emp-2").is_err());
        std::thread::sleep(Duration::from_millis(60));

        let taken = locks.acquire("c1", "ws-b", "emp-2").unwrap();
        assert_eq!(taken.workstation_id, "ws-b");
    }

    #[test]
    fn release_ignores_non_holders() {
        let locks = LockManager::new(Duration::from_secs(60));
        locks.acquire("c1", "ws-a", "emp-1").unwrap();

        locks.release("c1", "ws-b");
        assert!(locks.holder("c1").is_some());

        locks.release("c1", "ws-a");
        assert!(locks.holder("c1").is_none());
    }

    #[test]
    fn release_all_clears_a_workstation() {
        let locks = LockManager::new(Duration::from_secs(60));
        locks.acquire("c1", "ws-a", "emp-1").unwrap();
        locks.acquire("c2", "ws-a", "emp-1").unwrap();
        locks.acquire("c3", "ws-b", "emp-2").unwrap();

        assert_eq!(locks.release_all("ws-a"), 2);
        assert!(locks.holder("c1").is_none());
        assert!(locks.holder("c3").is_some());
    }

    #[test]
    fn single_live_lock_under_contention() {
        let locks = Arc::new(LockManager::new(Duration::from_secs(60)));
        let winners: Vec<bool> = std::thread::scope(|scope| {
            (0..8)
                .map(|i| {
                    let locks = locks.clone();
                    scope.spawn(move || locks.acquire("c1", &format!("ws-{i}"), "emp").is_ok())
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(winners.iter().filter(|w| **w).count(), 1);
    }

    #[test]
    fn payment_hold_is_exclusive_and_releases_on_drop() {
        let locks = LockManager::new(Duration::from_secs(60));
        let guard = locks.begin_payment_hold("c1", "req-1").unwrap();

        assert!(locks.begin_payment_hold("c1", "req-2").is_err());
        assert_eq!(locks.payment_hold("c1").as_deref(), Some("req-1"));

        drop(guard);
        assert!(locks.payment_hold("c1").is_none());
        assert!(locks.begin_payment_hold("c1", "req-2").is_ok());
    }
}
