//! Offline authentication
//!
//! While disconnected, sign-in falls back to locally cached credentials
//! synced during the last online session. An offline session carries a
//! deliberately reduced, fixed privilege set - a fail-safe degradation:
//! the terminal keeps taking orders and cash, but anything that needs
//! the backend's judgment (sent-item voids, card operations, refunds)
//! waits for connectivity.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::check::CheckCommandPayload;
use shared::util::now_millis;
use std::path::Path;
use std::sync::Arc;

use crate::error::{TerminalError, TerminalResult};

const CREDENTIALS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("credentials");

/// What an offline session may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfflinePrivilege {
    OpenCheck,
    EditUnsentItems,
    SendCheck,
    CancelTransaction,
    CashTender,
    CloseCheck,
    AttachCustomer,
}

/// The fixed offline privilege set. Deliberately NOT the full online
/// privilege list: no sent-item voids, no check voids, no card
/// operations, no refunds.
pub const OFFLINE_PRIVILEGES: &[OfflinePrivilege] = &[
    OfflinePrivilege::OpenCheck,
    OfflinePrivilege::EditUnsentItems,
    OfflinePrivilege::SendCheck,
    OfflinePrivilege::CancelTransaction,
    OfflinePrivilege::CashTender,
    OfflinePrivilege::CloseCheck,
    OfflinePrivilege::AttachCustomer,
];

/// The privilege a command needs offline; None means the operation is
/// not available offline at all
fn required_privilege(payload: &CheckCommandPayload) -> Option<OfflinePrivilege> {
    match payload {
        CheckCommandPayload::OpenCheck { .. } => Some(OfflinePrivilege::OpenCheck),
        CheckCommandPayload::AddItems { .. }
        | CheckCommandPayload::FinalizeItem { .. }
        | CheckCommandPayload::ModifyItem { .. } => Some(OfflinePrivilege::EditUnsentItems),
        // unsent-item voids ride on the edit privilege; the projection
        // refuses sent-item voids regardless
        CheckCommandPayload::VoidItem { .. } => Some(OfflinePrivilege::EditUnsentItems),
        CheckCommandPayload::SendCheck { .. } => Some(OfflinePrivilege::SendCheck),
        CheckCommandPayload::CancelTransaction { .. } => {
            Some(OfflinePrivilege::CancelTransaction)
        }
        CheckCommandPayload::RecordTender { .. } => Some(OfflinePrivilege::CashTender),
        CheckCommandPayload::CloseCheck { .. } => Some(OfflinePrivilege::CloseCheck),
        CheckCommandPayload::AttachCustomer { .. }
        | CheckCommandPayload::DetachCustomer { .. } => Some(OfflinePrivilege::AttachCustomer),
        CheckCommandPayload::RecordAuthorization { .. }
        | CheckCommandPayload::RecordCapture { .. }
        | CheckCommandPayload::RecordPaymentVoid { .. }
        | CheckCommandPayload::RecordRefund { .. }
        | CheckCommandPayload::VoidCheck { .. } => None,
    }
}

/// A cached credential record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCredential {
    employee_id: String,
    name: String,
    pin_hash: String,
    cached_at: i64,
}

/// An authenticated offline session
#[derive(Debug, Clone)]
pub struct OfflineSession {
    pub employee_id: String,
    pub employee_name: String,
    pub privileges: &'static [OfflinePrivilege],
}

impl OfflineSession {
    pub fn allows(&self, privilege: OfflinePrivilege) -> bool {
        self.privileges.contains(&privilege)
    }

    /// Whether this session may issue the given command offline
    pub fn permits(&self, payload: &CheckCommandPayload) -> bool {
        required_privilege(payload).is_some_and(|p| self.allows(p))
    }
}

/// Durable credential cache, refreshed whenever the terminal is online
pub struct CredentialCache {
    db: Arc<Database>,
}

impl CredentialCache {
    pub fn open(path: impl AsRef<Path>) -> TerminalResult<Self> {
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(CREDENTIALS_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Cache an employee's PIN (called from the online sync path)
    pub fn store(&self, employee_id: &str, name: &str, pin: &str) -> TerminalResult<()> {
        let salt = SaltString::generate(&mut OsRng);
        let pin_hash = Argon2::default()
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| TerminalError::Auth(e.to_string()))?
            .to_string();

        let record = CachedCredential {
            employee_id: employee_id.to_string(),
            name: name.to_string(),
            pin_hash,
            cached_at: now_millis(),
        };

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CREDENTIALS_TABLE)?;
            let value = serde_json::to_vec(&record)?;
            table.insert(employee_id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Offline sign-in. Success yields a session limited to
    /// [`OFFLINE_PRIVILEGES`].
    pub fn sign_in(&self, employee_id: &str, pin: &str) -> TerminalResult<OfflineSession> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CREDENTIALS_TABLE)?;
        let record: CachedCredential = match table.get(employee_id)? {
            Some(guard) => serde_json::from_slice(guard.value())?,
            None => {
                return Err(TerminalError::Auth(format!(
                    "no cached credentials for employee {employee_id}"
                )));
            }
        };

        let parsed = PasswordHash::new(&record.pin_hash)
            .map_err(|e| TerminalError::Auth(e.to_string()))?;
        Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .map_err(|_| TerminalError::Auth("invalid PIN".to_string()))?;

        tracing::info!(employee_id, "Offline sign-in with reduced privileges");
        Ok(OfflineSession {
            employee_id: record.employee_id,
            employee_name: record.name,
            privileges: OFFLINE_PRIVILEGES,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn cache() -> (tempfile::TempDir, CredentialCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::open(dir.path().join("credentials.redb")).unwrap();
        (dir, cache)
    }

    #[test]
    fn sign_in_verifies_the_cached_pin() {
        let (_dir, cache) = cache();
        cache.store("emp-1", "Sam", "4242").unwrap();

        let session = cache.sign_in("emp-1", "4242").unwrap();
        assert_eq!(session.employee_name, "Sam");

        assert!(matches!(
            cache.sign_in("emp-1", "0000").unwrap_err(),
            TerminalError::Auth(_)
        ));
        assert!(matches!(
            cache.sign_in("emp-9", "4242").unwrap_err(),
            TerminalError::Auth(_)
        ));
    }

    #[test]
    fn offline_sessions_are_reduced() {
        let (_dir, cache) = cache();
        cache.store("emp-1", "Sam", "4242").unwrap();
        let session = cache.sign_in("emp-1", "4242").unwrap();

        assert!(session.permits(&CheckCommandPayload::SendCheck {
            check_id: "c1".to_string(),
        }));
        assert!(session.permits(&CheckCommandPayload::RecordTender {
            check_id: "c1".to_string(),
            tender_id: "CASH".to_string(),
            amount: Decimal::from(10),
        }));

        // not part of the offline set, regardless of online role
        assert!(!session.permits(&CheckCommandPayload::RecordRefund {
            check_id: "c1".to_string(),
            payment_id: "p1".to_string(),
            amount: Decimal::from(10),
        }));
        assert!(!session.permits(&CheckCommandPayload::VoidCheck {
            check_id: "c1".to_string(),
            reason: None,
            authorizer_id: None,
            authorizer_name: None,
        }));
    }
}
