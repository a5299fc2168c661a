use crate::checks::storage::StorageError;
use crate::checks::traits::CheckError;
use crate::locks::LockError;
use shared::check::{CheckStatus, CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Classify a storage error into an operator-meaningful code. redb wraps
/// OS-level failures in strings, so variants are matched first and the
/// rest classified by inspection.
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::CheckNotFound(_) => return CommandErrorCode::CheckNotFound,
        _ => {}
    }

    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error during command");
                CommandError::new(code, e.to_string())
            }
            ManagerError::Check(e) => match e {
                CheckError::CheckNotFound(id) => CommandError::new(
                    CommandErrorCode::CheckNotFound,
                    format!("Check not found: {}", id),
                ),
                CheckError::CheckAlreadyClosed(id) => CommandError::new(
                    CommandErrorCode::CheckAlreadyClosed,
                    format!("Check already closed: {}", id),
                )
                .with_status(CheckStatus::Closed),
                CheckError::CheckAlreadyVoided(id) => CommandError::new(
                    CommandErrorCode::CheckAlreadyVoided,
                    format!("Check already voided: {}", id),
                )
                .with_status(CheckStatus::Voided),
                CheckError::ItemNotFound(id) => CommandError::new(
                    CommandErrorCode::ItemNotFound,
                    format!("Item not found: {}", id),
                ),
                CheckError::PaymentNotFound(id) => CommandError::new(
                    CommandErrorCode::PaymentNotFound,
                    format!("Payment not found: {}", id),
                ),
                CheckError::InvalidAmount => {
                    CommandError::new(CommandErrorCode::InvalidAmount, "Invalid amount")
                }
                CheckError::InvalidOperation(code, msg) => CommandError::new(code, msg),
                CheckError::Storage(msg) => {
                    CommandError::new(CommandErrorCode::InternalError, msg)
                }
            },
            ManagerError::Lock(e) => match e {
                LockError::Held(info) => CommandError::new(
                    CommandErrorCode::LockHeld,
                    format!("Check is locked by workstation {}", info.workstation_id),
                )
                .with_holder(info.holder()),
                LockError::PaymentInFlight { check_id } => CommandError::new(
                    CommandErrorCode::PaymentInFlight,
                    format!("A payment is in flight for check {}", check_id),
                ),
            },
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
