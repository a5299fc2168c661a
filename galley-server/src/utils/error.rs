//! HTTP error mapping
//!
//! Every mutating endpoint returns either the updated entity or a
//! structured conflict identifying the current holder/state - never a
//! silent failure. `CommandError` rides through to the response body
//! intact so terminals can decide retry vs. abandon.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::check::{CheckStatus, CommandError, CommandErrorCode};
use shared::lock::{LockHolder, LockInfo};
use tracing::error;

use crate::payments::{GatewayError, PaymentError};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<CheckStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<LockHolder>,
}

/// Application errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// State-machine or lock conflict from the command pipeline
    #[error("{}", .0.message)]
    Command(CommandError),

    /// Lock acquisition conflict with the holding identity
    #[error("Check {} is locked", .0.check_id)]
    Locked(LockInfo),

    #[error(transparent)]
    Payment(PaymentError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        AppError::Command(err)
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        AppError::Payment(err)
    }
}

/// HTTP status for a command error code
fn command_status(code: CommandErrorCode) -> StatusCode {
    use CommandErrorCode::*;
    match code {
        CheckNotFound | ItemNotFound | PaymentNotFound => StatusCode::NOT_FOUND,
        CheckAlreadyClosed | CheckAlreadyVoided | ItemAlreadyVoided | ItemAlreadySent
        | ApprovalRequired | PendingItemsRemain | SentItemsRemain | BalanceOutstanding
        | PaymentStateConflict | LockHeld | PaymentInFlight | DuplicateCommand => {
            StatusCode::CONFLICT
        }
        ValidationFailed | InvalidAmount | InvalidOperation => StatusCode::BAD_REQUEST,
        InternalError | SystemBusy | StorageFull | StorageCorrupted | OutOfMemory => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message,
                    current_status: None,
                    holder: None,
                },
            ),
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_FAILED".to_string(),
                    message,
                    current_status: None,
                    holder: None,
                },
            ),
            AppError::Command(err) => (
                command_status(err.code),
                ErrorBody {
                    code: serde_variant_name(&err.code),
                    message: err.message,
                    current_status: err.current_status,
                    holder: err.holder,
                },
            ),
            AppError::Locked(info) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "LOCK_HELD".to_string(),
                    message: format!(
                        "Check {} is locked by workstation {}",
                        info.check_id, info.workstation_id
                    ),
                    current_status: None,
                    holder: Some(info.holder()),
                },
            ),
            AppError::Payment(err) => payment_error_body(err),
            AppError::Internal(message) => {
                error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "Internal server error".to_string(),
                        current_status: None,
                        holder: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn payment_error_body(err: PaymentError) -> (StatusCode, ErrorBody) {
    match err {
        PaymentError::Conflict(command_err) => (
            command_status(command_err.code),
            ErrorBody {
                code: serde_variant_name(&command_err.code),
                message: command_err.message,
                current_status: command_err.current_status,
                holder: command_err.holder,
            },
        ),
        PaymentError::InFlight(check_id) => (
            StatusCode::CONFLICT,
            ErrorBody {
                code: "PAYMENT_IN_FLIGHT".to_string(),
                message: format!("A payment is in flight for check {check_id}"),
                current_status: None,
                holder: None,
            },
        ),
        PaymentError::CheckNotFound(id) | PaymentError::PaymentNotFound(id) => (
            StatusCode::NOT_FOUND,
            ErrorBody {
                code: "NOT_FOUND".to_string(),
                message: format!("Not found: {id}"),
                current_status: None,
                holder: None,
            },
        ),
        PaymentError::Gateway(gateway_err) => {
            let message = gateway_err.to_string();
            let code = match gateway_err {
                GatewayError::Declined(_) => "GATEWAY_DECLINED",
                GatewayError::Timeout => "GATEWAY_TIMEOUT",
                GatewayError::Protocol(_) | GatewayError::Unavailable(_) => "GATEWAY_ERROR",
            };
            (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    code: code.to_string(),
                    message,
                    current_status: None,
                    holder: None,
                },
            )
        }
        PaymentError::Internal(message) => {
            error!(error = %message, "Payment internal error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message,
                    current_status: None,
                    holder: None,
                },
            )
        }
    }
}

/// SCREAMING_SNAKE_CASE name of a command error code, matching its wire
/// serialization
fn serde_variant_name(code: &CommandErrorCode) -> String {
    serde_json::to_value(code)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "INTERNAL_ERROR".to_string())
}
