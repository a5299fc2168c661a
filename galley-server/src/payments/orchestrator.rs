//! Payment orchestrator
//!
//! Sequences authorize/capture/void/refund against the gateway adapter
//! and the check state machine, under these rules:
//!
//! - a payment record is created only AFTER the gateway confirmed; the
//!   gateway transaction id is the join key
//! - a gateway timeout is *unknown*, not failure: the orchestrator
//!   re-queries status with bounded backoff before deciding, and never
//!   issues a fresh authorization for the same request id
//! - gateway calls run WITHOUT the check's editing lock held; the
//!   payment hold keeps other actors off the check while a call is in
//!   flight, independent of editing-lock expiry
//! - the `Record*` command's id IS the client request id, so a replayed
//!   attempt deduplicates in the state machine

use crate::checks::manager::CheckManager;
use crate::locks::{LockError, PaymentHoldGuard};
use rust_decimal::Decimal;
use shared::check::{
    CheckCommand, CheckCommandPayload, CommandError, CommandResponse, PaymentStatus,
};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::gateway::{GatewayAdapter, GatewayAuth, GatewayError, GatewayStatus};

/// Base delay between status re-queries
const STATUS_BACKOFF_BASE: Duration = Duration::from_millis(200);
/// Cap on the status re-query delay
const STATUS_BACKOFF_MAX: Duration = Duration::from_secs(2);

/// Orchestrator failures
///
/// Gateway trouble and state-machine conflicts surface as distinct
/// variants; callers retry, re-query, or abandon accordingly.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Command rejected: {}", .0.message)]
    Conflict(CommandError),

    #[error("A payment is already in flight for check {0}")]
    InFlight(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Check not found: {0}")]
    CheckNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Identity of the operator driving a payment
#[derive(Debug, Clone)]
pub struct Operator {
    pub workstation_id: String,
    pub employee_id: String,
    pub employee_name: String,
}

/// Payment orchestrator over one gateway adapter
pub struct PaymentOrchestrator {
    manager: CheckManager,
    gateway: Arc<dyn GatewayAdapter>,
    gateway_timeout: Duration,
    status_retries: u32,
}

impl PaymentOrchestrator {
    pub fn new(
        manager: CheckManager,
        gateway: Arc<dyn GatewayAdapter>,
        gateway_timeout: Duration,
        status_retries: u32,
    ) -> Self {
        Self {
            manager,
            gateway,
            gateway_timeout,
            status_retries,
        }
    }

    /// Authorize a card payment
    ///
    /// `request_id` is the client-generated idempotency key for this
    /// attempt; retrying with the same id after a lost response cannot
    /// double-charge.
    pub async fn authorize(
        &self,
        check_id: &str,
        request_id: &str,
        operator: &Operator,
        tender_id: &str,
        amount: Decimal,
    ) -> Result<CommandResponse, PaymentError> {
        let _hold = self.take_hold(check_id, request_id)?;
        self.precheck_balance(check_id, amount)?;

        let auth = self.authorize_with_resolution(request_id, tender_id, amount).await?;

        let response = self.manager.execute_command(self.command(
            operator,
            request_id,
            CheckCommandPayload::RecordAuthorization {
                check_id: check_id.to_string(),
                tender_id: tender_id.to_string(),
                amount,
                gateway_txn_id: auth.txn_id.clone(),
            },
        ));

        if response.success {
            Ok(response)
        } else {
            // the state machine refused after the gateway said yes: undo
            // the gateway side so money and records stay aligned
            if let Err(e) = self.gateway.void(&auth.txn_id).await {
                tracing::error!(
                    check_id,
                    txn_id = %auth.txn_id,
                    error = %e,
                    "Failed to void orphaned authorization; requires manual reconciliation"
                );
            }
            Err(PaymentError::Conflict(response.error.unwrap_or_else(|| {
                CommandError::new(
                    shared::check::CommandErrorCode::InternalError,
                    "command failed without error detail",
                )
            })))
        }
    }

    /// Capture an authorized payment, adding the tip at capture time.
    /// The captured amount is `authorized + tip`.
    pub async fn capture(
        &self,
        check_id: &str,
        request_id: &str,
        operator: &Operator,
        payment_id: &str,
        tip: Decimal,
    ) -> Result<CommandResponse, PaymentError> {
        let _hold = self.take_hold(check_id, request_id)?;

        let payment = self.find_payment(check_id, payment_id)?;
        let Some(txn_id) = payment.gateway_txn_id.clone() else {
            return Err(PaymentError::Internal(format!(
                "payment {payment_id} has no gateway session"
            )));
        };

        let final_amount = payment.amount + tip;
        let call = self.gateway.capture(&txn_id, final_amount);
        match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(GatewayError::Timeout)) | Err(_) => {
                self.expect_status(request_id, GatewayStatus::Captured).await?;
            }
            Ok(Err(other)) => return Err(other.into()),
        }

        self.record(
            operator,
            request_id,
            CheckCommandPayload::RecordCapture {
                check_id: check_id.to_string(),
                payment_id: payment_id.to_string(),
                tip,
            },
        )
    }

    /// Void an authorized, uncaptured payment
    pub async fn void_payment(
        &self,
        check_id: &str,
        request_id: &str,
        operator: &Operator,
        payment_id: &str,
    ) -> Result<CommandResponse, PaymentError> {
        let _hold = self.take_hold(check_id, request_id)?;

        let payment = self.find_payment(check_id, payment_id)?;
        if let Some(txn_id) = payment.gateway_txn_id.clone() {
            let call = self.gateway.void(&txn_id);
            match tokio::time::timeout(self.gateway_timeout, call).await {
                Ok(Ok(())) => {}
                Ok(Err(GatewayError::Timeout)) | Err(_) => {
                    self.expect_status(request_id, GatewayStatus::Voided).await?;
                }
                Ok(Err(other)) => return Err(other.into()),
            }
        }

        self.record(
            operator,
            request_id,
            CheckCommandPayload::RecordPaymentVoid {
                check_id: check_id.to_string(),
                payment_id: payment_id.to_string(),
            },
        )
    }

    /// Refund a captured payment, fully or partially
    pub async fn refund(
        &self,
        check_id: &str,
        request_id: &str,
        operator: &Operator,
        payment_id: &str,
        amount: Decimal,
    ) -> Result<CommandResponse, PaymentError> {
        let _hold = self.take_hold(check_id, request_id)?;

        let payment = self.find_payment(check_id, payment_id)?;
        if payment.status != PaymentStatus::Captured {
            return Err(PaymentError::Conflict(CommandError::new(
                shared::check::CommandErrorCode::PaymentStateConflict,
                format!("payment {payment_id} is not captured"),
            )));
        }
        if let Some(txn_id) = payment.gateway_txn_id.clone() {
            let call = self.gateway.refund(&txn_id, amount);
            match tokio::time::timeout(self.gateway_timeout, call).await {
                Ok(Ok(())) => {}
                Ok(Err(GatewayError::Timeout)) | Err(_) => {
                    self.expect_status(request_id, GatewayStatus::Refunded).await?;
                }
                Ok(Err(other)) => return Err(other.into()),
            }
        }

        self.record(
            operator,
            request_id,
            CheckCommandPayload::RecordRefund {
                check_id: check_id.to_string(),
                payment_id: payment_id.to_string(),
                amount,
            },
        )
    }

    /// Record a cash-style tender. No gateway round trip; the command is
    /// atomic in the state machine and deduplicates on the request id.
    pub fn record_tender(
        &self,
        check_id: &str,
        request_id: &str,
        operator: &Operator,
        tender_id: &str,
        amount: Decimal,
    ) -> Result<CommandResponse, PaymentError> {
        self.record(
            operator,
            request_id,
            CheckCommandPayload::RecordTender {
                check_id: check_id.to_string(),
                tender_id: tender_id.to_string(),
                amount,
            },
        )
    }

    // ========== Internals ==========

    fn take_hold(&self, check_id: &str, request_id: &str) -> Result<PaymentHoldGuard, PaymentError> {
        self.manager
            .locks()
            .begin_payment_hold(check_id, request_id)
            .map_err(|e| match e {
                LockError::PaymentInFlight { check_id } => PaymentError::InFlight(check_id),
                LockError::Held(info) => PaymentError::InFlight(info.check_id),
            })
    }

    /// Cheap pre-gateway validation; the state machine re-validates
    /// authoritatively when the record command lands
    fn precheck_balance(&self, check_id: &str, amount: Decimal) -> Result<(), PaymentError> {
        let snapshot = self
            .manager
            .get_snapshot(check_id)
            .map_err(|e| PaymentError::Internal(e.to_string()))?
            .ok_or_else(|| PaymentError::CheckNotFound(check_id.to_string()))?;
        if !snapshot.is_open() {
            return Err(PaymentError::Conflict(
                CommandError::new(
                    shared::check::CommandErrorCode::InvalidOperation,
                    format!("check {check_id} is not open"),
                )
                .with_status(snapshot.status),
            ));
        }
        if amount > snapshot.remaining_due() {
            return Err(PaymentError::Conflict(CommandError::new(
                shared::check::CommandErrorCode::InvalidAmount,
                format!(
                    "amount {amount} exceeds remaining balance {}",
                    snapshot.remaining_due()
                ),
            )));
        }
        Ok(())
    }

    fn find_payment(
        &self,
        check_id: &str,
        payment_id: &str,
    ) -> Result<shared::check::PaymentRecord, PaymentError> {
        let snapshot = self
            .manager
            .get_snapshot(check_id)
            .map_err(|e| PaymentError::Internal(e.to_string()))?
            .ok_or_else(|| PaymentError::CheckNotFound(check_id.to_string()))?;
        snapshot
            .find_payment(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::PaymentNotFound(payment_id.to_string()))
    }

    /// Authorize with timeout resolution: a timed-out call is resolved by
    /// status query, never by blindly re-issuing the authorization.
    async fn authorize_with_resolution(
        &self,
        request_id: &str,
        tender_id: &str,
        amount: Decimal,
    ) -> Result<GatewayAuth, PaymentError> {
        let call = self.gateway.authorize(request_id, tender_id, amount);
        match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(Ok(auth)) => Ok(auth),
            Ok(Err(GatewayError::Timeout)) | Err(_) => {
                match self.query_status(request_id).await? {
                    GatewayStatus::Authorized { txn_id } => Ok(GatewayAuth { txn_id }),
                    GatewayStatus::NotFound => {
                        // confirmed: the request never landed
                        Err(GatewayError::Timeout.into())
                    }
                    other => Err(PaymentError::Internal(format!(
                        "unexpected gateway status after authorize timeout: {other:?}"
                    ))),
                }
            }
            Ok(Err(other)) => Err(other.into()),
        }
    }

    /// Resolve a timed-out capture/void/refund by expecting a terminal
    /// status
    async fn expect_status(
        &self,
        request_id: &str,
        expected: GatewayStatus,
    ) -> Result<(), PaymentError> {
        let status = self.query_status(request_id).await?;
        if status == expected {
            Ok(())
        } else if status == GatewayStatus::NotFound {
            Err(GatewayError::Timeout.into())
        } else {
            Err(PaymentError::Internal(format!(
                "unexpected gateway status {status:?}, expected {expected:?}"
            )))
        }
    }

    /// Query gateway status with bounded exponential backoff
    async fn query_status(&self, request_id: &str) -> Result<GatewayStatus, PaymentError> {
        let mut backoff = STATUS_BACKOFF_BASE;
        let mut last_error = None;
        for attempt in 0..self.status_retries {
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(STATUS_BACKOFF_MAX);

            match self.gateway.get_status(request_id).await {
                Ok(status) => {
                    tracing::info!(request_id, ?status, attempt, "Gateway status resolved");
                    return Ok(status);
                }
                Err(e) => {
                    tracing::warn!(request_id, attempt, error = %e, "Gateway status query failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(GatewayError::Timeout).into())
    }

    fn record(
        &self,
        operator: &Operator,
        request_id: &str,
        payload: CheckCommandPayload,
    ) -> Result<CommandResponse, PaymentError> {
        let response = self.manager.execute_command(self.command(operator, request_id, payload));
        if response.success {
            Ok(response)
        } else {
            Err(PaymentError::Conflict(response.error.unwrap_or_else(|| {
                CommandError::new(
                    shared::check::CommandErrorCode::InternalError,
                    "command failed without error detail",
                )
            })))
        }
    }

    fn command(
        &self,
        operator: &Operator,
        request_id: &str,
        payload: CheckCommandPayload,
    ) -> CheckCommand {
        CheckCommand {
            command_id: request_id.to_string(),
            workstation_id: operator.workstation_id.clone(),
            employee_id: operator.employee_id.clone(),
            employee_name: operator.employee_name.clone(),
            timestamp: now_millis(),
            payload,
        }
    }
}
