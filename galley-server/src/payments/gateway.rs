//! Payment gateway capability seam
//!
//! One trait, one implementation per processor - never string-keyed
//! branching at call sites. The orchestrator treats every processor as
//! the same capability set.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configured processor, tagged so site config deserializes into a
/// concrete adapter choice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessorKind {
    Stripe,
    Elavon,
    Heartland,
    /// No card processor configured (cash-only site)
    None,
}

/// A confirmed authorization
#[derive(Debug, Clone)]
pub struct GatewayAuth {
    /// Gateway session id - the join key between the gateway's ledger
    /// and the local payment record
    pub txn_id: String,
}

/// Gateway-side view of a payment attempt, keyed by the client request id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    /// The gateway never saw this request id
    NotFound,
    Authorized { txn_id: String },
    Captured,
    Voided,
    Refunded,
}

/// Gateway failures, kept distinct from state-machine conflicts
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The request may or may not have landed. Callers must resolve via
    /// `get_status` before treating this as a failure.
    #[error("Gateway timed out")]
    Timeout,

    #[error("Gateway protocol error: {0}")]
    Protocol(String),

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Processor capability interface
///
/// `request_id` is the client-generated idempotency key for the attempt:
/// a well-behaved adapter deduplicates on it, and the orchestrator never
/// reuses one for a fresh authorization.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    async fn authorize(
        &self,
        request_id: &str,
        tender_id: &str,
        amount: Decimal,
    ) -> Result<GatewayAuth, GatewayError>;

    async fn capture(&self, txn_id: &str, final_amount: Decimal) -> Result<(), GatewayError>;

    async fn void(&self, txn_id: &str) -> Result<(), GatewayError>;

    async fn refund(&self, txn_id: &str, amount: Decimal) -> Result<(), GatewayError>;

    async fn get_status(&self, request_id: &str) -> Result<GatewayStatus, GatewayError>;
}

/// Adapter for sites with no card processor: every card operation is
/// refused up front, cash tenders never reach the gateway.
pub struct NullGateway;

#[async_trait]
impl GatewayAdapter for NullGateway {
    async fn authorize(
        &self,
        _request_id: &str,
        _tender_id: &str,
        _amount: Decimal,
    ) -> Result<GatewayAuth, GatewayError> {
        Err(GatewayError::Unavailable(
            "no payment processor configured".to_string(),
        ))
    }

    async fn capture(&self, _txn_id: &str, _final_amount: Decimal) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable(
            "no payment processor configured".to_string(),
        ))
    }

    async fn void(&self, _txn_id: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable(
            "no payment processor configured".to_string(),
        ))
    }

    async fn refund(&self, _txn_id: &str, _amount: Decimal) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable(
            "no payment processor configured".to_string(),
        ))
    }

    async fn get_status(&self, _request_id: &str) -> Result<GatewayStatus, GatewayError> {
        Ok(GatewayStatus::NotFound)
    }
}
