//! RecordTender and RecordAuthorization command handlers
//!
//! A tender is a cash-style payment: captured immediately, no gateway
//! session, change due computed terminal-side. An authorization is
//! recorded only AFTER the gateway confirmed it - the orchestrator owns
//! the gateway round trip, and the gateway transaction id is the join
//! key between the two records.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::money;
use shared::check::{CheckEvent, CheckEventType, CommandErrorCode, EventPayload};

/// Cash-style direct capture
#[derive(Debug, Clone)]
pub struct RecordTenderAction {
    pub check_id: String,
    pub tender_id: String,
    pub amount: Decimal,
}

/// Gateway authorization, post-confirmation
#[derive(Debug, Clone)]
pub struct RecordAuthorizationAction {
    pub check_id: String,
    pub tender_id: String,
    pub amount: Decimal,
    pub gateway_txn_id: String,
}

/// Common gates for recording a new payment against a check
fn validate_new_payment(
    snapshot: &shared::check::CheckSnapshot,
    amount: Decimal,
) -> Result<(), CheckError> {
    require_open(snapshot)?;
    money::validate_amount(amount).map_err(|_| CheckError::InvalidAmount)?;

    let pending = snapshot.pending_count();
    if pending > 0 {
        return Err(CheckError::InvalidOperation(
            CommandErrorCode::PendingItemsRemain,
            format!("{pending} pending item(s) must be finalized or voided before payment"),
        ));
    }

    // the applied amount never exceeds the remaining balance; over-tender
    // and change are terminal-side computations, not backend state
    let remaining = snapshot.remaining_due();
    if amount > remaining {
        return Err(CheckError::InvalidOperation(
            CommandErrorCode::InvalidAmount,
            format!("Payment amount {amount} exceeds remaining balance {remaining}"),
        ));
    }

    Ok(())
}

#[async_trait]
impl CommandHandler for RecordTenderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        validate_new_payment(&snapshot, self.amount)?;

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::PaymentCaptured,
            EventPayload::PaymentCaptured {
                payment_id: uuid::Uuid::new_v4().to_string(),
                tender_id: Some(self.tender_id.clone()),
                amount: self.amount,
                tip: Decimal::ZERO,
            },
        );

        Ok(vec![event])
    }
}

#[async_trait]
impl CommandHandler for RecordAuthorizationAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        validate_new_payment(&snapshot, self.amount)?;

        // one local record per gateway session
        if snapshot
            .payments
            .iter()
            .any(|p| p.gateway_txn_id.as_deref() == Some(self.gateway_txn_id.as_str()))
        {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::PaymentStateConflict,
                format!("Gateway transaction {} is already recorded", self.gateway_txn_id),
            ));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::PaymentAuthorized,
            EventPayload::PaymentAuthorized {
                payment_id: uuid::Uuid::new_v4().to_string(),
                tender_id: self.tender_id.clone(),
                amount: self.amount,
                gateway_txn_id: self.gateway_txn_id.clone(),
            },
        );

        Ok(vec![event])
    }
}
