//! Offline projection - optimistic local application of commands
//!
//! While disconnected the terminal still has to show the cashier a
//! coherent check, so queued mutations are applied to the replica
//! snapshot with the same money arithmetic the backend uses. The
//! projection enforces the same hard boundaries the state machine does
//! (sent items, pending items, balances) so an offline terminal cannot
//! build up a queue the backend is guaranteed to refuse.
//!
//! The result is always provisional: once the reconciler drains the
//! queue, the backend's canonical snapshots overwrite whatever the
//! projection produced.

use shared::check::money;
use shared::check::{
    CheckCommand, CheckCommandPayload, CheckItemSnapshot, CheckSnapshot, ItemStatus, PaymentRecord,
    PaymentStatus, RoundItem, RoundRecord,
};
use rust_decimal::Decimal;

use crate::error::{TerminalError, TerminalResult};

fn rejected(message: impl Into<String>) -> TerminalError {
    TerminalError::Rejected(message.into())
}

fn require_open(snapshot: &CheckSnapshot) -> TerminalResult<()> {
    if !snapshot.is_open() {
        return Err(rejected(format!(
            "check {} is no longer open",
            snapshot.check_id
        )));
    }
    Ok(())
}

/// Apply one command to a local snapshot.
///
/// For `OpenCheck` the snapshot must be freshly created with the local
/// placeholder id and the payload must already carry the reserved check
/// number.
pub fn apply_command(snapshot: &mut CheckSnapshot, command: &CheckCommand) -> TerminalResult<()> {
    let now = shared::util::now_millis();

    match &command.payload {
        CheckCommandPayload::OpenCheck {
            rvc_id,
            order_type,
            check_number,
            customer_id,
        } => {
            snapshot.check_number = check_number
                .ok_or_else(|| rejected("offline open requires a reserved check number"))?;
            snapshot.rvc_id = rvc_id.clone();
            snapshot.workstation_id = command.workstation_id.clone();
            snapshot.employee_id = command.employee_id.clone();
            snapshot.employee_name = command.employee_name.clone();
            snapshot.order_type = *order_type;
            snapshot.customer_id = customer_id.clone();
        }

        CheckCommandPayload::AddItems { items, .. } => {
            require_open(snapshot)?;
            for input in items {
                money::validate_item(input).map_err(|e| rejected(e.0))?;
                let instance_id = input
                    .instance_id
                    .clone()
                    .ok_or_else(|| rejected("offline items need client instance ids"))?;
                snapshot.items.push(CheckItemSnapshot {
                    instance_id,
                    menu_item_id: input.menu_item_id.clone(),
                    name: input.name.clone(),
                    unit_price: input.unit_price,
                    quantity: input.quantity,
                    modifiers: input.modifiers.clone(),
                    seat_number: input.seat_number,
                    // offline terminals have no tax table feed; rate 0
                    // until the backend's canonical snapshot lands
                    tax_rate: Decimal::ZERO,
                    item_status: if input.pending {
                        ItemStatus::Pending
                    } else {
                        ItemStatus::Active
                    },
                    sent: false,
                    void_reason: None,
                });
            }
            money::recalculate_totals(snapshot);
        }

        CheckCommandPayload::FinalizeItem {
            instance_id,
            modifiers,
            ..
        } => {
            require_open(snapshot)?;
            let item = snapshot
                .items
                .iter_mut()
                .find(|i| i.instance_id == *instance_id)
                .ok_or_else(|| rejected(format!("item {instance_id} not found")))?;
            if !item.is_pending() {
                return Err(rejected(format!("item {instance_id} is not pending")));
            }
            item.modifiers = modifiers.clone();
            item.item_status = ItemStatus::Active;
            money::recalculate_totals(snapshot);
        }

        CheckCommandPayload::ModifyItem {
            instance_id,
            changes,
            ..
        } => {
            require_open(snapshot)?;
            money::validate_item_changes(changes).map_err(|e| rejected(e.0))?;
            let item = snapshot
                .items
                .iter_mut()
                .find(|i| i.instance_id == *instance_id)
                .ok_or_else(|| rejected(format!("item {instance_id} not found")))?;
            if item.sent {
                return Err(rejected(format!("item {instance_id} has been sent")));
            }
            if item.is_voided() {
                return Err(rejected(format!("item {instance_id} is voided")));
            }
            if let Some(price) = changes.unit_price {
                item.unit_price = price;
            }
            if let Some(quantity) = changes.quantity {
                item.quantity = quantity;
            }
            if let Some(modifiers) = &changes.modifiers {
                item.modifiers = modifiers.clone();
            }
            if let Some(seat) = changes.seat_number {
                item.seat_number = Some(seat);
            }
            money::recalculate_totals(snapshot);
        }

        CheckCommandPayload::VoidItem {
            instance_id,
            reason,
            authorizer_id,
            ..
        } => {
            require_open(snapshot)?;
            let item = snapshot
                .items
                .iter_mut()
                .find(|i| i.instance_id == *instance_id)
                .ok_or_else(|| rejected(format!("item {instance_id} not found")))?;
            if item.is_voided() {
                return Err(rejected(format!("item {instance_id} is already voided")));
            }
            if item.sent && authorizer_id.is_none() {
                return Err(rejected("voiding a sent item requires manager approval"));
            }
            item.item_status = ItemStatus::Voided;
            item.void_reason = reason.clone();
            money::recalculate_totals(snapshot);
        }

        CheckCommandPayload::SendCheck { .. } => {
            require_open(snapshot)?;
            if snapshot.pending_count() > 0 {
                return Err(rejected("pending items must be finalized before sending"));
            }
            let round_items: Vec<RoundItem> = snapshot
                .items
                .iter()
                .filter(|i| i.is_active() && !i.sent)
                .map(|i| RoundItem {
                    instance_id: i.instance_id.clone(),
                    name: i.name.clone(),
                    quantity: i.quantity,
                    modifiers: i.modifiers.clone(),
                    seat_number: i.seat_number,
                })
                .collect();
            if !round_items.is_empty() {
                for round_item in &round_items {
                    if let Some(item) = snapshot
                        .items
                        .iter_mut()
                        .find(|i| i.instance_id == round_item.instance_id)
                    {
                        item.sent = true;
                    }
                }
                snapshot.rounds.push(RoundRecord {
                    round_number: snapshot.rounds.len() as u32 + 1,
                    sent_at: now,
                    items: round_items,
                });
            }
        }

        CheckCommandPayload::CancelTransaction { .. } => {
            require_open(snapshot)?;
            for item in snapshot
                .items
                .iter_mut()
                .filter(|i| !i.sent && i.item_status != ItemStatus::Voided)
            {
                item.item_status = ItemStatus::Voided;
                item.void_reason = Some("transaction cancelled".to_string());
            }
            money::recalculate_totals(snapshot);
        }

        CheckCommandPayload::RecordTender {
            tender_id, amount, ..
        } => {
            require_open(snapshot)?;
            money::validate_amount(*amount).map_err(|e| rejected(e.0))?;
            if snapshot.pending_count() > 0 {
                return Err(rejected("pending items must be finalized before payment"));
            }
            if *amount > snapshot.remaining_due() {
                return Err(rejected("amount exceeds the remaining balance"));
            }
            snapshot.payments.push(PaymentRecord {
                payment_id: uuid::Uuid::new_v4().to_string(),
                tender_id: tender_id.clone(),
                amount: *amount,
                tip: Decimal::ZERO,
                status: PaymentStatus::Captured,
                gateway_txn_id: None,
                refunded_amount: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            });
        }

        CheckCommandPayload::RecordAuthorization { .. }
        | CheckCommandPayload::RecordCapture { .. }
        | CheckCommandPayload::RecordPaymentVoid { .. }
        | CheckCommandPayload::RecordRefund { .. } => {
            return Err(rejected("card operations require the payment gateway"));
        }

        CheckCommandPayload::CloseCheck { .. } => {
            require_open(snapshot)?;
            if snapshot.pending_count() > 0 {
                return Err(rejected("pending items must be finalized before closing"));
            }
            if !snapshot.remaining_due().is_zero() {
                return Err(rejected("balance is still due"));
            }
            snapshot.status = shared::check::CheckStatus::Closed;
            snapshot.closed_at = Some(now);
        }

        CheckCommandPayload::VoidCheck { .. } => {
            require_open(snapshot)?;
            if snapshot.has_sent_items() {
                return Err(rejected("check has sent items; void them individually"));
            }
            if snapshot.applied_payment_total() > Decimal::ZERO {
                return Err(rejected("check has captured payments"));
            }
            snapshot.status = shared::check::CheckStatus::Voided;
            snapshot.closed_at = Some(now);
        }

        CheckCommandPayload::AttachCustomer { customer_id, .. } => {
            require_open(snapshot)?;
            snapshot.customer_id = Some(customer_id.clone());
        }

        CheckCommandPayload::DetachCustomer { .. } => {
            require_open(snapshot)?;
            snapshot.customer_id = None;
        }
    }

    snapshot.updated_at = now;
    snapshot.update_checksum();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::check::{CheckItemInput, OrderType};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cmd(payload: CheckCommandPayload) -> CheckCommand {
        CheckCommand::new("ws-1", "emp-1", "Offline Operator", payload)
    }

    fn open_snapshot() -> CheckSnapshot {
        let mut snapshot = CheckSnapshot::new("local-1".to_string());
        apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::OpenCheck {
                rvc_id: "rvc-1".to_string(),
                order_type: OrderType::DineIn,
                check_number: Some(2001),
                customer_id: None,
            }),
        )
        .unwrap();
        snapshot
    }

    fn item(instance_id: &str, price: &str) -> CheckItemInput {
        CheckItemInput {
            menu_item_id: "m1".to_string(),
            name: "Burger".to_string(),
            unit_price: d(price),
            quantity: 1,
            modifiers: vec![],
            seat_number: None,
            tax_group_id: None,
            pending: false,
            instance_id: Some(instance_id.to_string()),
        }
    }

    #[test]
    fn offline_flow_tracks_totals_and_rounds() {
        let mut snapshot = open_snapshot();
        assert_eq!(snapshot.check_number, 2001);

        apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::AddItems {
                check_id: "local-1".to_string(),
                items: vec![item("i1", "10.00"), item("i2", "5.00")],
            }),
        )
        .unwrap();
        assert_eq!(snapshot.total, d("15.00"));

        apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::SendCheck {
                check_id: "local-1".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(snapshot.rounds.len(), 1);
        assert!(snapshot.items.iter().all(|i| i.sent));

        apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::RecordTender {
                check_id: "local-1".to_string(),
                tender_id: "CASH".to_string(),
                amount: d("15.00"),
            }),
        )
        .unwrap();
        apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::CloseCheck {
                check_id: "local-1".to_string(),
            }),
        )
        .unwrap();
        assert!(snapshot.is_closed());
    }

    #[test]
    fn offline_enforces_the_sent_boundary() {
        let mut snapshot = open_snapshot();
        apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::AddItems {
                check_id: "local-1".to_string(),
                items: vec![item("i1", "10.00")],
            }),
        )
        .unwrap();
        apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::SendCheck {
                check_id: "local-1".to_string(),
            }),
        )
        .unwrap();

        let err = apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::VoidItem {
                check_id: "local-1".to_string(),
                instance_id: "i1".to_string(),
                reason: None,
                authorizer_id: None,
                authorizer_name: None,
            }),
        )
        .unwrap_err();
        assert!(matches!(err, TerminalError::Rejected(_)));
    }

    #[test]
    fn card_operations_are_refused_offline() {
        let mut snapshot = open_snapshot();
        let err = apply_command(
            &mut snapshot,
            &cmd(CheckCommandPayload::RecordAuthorization {
                check_id: "local-1".to_string(),
                tender_id: "VISA".to_string(),
                amount: d("10.00"),
                gateway_txn_id: "txn".to_string(),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, TerminalError::Rejected(_)));
    }
}
