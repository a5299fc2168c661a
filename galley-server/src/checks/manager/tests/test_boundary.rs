//! Boundary tests: illegal transitions fail with structured conflicts

use super::*;

#[test]
fn paying_a_closed_check_conflicts() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    tender(&manager, "ws-1", &check_id, "10.80");
    close(&manager, "ws-1", &check_id);

    let response = tender(&manager, "ws-1", &check_id, "1.00");
    assert!(!response.success);
    let error = response.error.unwrap();
    assert_eq!(error.code, CommandErrorCode::CheckAlreadyClosed);
    assert_eq!(error.current_status, Some(CheckStatus::Closed));
}

#[test]
fn voiding_a_sent_item_requires_approval() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    send(&manager, "ws-1", &check_id);
    let ids = item_ids(&manager, &check_id);

    let unapproved = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::VoidItem {
            check_id: check_id.clone(),
            instance_id: ids[0].clone(),
            reason: Some("86'd".to_string()),
            authorizer_id: None,
            authorizer_name: None,
        },
    ));
    assert_eq!(error_code(&unapproved), CommandErrorCode::ApprovalRequired);

    let approved = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::VoidItem {
            check_id: check_id.clone(),
            instance_id: ids[0].clone(),
            reason: Some("86'd".to_string()),
            authorizer_id: Some("mgr-1".to_string()),
            authorizer_name: Some("Manager".to_string()),
        },
    ));
    assert!(approved.success);

    // double void is a conflict the reconciler treats as moot
    let again = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::VoidItem {
            check_id: check_id.clone(),
            instance_id: ids[0].clone(),
            reason: None,
            authorizer_id: Some("mgr-1".to_string()),
            authorizer_name: None,
        },
    ));
    assert_eq!(error_code(&again), CommandErrorCode::ItemAlreadyVoided);
    assert!(error_code(&again).is_moot());
}

#[test]
fn voiding_a_check_with_sent_items_is_disallowed() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    send(&manager, "ws-1", &check_id);

    let response = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::VoidCheck {
            check_id: check_id.clone(),
            reason: None,
            authorizer_id: None,
            authorizer_name: None,
        },
    ));
    assert_eq!(error_code(&response), CommandErrorCode::SentItemsRemain);
}

#[test]
fn void_check_with_nothing_sent_succeeds() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );

    let response = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::VoidCheck {
            check_id: check_id.clone(),
            reason: Some("opened by mistake".to_string()),
            authorizer_id: None,
            authorizer_name: None,
        },
    ));
    assert!(response.success);
    assert!(manager.get_snapshot(&check_id).unwrap().unwrap().is_voided());
    assert!(manager.get_open_checks().unwrap().is_empty());
}

#[test]
fn close_requires_zero_balance() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );

    let response = close(&manager, "ws-1", &check_id);
    assert_eq!(error_code(&response), CommandErrorCode::BalanceOutstanding);

    tender(&manager, "ws-1", &check_id, "10.80");
    assert!(close(&manager, "ws-1", &check_id).success);
}

#[test]
fn payment_cannot_exceed_remaining_balance() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );

    let response = tender(&manager, "ws-1", &check_id, "15.00");
    assert_eq!(error_code(&response), CommandErrorCode::InvalidAmount);
}

#[test]
fn pending_items_block_send_pay_and_close() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    let mut pending = taxed_item("Steak", "24.00", 1);
    pending.pending = true;
    pending.instance_id = Some("steak-1".to_string());
    add_items(&manager, "ws-1", &check_id, vec![pending]);

    assert_eq!(
        error_code(&send(&manager, "ws-1", &check_id)),
        CommandErrorCode::PendingItemsRemain
    );
    assert_eq!(
        error_code(&tender(&manager, "ws-1", &check_id, "1.00")),
        CommandErrorCode::PendingItemsRemain
    );
    assert_eq!(
        error_code(&close(&manager, "ws-1", &check_id)),
        CommandErrorCode::PendingItemsRemain
    );

    // finalize with the chosen temperature modifier, then everything flows
    let response = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::FinalizeItem {
            check_id: check_id.clone(),
            instance_id: "steak-1".to_string(),
            modifiers: vec![shared::check::ItemModifier {
                name: "Medium rare".to_string(),
                price_delta: Decimal::ZERO,
            }],
        },
    ));
    assert!(response.success);
    assert!(send(&manager, "ws-1", &check_id).success);
}

#[test]
fn modify_after_send_is_rejected_outright() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    send(&manager, "ws-1", &check_id);
    let ids = item_ids(&manager, &check_id);

    let response = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::ModifyItem {
            check_id: check_id.clone(),
            instance_id: ids[0].clone(),
            changes: ItemChanges {
                unit_price: Some(d("1.00")),
                ..ItemChanges::default()
            },
        },
    ));
    assert_eq!(error_code(&response), CommandErrorCode::ItemAlreadySent);
}

#[test]
fn payment_state_machine_rejects_bad_transitions() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    assert!(tender(&manager, "ws-1", &check_id, "10.80").success);
    let payment_id = manager
        .get_snapshot(&check_id)
        .unwrap()
        .unwrap()
        .payments[0]
        .payment_id
        .clone();

    // captured payments cannot be voided, only refunded
    let void = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::RecordPaymentVoid {
            check_id: check_id.clone(),
            payment_id: payment_id.clone(),
        },
    ));
    assert_eq!(error_code(&void), CommandErrorCode::PaymentStateConflict);

    // captured payments cannot be captured twice
    let recapture = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::RecordCapture {
            check_id: check_id.clone(),
            payment_id: payment_id.clone(),
            tip: Decimal::ZERO,
        },
    ));
    assert_eq!(error_code(&recapture), CommandErrorCode::PaymentStateConflict);

    // refunds are bounded by the captured value
    let over_refund = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::RecordRefund {
            check_id: check_id.clone(),
            payment_id: payment_id.clone(),
            amount: d("11.00"),
        },
    ));
    assert_eq!(error_code(&over_refund), CommandErrorCode::InvalidAmount);
}

#[test]
fn payment_hold_blocks_other_mutations() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );

    let _hold = manager
        .locks()
        .begin_payment_hold(&check_id, "payment-req-1")
        .unwrap();

    // a different actor is shut out while the payment is in flight
    let blocked = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::AddItems {
            check_id: check_id.clone(),
            items: vec![taxed_item("Fries", "4.00", 1)],
        },
    ));
    assert_eq!(error_code(&blocked), CommandErrorCode::PaymentInFlight);

    // the payment attempt itself passes: its command id owns the hold
    let mut record = cmd(
        "ws-1",
        CheckCommandPayload::RecordTender {
            check_id: check_id.clone(),
            tender_id: "CASH".to_string(),
            amount: d("10.80"),
        },
    );
    record.command_id = "payment-req-1".to_string();
    assert!(manager.execute_command(record).success);
}
