//! End-to-end flows: send rounds, pay, close, locks, gateway payments

use super::*;
use shared::check::ResponseDetail;
use shared::check::money;

#[test]
fn full_dine_in_flow() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );

    // first send fires the one active item
    let first = send(&manager, "ws-1", &check_id);
    assert!(first.success);
    assert_eq!(
        first.detail,
        Some(ResponseDetail::RoundSent {
            round_number: Some(1),
            item_count: 1,
        })
    );

    // second send has nothing new: zero items, no round, no ticket
    let second = send(&manager, "ws-1", &check_id);
    assert!(second.success);
    assert_eq!(
        second.detail,
        Some(ResponseDetail::RoundSent {
            round_number: None,
            item_count: 0,
        })
    );
    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    assert_eq!(snapshot.rounds.len(), 1);

    // pay exactly and close
    assert!(tender(&manager, "ws-1", &check_id, "10.80").success);
    assert!(close(&manager, "ws-1", &check_id).success);

    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    assert!(snapshot.is_closed());
    assert!(snapshot.closed_at.is_some());
    assert!(manager.get_open_checks().unwrap().is_empty());
}

#[test]
fn second_round_contains_only_new_items() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    send(&manager, "ws-1", &check_id);

    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Pie", "6.00", 1)],
    );
    let response = send(&manager, "ws-1", &check_id);
    assert_eq!(
        response.detail,
        Some(ResponseDetail::RoundSent {
            round_number: Some(2),
            item_count: 1,
        })
    );

    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    assert_eq!(snapshot.rounds.len(), 2);
    assert_eq!(snapshot.rounds[1].items[0].name, "Pie");
}

#[test]
fn cash_change_stays_terminal_side() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );

    // the backend records only the applied amount; the terminal computes
    // change from what the guest handed over
    let handed_over = d("15.00");
    let due = manager.get_snapshot(&check_id).unwrap().unwrap().total;
    assert_eq!(money::change_due(handed_over, due), d("4.20"));

    assert!(tender(&manager, "ws-1", &check_id, "10.80").success);
    assert!(close(&manager, "ws-1", &check_id).success);
}

#[test]
fn gateway_authorize_capture_with_tip() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );

    let auth = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::RecordAuthorization {
            check_id: check_id.clone(),
            tender_id: "VISA".to_string(),
            amount: d("10.80"),
            gateway_txn_id: "txn-123".to_string(),
        },
    ));
    assert!(auth.success);

    // authorized but uncaptured: balance still due, close blocked
    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    assert_eq!(snapshot.remaining_due(), d("10.80"));
    assert_eq!(error_code(&close(&manager, "ws-1", &check_id)), CommandErrorCode::PaymentStateConflict);

    let payment_id = snapshot.payments[0].payment_id.clone();
    let capture = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::RecordCapture {
            check_id: check_id.clone(),
            payment_id: payment_id.clone(),
            tip: d("2.00"),
        },
    ));
    assert!(capture.success);

    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    let payment = snapshot.find_payment(&payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
    assert_eq!(payment.amount, d("10.80"));
    assert_eq!(payment.tip, d("2.00"));
    // the tip rides on top: balance is clear without over-capture
    assert_eq!(snapshot.remaining_due(), Decimal::ZERO);

    assert!(close(&manager, "ws-1", &check_id).success);
}

#[test]
fn partial_then_full_refund() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    assert!(tender(&manager, "ws-1", &check_id, "10.80").success);
    assert!(close(&manager, "ws-1", &check_id).success);

    let payment_id = manager
        .get_snapshot(&check_id)
        .unwrap()
        .unwrap()
        .payments[0]
        .payment_id
        .clone();

    let refund = |amount: &str| {
        manager.execute_command(cmd(
            "ws-1",
            CheckCommandPayload::RecordRefund {
                check_id: check_id.clone(),
                payment_id: payment_id.clone(),
                amount: d(amount),
            },
        ))
    };

    assert!(refund("4.00").success);
    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    let payment = snapshot.find_payment(&payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
    assert_eq!(payment.refunded_amount, d("4.00"));

    assert!(refund("6.80").success);
    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    let payment = snapshot.find_payment(&payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
}

#[test]
fn cancel_transaction_reports_counts() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-1");
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
    send(&manager, "ws-1", &check_id);
    add_items(
        &manager,
        "ws-1",
        &check_id,
        vec![
            taxed_item("Fries", "4.00", 1),
            taxed_item("Pie", "6.00", 1),
        ],
    );

    let response = manager.execute_command(cmd(
        "ws-1",
        CheckCommandPayload::CancelTransaction {
            check_id: check_id.clone(),
        },
    ));
    assert!(response.success);
    assert_eq!(
        response.detail,
        Some(ResponseDetail::TransactionCancelled {
            voided_count: 2,
            remaining_active: 1,
        })
    );

    // the sent burger still needs normal handling
    let snapshot = manager.get_snapshot(&check_id).unwrap().unwrap();
    assert_eq!(snapshot.active_items().count(), 1);
    assert_eq!(snapshot.total, d("10.80"));
}

#[test]
fn lock_conflict_surfaces_holder_identity() {
    let manager = create_test_manager();
    let check_id = open_check(&manager, "ws-a");

    // ws-a holds the editing lock from the open; ws-b is refused
    let response = manager.execute_command(cmd(
        "ws-b",
        CheckCommandPayload::AddItems {
            check_id: check_id.clone(),
            items: vec![taxed_item("Burger", "10.00", 1)],
        },
    ));
    assert!(!response.success);
    let error = response.error.unwrap();
    assert_eq!(error.code, CommandErrorCode::LockHeld);
    assert_eq!(error.holder.unwrap().workstation_id, "ws-a");

    // once ws-a lets go, ws-b proceeds
    manager.locks().release(&check_id, "ws-a");
    add_items(
        &manager,
        "ws-b",
        &check_id,
        vec![taxed_item("Burger", "10.00", 1)],
    );
}
