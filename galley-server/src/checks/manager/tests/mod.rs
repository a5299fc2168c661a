use super::*;
use crate::checks::storage::CheckStorage;
use crate::services::tax::{TaxGroup, TaxTable};
use shared::check::{
    CheckItemInput, CommandErrorCode, ItemChanges, OrderType, PaymentStatus,
};
use std::time::Duration;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn create_test_manager() -> CheckManager {
    let storage = CheckStorage::open_in_memory().unwrap();
    let locks = Arc::new(LockManager::new(Duration::from_secs(60)));
    let tax = Arc::new(TaxTable::new(
        vec![TaxGroup {
            id: "food".to_string(),
            name: "Prepared food".to_string(),
            rate: d("8"),
        }],
        Decimal::ZERO,
    ));
    CheckManager::with_storage_and_tax(storage, locks, tax)
}

fn cmd(workstation: &str, payload: CheckCommandPayload) -> CheckCommand {
    CheckCommand::new(workstation, "emp-1", "Test Operator", payload)
}

fn open_check(manager: &CheckManager, workstation: &str) -> String {
    let response = manager.execute_command(cmd(
        workstation,
        CheckCommandPayload::OpenCheck {
            rvc_id: "rvc-1".to_string(),
            order_type: OrderType::DineIn,
            check_number: None,
            customer_id: None,
        },
    ));
    assert!(response.success, "open failed: {:?}", response.error);
    response.check_id.unwrap()
}

fn taxed_item(name: &str, price: &str, quantity: i32) -> CheckItemInput {
    CheckItemInput {
        menu_item_id: format!("menu-{name}"),
        name: name.to_string(),
        unit_price: d(price),
        quantity,
        modifiers: vec![],
        seat_number: None,
        tax_group_id: Some("food".to_string()),
        pending: false,
        instance_id: None,
    }
}

fn add_items(manager: &CheckManager, workstation: &str, check_id: &str, items: Vec<CheckItemInput>) {
    let response = manager.execute_command(cmd(
        workstation,
        CheckCommandPayload::AddItems {
            check_id: check_id.to_string(),
            items,
        },
    ));
    assert!(response.success, "add_items failed: {:?}", response.error);
}

fn item_ids(manager: &CheckManager, check_id: &str) -> Vec<String> {
    manager
        .get_snapshot(check_id)
        .unwrap()
        .unwrap()
        .items
        .iter()
        .map(|i| i.instance_id.clone())
        .collect()
}

fn send(manager: &CheckManager, workstation: &str, check_id: &str) -> CommandResponse {
    manager.execute_command(cmd(
        workstation,
        CheckCommandPayload::SendCheck {
            check_id: check_id.to_string(),
        },
    ))
}

fn tender(
    manager: &CheckManager,
    workstation: &str,
    check_id: &str,
    amount: &str,
) -> CommandResponse {
    manager.execute_command(cmd(
        workstation,
        CheckCommandPayload::RecordTender {
            check_id: check_id.to_string(),
            tender_id: "CASH".to_string(),
            amount: d(amount),
        },
    ))
}

fn close(manager: &CheckManager, workstation: &str, check_id: &str) -> CommandResponse {
    manager.execute_command(cmd(
        workstation,
        CheckCommandPayload::CloseCheck {
            check_id: check_id.to_string(),
        },
    ))
}

fn error_code(response: &CommandResponse) -> CommandErrorCode {
    response.error.as_ref().expect("expected an error").code
}

mod test_boundary;
mod test_flows;
