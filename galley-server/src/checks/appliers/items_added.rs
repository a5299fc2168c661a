//! ItemsAdded event applier

use crate::checks::traits::EventApplier;
use shared::check::money;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload};

pub struct ItemsAddedApplier;

impl EventApplier for ItemsAddedApplier {
    fn apply(&self, snapshot: &mut CheckSnapshot, event: &CheckEvent) {
        if let EventPayload::ItemsAdded { items } = &event.payload {
            snapshot.items.extend(items.iter().cloned());
            money::recalculate_totals(snapshot);
            super::finish(snapshot, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::check::{CheckEventType, CheckItemSnapshot, ItemStatus};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn totals_follow_added_items() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        let event = CheckEvent::new(
            1,
            "c1".to_string(),
            "ws-1".to_string(),
            "emp-1".to_string(),
            "Test".to_string(),
            "cmd-1".to_string(),
            None,
            CheckEventType::ItemsAdded,
            EventPayload::ItemsAdded {
                items: vec![CheckItemSnapshot {
                    instance_id: "i1".to_string(),
                    menu_item_id: "m1".to_string(),
                    name: "Burger".to_string(),
                    unit_price: d("10.00"),
                    quantity: 1,
                    modifiers: vec![],
                    seat_number: None,
                    tax_rate: d("8"),
                    item_status: ItemStatus::Active,
                    sent: false,
                    void_reason: None,
                }],
            },
        );

        ItemsAddedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.subtotal, d("10.00"));
        assert_eq!(snapshot.tax, d("0.80"));
        assert_eq!(snapshot.total, d("10.80"));
        assert_eq!(snapshot.last_sequence, 1);
        assert!(snapshot.verify_checksum());
    }
}
