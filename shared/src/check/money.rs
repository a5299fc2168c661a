//! Money arithmetic for checks
//!
//! All monetary values are `rust_decimal::Decimal` with 2-place currency
//! semantics. Every externally visible amount is rounded to the minor
//! unit (half away from zero) at the point it is produced, so repeated
//! percentage operations cannot accumulate drift.
//!
//! Totals are always recomputed from active items; they are never
//! independently writable, which means a partial update can never desync
//! totals from items.

use super::snapshot::CheckSnapshot;
use super::types::{CheckItemInput, CheckItemSnapshot, ItemChanges};
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency minor-unit places
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price per item
const MAX_UNIT_PRICE: i64 = 1_000_000;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 999;
/// Maximum allowed payment amount
const MAX_PAYMENT_AMOUNT: i64 = 1_000_000;

/// Validation failure with a field-level message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MoneyValidationError(pub String);

/// Round to the currency minor unit, half away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate a CheckItemInput before processing
pub fn validate_item(item: &CheckItemInput) -> Result<(), MoneyValidationError> {
    if item.unit_price < Decimal::ZERO {
        return Err(MoneyValidationError(format!(
            "unit_price must be non-negative, got {}",
            item.unit_price
        )));
    }
    if item.unit_price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(MoneyValidationError(format!(
            "unit_price exceeds maximum allowed ({}), got {}",
            MAX_UNIT_PRICE, item.unit_price
        )));
    }
    if item.quantity <= 0 {
        return Err(MoneyValidationError(format!(
            "quantity must be positive, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(MoneyValidationError(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }
    for modifier in &item.modifiers {
        if modifier.price_delta.abs() > Decimal::from(MAX_UNIT_PRICE) {
            return Err(MoneyValidationError(format!(
                "modifier price_delta exceeds maximum allowed, got {}",
                modifier.price_delta
            )));
        }
    }
    Ok(())
}

/// Validate item changes (from ModifyItem)
pub fn validate_item_changes(changes: &ItemChanges) -> Result<(), MoneyValidationError> {
    if let Some(price) = changes.unit_price {
        if price < Decimal::ZERO || price > Decimal::from(MAX_UNIT_PRICE) {
            return Err(MoneyValidationError(format!(
                "unit_price out of range, got {}",
                price
            )));
        }
    }
    if let Some(quantity) = changes.quantity
        && !(1..=MAX_QUANTITY).contains(&quantity)
    {
        return Err(MoneyValidationError(format!(
            "quantity out of range, got {}",
            quantity
        )));
    }
    Ok(())
}

/// Validate a payment amount
pub fn validate_amount(amount: Decimal) -> Result<(), MoneyValidationError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyValidationError(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if amount > Decimal::from(MAX_PAYMENT_AMOUNT) {
        return Err(MoneyValidationError(format!(
            "amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, amount
        )));
    }
    Ok(())
}

/// Effective per-unit price: base price plus modifier deltas
pub fn effective_unit_price(item: &CheckItemSnapshot) -> Decimal {
    let delta: Decimal = item.modifiers.iter().map(|m| m.price_delta).sum();
    round_money(item.unit_price + delta)
}

/// Extended line total for one item
pub fn line_total(item: &CheckItemSnapshot) -> Decimal {
    round_money(effective_unit_price(item) * Decimal::from(item.quantity))
}

/// Add-on tax for one item, rounded per line
pub fn line_tax(item: &CheckItemSnapshot) -> Decimal {
    round_money(line_total(item) * item.tax_rate / Decimal::from(100))
}

/// Recompute subtotal/tax/total from active (non-voided) items.
///
/// Deterministic: per-line rounding, then summation, matching the tax
/// calculator contract (2 decimals, no side effects).
pub fn recalculate_totals(snapshot: &mut CheckSnapshot) {
    let mut subtotal = Decimal::ZERO;
    let mut tax = Decimal::ZERO;
    for item in snapshot.items.iter().filter(|i| i.is_active()) {
        subtotal += line_total(item);
        tax += line_tax(item);
    }
    snapshot.subtotal = round_money(subtotal);
    snapshot.tax = round_money(tax);
    snapshot.total = round_money(subtotal + tax);
}

/// Change due for a cash tender, computed terminal-side and never stored
/// by the backend
pub fn change_due(tendered: Decimal, amount: Decimal) -> Decimal {
    round_money((tendered - amount).max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::types::{ItemModifier, ItemStatus};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(price: &str, quantity: i32, tax_rate: &str) -> CheckItemSnapshot {
        CheckItemSnapshot {
            instance_id: "i1".to_string(),
            menu_item_id: "m1".to_string(),
            name: "Burger".to_string(),
            unit_price: d(price),
            quantity,
            modifiers: vec![],
            seat_number: None,
            tax_rate: d(tax_rate),
            item_status: ItemStatus::Active,
            sent: false,
            void_reason: None,
        }
    }

    #[test]
    fn ten_dollars_at_eight_percent() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.items.push(item("10.00", 1, "8"));
        recalculate_totals(&mut snapshot);

        assert_eq!(snapshot.subtotal, d("10.00"));
        assert_eq!(snapshot.tax, d("0.80"));
        assert_eq!(snapshot.total, d("10.80"));
    }

    #[test]
    fn modifiers_adjust_unit_price() {
        let mut it = item("10.00", 2, "0");
        it.modifiers.push(ItemModifier {
            name: "Extra cheese".to_string(),
            price_delta: d("1.50"),
        });
        it.modifiers.push(ItemModifier {
            name: "No onion".to_string(),
            price_delta: Decimal::ZERO,
        });

        assert_eq!(effective_unit_price(&it), d("11.50"));
        assert_eq!(line_total(&it), d("23.00"));
    }

    #[test]
    fn voided_items_do_not_count() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.items.push(item("10.00", 1, "8"));
        let mut voided = item("99.00", 1, "8");
        voided.item_status = ItemStatus::Voided;
        snapshot.items.push(voided);
        recalculate_totals(&mut snapshot);

        assert_eq!(snapshot.total, d("10.80"));
    }

    #[test]
    fn per_line_rounding_is_stable() {
        // 3 x 0.35 at 7%: line 1.05, tax 0.07 - no accumulation drift
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.items.push(item("0.35", 3, "7"));
        recalculate_totals(&mut snapshot);

        assert_eq!(snapshot.subtotal, d("1.05"));
        assert_eq!(snapshot.tax, d("0.07"));
        assert_eq!(snapshot.total, d("1.12"));
    }

    #[test]
    fn change_is_never_negative() {
        assert_eq!(change_due(d("15.00"), d("10.80")), d("4.20"));
        assert_eq!(change_due(d("10.00"), d("10.80")), Decimal::ZERO);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut input = CheckItemInput {
            menu_item_id: "m1".to_string(),
            name: "Burger".to_string(),
            unit_price: d("10.00"),
            quantity: 0,
            modifiers: vec![],
            seat_number: None,
            tax_group_id: None,
            pending: false,
            instance_id: None,
        };
        assert!(validate_item(&input).is_err());

        input.quantity = 1;
        input.unit_price = d("-1.00");
        assert!(validate_item(&input).is_err());

        input.unit_price = d("10.00");
        assert!(validate_item(&input).is_ok());

        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(d("10.80")).is_ok());
    }
}
