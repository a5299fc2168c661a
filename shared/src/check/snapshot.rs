//! Check snapshot - computed state from the event stream
//!
//! The snapshot includes a `state_checksum` field for drift detection.
//! A terminal replica compares its locally computed checksum with the
//! server's to detect divergence and trigger a full sync.

use super::types::{CheckItemSnapshot, OrderType, PaymentRecord, PaymentStatus, RoundRecord};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    #[default]
    Open,
    Closed,
    Voided,
}

/// Check snapshot - computed from the event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckSnapshot {
    /// Check ID (assigned by the server; the only internal join key)
    pub check_id: String,
    /// Sequential display number, unique within a revenue center
    pub check_number: i64,
    /// Revenue center
    pub rvc_id: String,
    /// Workstation that opened the check
    pub workstation_id: String,
    /// Owning employee
    pub employee_id: String,
    /// Owner name snapshot
    pub employee_name: String,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub status: CheckStatus,
    pub items: Vec<CheckItemSnapshot>,
    pub payments: Vec<PaymentRecord>,
    /// Send history; one record per round
    pub rounds: Vec<RoundRecord>,
    /// Derived totals - recomputed from active items, never independently
    /// mutated
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    /// Last applied event sequence (for incremental replica updates)
    pub last_sequence: u64,
    /// State checksum for drift detection (hex string)
    #[serde(default)]
    pub state_checksum: String,
}

impl CheckSnapshot {
    /// Create a new empty check
    pub fn new(check_id: String) -> Self {
        let now = crate::util::now_millis();
        let mut snapshot = Self {
            check_id,
            check_number: 0,
            rvc_id: String::new(),
            workstation_id: String::new(),
            employee_id: String::new(),
            employee_name: String::new(),
            order_type: OrderType::default(),
            customer_id: None,
            status: CheckStatus::Open,
            items: Vec::new(),
            payments: Vec::new(),
            rounds: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            closed_at: None,
            last_sequence: 0,
            state_checksum: String::new(),
        };
        snapshot.update_checksum();
        snapshot
    }

    pub fn is_open(&self) -> bool {
        self.status == CheckStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == CheckStatus::Closed
    }

    pub fn is_voided(&self) -> bool {
        self.status == CheckStatus::Voided
    }

    /// Items counting toward totals
    pub fn active_items(&self) -> impl Iterator<Item = &CheckItemSnapshot> {
        self.items.iter().filter(|i| i.is_active())
    }

    /// Number of pending (unfinalized) items
    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_pending()).count()
    }

    /// Whether any item has crossed into kitchen routing
    pub fn has_sent_items(&self) -> bool {
        self.items.iter().any(|i| i.sent && !i.is_voided())
    }

    pub fn find_item(&self, instance_id: &str) -> Option<&CheckItemSnapshot> {
        self.items.iter().find(|i| i.instance_id == instance_id)
    }

    pub fn find_payment(&self, payment_id: &str) -> Option<&PaymentRecord> {
        self.payments.iter().find(|p| p.payment_id == payment_id)
    }

    /// Sum of base amounts applied against the balance (captured minus
    /// refunds; tips excluded)
    pub fn applied_payment_total(&self) -> Decimal {
        self.payments.iter().map(|p| p.applied_amount()).sum()
    }

    /// Remaining balance due
    pub fn remaining_due(&self) -> Decimal {
        (self.total - self.applied_payment_total()).max(Decimal::ZERO)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.applied_payment_total() >= self.total
    }

    /// Whether any payment is authorized but not yet captured or voided
    pub fn has_dangling_authorization(&self) -> bool {
        self.payments
            .iter()
            .any(|p| p.status == PaymentStatus::Authorized)
    }

    /// Compute the state checksum for drift detection
    ///
    /// Hashed fields: item count, total and applied payments in minor
    /// units, last sequence, status discriminant. Returns a 16-character
    /// hex string.
    pub fn compute_checksum(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher as _;

        let mut hasher = DefaultHasher::new();

        self.items.len().hash(&mut hasher);
        decimal_minor_units(self.total).hash(&mut hasher);
        decimal_minor_units(self.applied_payment_total()).hash(&mut hasher);
        self.last_sequence.hash(&mut hasher);
        (self.status as u8).hash(&mut hasher);

        format!("{:016x}", hasher.finish())
    }

    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    /// Returns false when drift is detected
    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}

impl Default for CheckSnapshot {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// A monetary value in minor units (cents), for hashing
fn decimal_minor_units(value: Decimal) -> i64 {
    (value * Decimal::from(100)).round().to_i64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::types::{ItemStatus, PaymentStatus};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(instance_id: &str, status: ItemStatus, sent: bool) -> CheckItemSnapshot {
        CheckItemSnapshot {
            instance_id: instance_id.to_string(),
            menu_item_id: "m1".to_string(),
            name: "Burger".to_string(),
            unit_price: d("10.00"),
            quantity: 1,
            modifiers: vec![],
            seat_number: None,
            tax_rate: d("8"),
            item_status: status,
            sent,
            void_reason: None,
        }
    }

    #[test]
    fn remaining_due_uses_captured_base_amounts() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.total = d("10.80");
        snapshot.payments.push(PaymentRecord {
            payment_id: "p1".to_string(),
            tender_id: "CASH".to_string(),
            amount: d("10.80"),
            tip: d("2.00"),
            status: PaymentStatus::Captured,
            gateway_txn_id: None,
            refunded_amount: Decimal::ZERO,
            created_at: 0,
            updated_at: 0,
        });

        assert_eq!(snapshot.remaining_due(), Decimal::ZERO);
        assert!(snapshot.is_fully_paid());
    }

    #[test]
    fn sent_items_exclude_voided() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.items.push(item("i1", ItemStatus::Voided, true));
        assert!(!snapshot.has_sent_items());

        snapshot.items.push(item("i2", ItemStatus::Active, true));
        assert!(snapshot.has_sent_items());
    }

    #[test]
    fn checksum_changes_with_state() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        let before = snapshot.state_checksum.clone();
        assert!(snapshot.verify_checksum());

        snapshot.items.push(item("i1", ItemStatus::Active, false));
        snapshot.last_sequence = 1;
        assert!(!snapshot.verify_checksum());

        snapshot.update_checksum();
        assert_ne!(before, snapshot.state_checksum);
        assert!(snapshot.verify_checksum());
    }
}
