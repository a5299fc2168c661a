//! Shared types for the check command pipeline

use crate::lock::LockHolder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::snapshot::CheckStatus;

// ============================================================================
// Order Type
// ============================================================================

/// How the order is fulfilled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    DineIn,
    TakeOut,
    Delivery,
    Pickup,
}

// ============================================================================
// Item Types
// ============================================================================

/// Item lifecycle status
///
/// `Pending` items carry provisional modifiers and must be finalized or
/// voided before the check can be sent or paid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    #[default]
    Active,
    Voided,
}

/// A modifier attached to an item (ordered list, order is significant
/// for kitchen display)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemModifier {
    pub name: String,
    /// Price adjustment applied per unit (may be negative)
    pub price_delta: Decimal,
}

/// Item input - for adding items to a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckItemInput {
    pub menu_item_id: String,
    /// Name snapshot (menu may change after the fact)
    pub name: String,
    /// Base unit price before modifiers
    pub unit_price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub modifiers: Vec<ItemModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<i32>,
    /// Tax group resolved to a rate at add time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_group_id: Option<String>,
    /// Add as pending (fire-and-finalize ordering)
    #[serde(default)]
    pub pending: bool,
    /// Client-generated instance id. Terminals set this so offline
    /// references to the item survive replay; the server generates one
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Item snapshot - complete state recorded in events and snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckItemSnapshot {
    /// Instance ID (unique within the check)
    pub instance_id: String,
    pub menu_item_id: String,
    pub name: String,
    /// Base unit price before modifiers
    pub unit_price: Decimal,
    pub quantity: i32,
    pub modifiers: Vec<ItemModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<i32>,
    /// Add-on tax rate in percent (e.g. 8 for 8%)
    pub tax_rate: Decimal,
    pub item_status: ItemStatus,
    /// Set once the item is included in a send round; irreversible
    #[serde(default)]
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub void_reason: Option<String>,
}

impl CheckItemSnapshot {
    /// Whether the item counts toward totals
    pub fn is_active(&self) -> bool {
        self.item_status == ItemStatus::Active
    }

    pub fn is_voided(&self) -> bool {
        self.item_status == ItemStatus::Voided
    }

    pub fn is_pending(&self) -> bool {
        self.item_status == ItemStatus::Pending
    }
}

/// Item field changes (from ModifyItem command)
///
/// `None` means no change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ItemChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Vec<ItemModifier>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<i32>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.unit_price.is_none()
            && self.quantity.is_none()
            && self.modifiers.is_none()
            && self.seat_number.is_none()
    }
}

// ============================================================================
// Round Types
// ============================================================================

/// One item as included in a send round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundItem {
    pub instance_id: String,
    pub name: String,
    pub quantity: i32,
    pub modifiers: Vec<ItemModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<i32>,
}

/// The set of items that crossed into kitchen routing in one send
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    pub round_number: u32,
    pub sent_at: i64,
    pub items: Vec<RoundItem>,
}

// ============================================================================
// Payment Types
// ============================================================================

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Authorized,
    Captured,
    Voided,
    Refunded,
}

/// Payment record in a snapshot
///
/// `amount` is the base amount applied against the check balance. `tip`
/// is added at capture time and rides on top of the captured value; it
/// never counts toward the check total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub tender_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub tip: Decimal,
    pub status: PaymentStatus,
    /// Gateway session join key (absent for cash-style tenders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_txn_id: Option<String>,
    /// Accumulated refunds against this payment
    #[serde(default)]
    pub refunded_amount: Decimal,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PaymentRecord {
    /// Base amount still applied against the check balance
    pub fn applied_amount(&self) -> Decimal {
        match self.status {
            PaymentStatus::Captured | PaymentStatus::Refunded => {
                self.amount - self.refunded_amount
            }
            PaymentStatus::Authorized | PaymentStatus::Voided => Decimal::ZERO,
        }
    }

    /// Gross captured value (base + tip) still refundable
    pub fn refundable_amount(&self) -> Decimal {
        match self.status {
            PaymentStatus::Captured => self.amount + self.tip - self.refunded_amount,
            _ => Decimal::ZERO,
        }
    }
}

/// Payment summary line for a closed check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSummaryItem {
    pub tender_id: String,
    pub amount: Decimal,
}

// ============================================================================
// Command Response
// ============================================================================

/// Operation-specific response detail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseDetail {
    /// Result of a send operation. A re-send with nothing new to fire
    /// reports zero items and no round number.
    RoundSent {
        #[serde(skip_serializing_if = "Option::is_none")]
        round_number: Option<u32>,
        item_count: usize,
    },
    /// Result of cancel-transaction: how many unsent items were voided
    /// and how many sent items remain for normal handling.
    TransactionCancelled {
        voided_count: usize,
        remaining_active: usize,
    },
}

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Check the command applied to (server-assigned for OpenCheck)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,
    /// Operation-specific detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ResponseDetail>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, check_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            check_id,
            detail: None,
            error: None,
        }
    }

    pub fn with_detail(mut self, detail: ResponseDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            check_id: None,
            detail: None,
            error: Some(error),
        }
    }

    /// Response for a command that was already processed (idempotent
    /// replay). Carries the check id recorded for the original
    /// application so a reconciler can still remap placeholder ids
    /// after a lost acknowledgement.
    pub fn duplicate(command_id: String, check_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            check_id,
            detail: None,
            error: None,
        }
    }
}

// ============================================================================
// Command Errors
// ============================================================================

/// Structured command error
///
/// Conflicts carry the check's current status and/or the holding lock
/// identity so callers can decide retry vs. abandon without a second
/// round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
    /// Current check status for state conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<CheckStatus>,
    /// Holder identity for lock conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<LockHolder>,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            current_status: None,
            holder: None,
        }
    }

    pub fn with_status(mut self, status: CheckStatus) -> Self {
        self.current_status = Some(status);
        self
    }

    pub fn with_holder(mut self, holder: LockHolder) -> Self {
        self.holder = Some(holder);
        self
    }
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    // Conflicts
    CheckNotFound,
    CheckAlreadyClosed,
    CheckAlreadyVoided,
    ItemNotFound,
    ItemAlreadyVoided,
    ItemAlreadySent,
    ApprovalRequired,
    PendingItemsRemain,
    SentItemsRemain,
    BalanceOutstanding,
    PaymentNotFound,
    PaymentStateConflict,
    LockHeld,
    PaymentInFlight,
    DuplicateCommand,

    // Validation
    ValidationFailed,
    InvalidAmount,
    InvalidOperation,

    // System (storage classification)
    InternalError,
    SystemBusy,
    StorageFull,
    StorageCorrupted,
    OutOfMemory,
}

impl CommandErrorCode {
    /// Whether a replayed offline mutation hitting this conflict is moot:
    /// the state it wanted to produce (or destroy) is already settled, so
    /// the entry is dropped instead of retried.
    pub fn is_moot(&self) -> bool {
        matches!(
            self,
            CommandErrorCode::CheckAlreadyClosed
                | CommandErrorCode::CheckAlreadyVoided
                | CommandErrorCode::ItemNotFound
                | CommandErrorCode::ItemAlreadyVoided
        )
    }
}
