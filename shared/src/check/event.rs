//! Check events - immutable facts recorded after command processing

use super::types::{
    CheckItemSnapshot, ItemChanges, ItemModifier, OrderType, PaymentSummaryItem, RoundItem,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Check event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number - the AUTHORITATIVE ordering mechanism for
    /// state evolution and replica catch-up
    pub sequence: u64,
    /// Check this event belongs to
    pub check_id: String,
    /// Server timestamp (Unix milliseconds) - always set by the server
    pub timestamp: i64,
    /// Client timestamp preserved from the command, for audit; may differ
    /// from server time due to clock skew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Workstation that triggered this event
    pub workstation_id: String,
    /// Employee that triggered this event
    pub employee_id: String,
    /// Employee name (snapshot for audit)
    pub employee_name: String,
    /// Command that produced this event (audit tracing)
    pub command_id: String,
    pub event_type: CheckEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckEventType {
    // Lifecycle
    CheckOpened,
    CheckClosed,
    CheckVoided,

    // Items
    ItemsAdded,
    ItemFinalized,
    ItemModified,
    ItemVoided,

    // Kitchen
    RoundSent,

    // Payments
    PaymentAuthorized,
    PaymentCaptured,
    PaymentVoided,
    PaymentRefunded,

    // Customer
    CustomerAttached,
    CustomerDetached,
}

impl std::fmt::Display for CheckEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckEventType::CheckOpened => "CHECK_OPENED",
            CheckEventType::CheckClosed => "CHECK_CLOSED",
            CheckEventType::CheckVoided => "CHECK_VOIDED",
            CheckEventType::ItemsAdded => "ITEMS_ADDED",
            CheckEventType::ItemFinalized => "ITEM_FINALIZED",
            CheckEventType::ItemModified => "ITEM_MODIFIED",
            CheckEventType::ItemVoided => "ITEM_VOIDED",
            CheckEventType::RoundSent => "ROUND_SENT",
            CheckEventType::PaymentAuthorized => "PAYMENT_AUTHORIZED",
            CheckEventType::PaymentCaptured => "PAYMENT_CAPTURED",
            CheckEventType::PaymentVoided => "PAYMENT_VOIDED",
            CheckEventType::PaymentRefunded => "PAYMENT_REFUNDED",
            CheckEventType::CustomerAttached => "CUSTOMER_ATTACHED",
            CheckEventType::CustomerDetached => "CUSTOMER_DETACHED",
        };
        write!(f, "{}", s)
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Lifecycle ==========
    CheckOpened {
        check_number: i64,
        rvc_id: String,
        order_type: OrderType,
        #[serde(skip_serializing_if = "Option::is_none")]
        customer_id: Option<String>,
    },

    CheckClosed {
        total: Decimal,
        payment_summary: Vec<PaymentSummaryItem>,
    },

    CheckVoided {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_name: Option<String>,
    },

    // ========== Items ==========
    ItemsAdded {
        /// Complete snapshots of the added items
        items: Vec<CheckItemSnapshot>,
    },

    ItemFinalized {
        instance_id: String,
        modifiers: Vec<ItemModifier>,
    },

    ItemModified {
        instance_id: String,
        changes: Box<ItemChanges>,
        /// Previous values for audit comparison
        previous: Box<ItemChanges>,
    },

    ItemVoided {
        instance_id: String,
        item_name: String,
        /// Whether the item had already been sent (approval path)
        was_sent: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_name: Option<String>,
    },

    // ========== Kitchen ==========
    /// Payload is self-contained so ticket routing never needs a
    /// snapshot read.
    RoundSent {
        round_number: u32,
        check_number: i64,
        order_type: OrderType,
        items: Vec<RoundItem>,
    },

    // ========== Payments ==========
    PaymentAuthorized {
        payment_id: String,
        tender_id: String,
        amount: Decimal,
        gateway_txn_id: String,
    },

    /// Capture of an existing authorization (`tender_id` None) or a
    /// direct cash-style capture (`tender_id` set, payment created here)
    PaymentCaptured {
        payment_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tender_id: Option<String>,
        amount: Decimal,
        #[serde(default)]
        tip: Decimal,
    },

    PaymentVoided { payment_id: String },

    PaymentRefunded {
        payment_id: String,
        amount: Decimal,
    },

    // ========== Customer ==========
    CustomerAttached { customer_id: String },

    CustomerDetached {},
}

impl CheckEvent {
    /// Create a new event. The server timestamp is always set here; the
    /// client timestamp is preserved from the originating command.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        check_id: String,
        workstation_id: String,
        employee_id: String,
        employee_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: CheckEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            check_id,
            timestamp: crate::util::now_millis(),
            client_timestamp,
            workstation_id,
            employee_id,
            employee_name,
            command_id,
            event_type,
            payload,
        }
    }
}
