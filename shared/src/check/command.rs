//! Check commands - requests from terminals to mutate checks
//!
//! Every command carries a client-generated `command_id` which doubles as
//! the idempotency key: a replay after a lost acknowledgement is detected
//! by the backend and answered with a duplicate response instead of being
//! applied twice.

use super::types::{CheckItemInput, ItemChanges, ItemModifier, OrderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to mutate a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckCommand {
    /// Client-generated idempotency key
    pub command_id: String,
    /// Workstation issuing the command (lock scope)
    pub workstation_id: String,
    /// Employee issuing the command (lock scope)
    pub employee_id: String,
    /// Employee name snapshot for audit
    pub employee_name: String,
    /// Client timestamp (Unix milliseconds, may have clock skew)
    pub timestamp: i64,
    pub payload: CheckCommandPayload,
}

impl CheckCommand {
    pub fn new(
        workstation_id: impl Into<String>,
        employee_id: impl Into<String>,
        employee_name: impl Into<String>,
        payload: CheckCommandPayload,
    ) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            workstation_id: workstation_id.into(),
            employee_id: employee_id.into(),
            employee_name: employee_name.into(),
            timestamp: crate::util::now_millis(),
            payload,
        }
    }

    /// The check this command targets, if it targets an existing one
    pub fn check_id(&self) -> Option<&str> {
        self.payload.check_id()
    }
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckCommandPayload {
    /// Open a new check. The server assigns the check id; the check
    /// number comes from the workstation's reserved range when supplied
    /// (offline open) or is allocated server-side when absent.
    OpenCheck {
        rvc_id: String,
        order_type: OrderType,
        #[serde(skip_serializing_if = "Option::is_none")]
        check_number: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        customer_id: Option<String>,
    },

    AddItems {
        check_id: String,
        items: Vec<CheckItemInput>,
    },

    /// Finalize a pending item's modifiers, making it active
    FinalizeItem {
        check_id: String,
        instance_id: String,
        modifiers: Vec<ItemModifier>,
    },

    /// Edit an unsent item. Rejected outright once the item is sent.
    ModifyItem {
        check_id: String,
        instance_id: String,
        changes: ItemChanges,
    },

    VoidItem {
        check_id: String,
        instance_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Manager approval, required when the item has been sent
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_name: Option<String>,
    },

    /// Send all active unsent items to the kitchen as one round
    SendCheck { check_id: String },

    /// Void every unsent item in one batch (cancel-transaction path)
    CancelTransaction { check_id: String },

    /// Record a cash-style tender: captured immediately, no gateway
    /// session. Change due is a terminal-side computation; `amount` is
    /// the portion applied to the check.
    RecordTender {
        check_id: String,
        tender_id: String,
        amount: Decimal,
    },

    /// Record a gateway authorization (issued by the payment
    /// orchestrator after the gateway confirmed)
    RecordAuthorization {
        check_id: String,
        tender_id: String,
        amount: Decimal,
        gateway_txn_id: String,
    },

    /// Capture an authorized payment; the tip is added at capture time
    RecordCapture {
        check_id: String,
        payment_id: String,
        #[serde(default)]
        tip: Decimal,
    },

    /// Void an authorized, uncaptured payment
    RecordPaymentVoid {
        check_id: String,
        payment_id: String,
    },

    /// Refund a captured payment, fully or partially
    RecordRefund {
        check_id: String,
        payment_id: String,
        amount: Decimal,
    },

    /// Close the check; requires a zero balance and no pending items
    CloseCheck { check_id: String },

    /// Void the whole check; only legal while nothing has been sent
    VoidCheck {
        check_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer_name: Option<String>,
    },

    AttachCustomer {
        check_id: String,
        customer_id: String,
    },

    DetachCustomer { check_id: String },
}

impl CheckCommandPayload {
    /// The existing check this payload targets (None for OpenCheck)
    pub fn check_id(&self) -> Option<&str> {
        match self {
            CheckCommandPayload::OpenCheck { .. } => None,
            CheckCommandPayload::AddItems { check_id, .. }
            | CheckCommandPayload::FinalizeItem { check_id, .. }
            | CheckCommandPayload::ModifyItem { check_id, .. }
            | CheckCommandPayload::VoidItem { check_id, .. }
            | CheckCommandPayload::SendCheck { check_id }
            | CheckCommandPayload::CancelTransaction { check_id }
            | CheckCommandPayload::RecordTender { check_id, .. }
            | CheckCommandPayload::RecordAuthorization { check_id, .. }
            | CheckCommandPayload::RecordCapture { check_id, .. }
            | CheckCommandPayload::RecordPaymentVoid { check_id, .. }
            | CheckCommandPayload::RecordRefund { check_id, .. }
            | CheckCommandPayload::CloseCheck { check_id }
            | CheckCommandPayload::VoidCheck { check_id, .. }
            | CheckCommandPayload::AttachCustomer { check_id, .. }
            | CheckCommandPayload::DetachCustomer { check_id } => Some(check_id.as_str()),
        }
    }

    /// Rewrite the targeted check id (sync reconciler id remapping)
    pub fn set_check_id(&mut self, new_id: &str) {
        match self {
            CheckCommandPayload::OpenCheck { .. } => {}
            CheckCommandPayload::AddItems { check_id, .. }
            | CheckCommandPayload::FinalizeItem { check_id, .. }
            | CheckCommandPayload::ModifyItem { check_id, .. }
            | CheckCommandPayload::VoidItem { check_id, .. }
            | CheckCommandPayload::SendCheck { check_id }
            | CheckCommandPayload::CancelTransaction { check_id }
            | CheckCommandPayload::RecordTender { check_id, .. }
            | CheckCommandPayload::RecordAuthorization { check_id, .. }
            | CheckCommandPayload::RecordCapture { check_id, .. }
            | CheckCommandPayload::RecordPaymentVoid { check_id, .. }
            | CheckCommandPayload::RecordRefund { check_id, .. }
            | CheckCommandPayload::CloseCheck { check_id }
            | CheckCommandPayload::VoidCheck { check_id, .. }
            | CheckCommandPayload::AttachCustomer { check_id, .. }
            | CheckCommandPayload::DetachCustomer { check_id } => {
                *check_id = new_id.to_string();
            }
        }
    }
}
