//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles one
//! specific event type. Appliers are PURE functions from (snapshot,
//! event) to snapshot; every piece of state they need rides in the
//! event payload.

use enum_dispatch::enum_dispatch;

use crate::checks::traits::EventApplier;
use shared::check::{CheckEvent, CheckSnapshot, EventPayload};

mod check_closed;
mod check_opened;
mod check_voided;
mod customer;
mod item_finalized;
mod item_modified;
mod item_voided;
mod items_added;
mod payment_authorized;
mod payment_captured;
mod payment_refunded;
mod payment_voided;
mod round_sent;

pub use check_closed::CheckClosedApplier;
pub use check_opened::CheckOpenedApplier;
pub use check_voided::CheckVoidedApplier;
pub use customer::{CustomerAttachedApplier, CustomerDetachedApplier};
pub use item_finalized::ItemFinalizedApplier;
pub use item_modified::ItemModifiedApplier;
pub use item_voided::ItemVoidedApplier;
pub use items_added::ItemsAddedApplier;
pub use payment_authorized::PaymentAuthorizedApplier;
pub use payment_captured::PaymentCapturedApplier;
pub use payment_refunded::PaymentRefundedApplier;
pub use payment_voided::PaymentVoidedApplier;
pub use round_sent::RoundSentApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    CheckOpened(CheckOpenedApplier),
    ItemsAdded(ItemsAddedApplier),
    ItemFinalized(ItemFinalizedApplier),
    ItemModified(ItemModifiedApplier),
    ItemVoided(ItemVoidedApplier),
    RoundSent(RoundSentApplier),
    PaymentAuthorized(PaymentAuthorizedApplier),
    PaymentCaptured(PaymentCapturedApplier),
    PaymentVoided(PaymentVoidedApplier),
    PaymentRefunded(PaymentRefundedApplier),
    CheckClosed(CheckClosedApplier),
    CheckVoided(CheckVoidedApplier),
    CustomerAttached(CustomerAttachedApplier),
    CustomerDetached(CustomerDetachedApplier),
}

/// Convert a CheckEvent reference to its applier
///
/// This is the ONLY place with a match on EventPayload.
impl From<&CheckEvent> for EventAction {
    fn from(event: &CheckEvent) -> Self {
        match &event.payload {
            EventPayload::CheckOpened { .. } => EventAction::CheckOpened(CheckOpenedApplier),
            EventPayload::ItemsAdded { .. } => EventAction::ItemsAdded(ItemsAddedApplier),
            EventPayload::ItemFinalized { .. } => {
                EventAction::ItemFinalized(ItemFinalizedApplier)
            }
            EventPayload::ItemModified { .. } => EventAction::ItemModified(ItemModifiedApplier),
            EventPayload::ItemVoided { .. } => EventAction::ItemVoided(ItemVoidedApplier),
            EventPayload::RoundSent { .. } => EventAction::RoundSent(RoundSentApplier),
            EventPayload::PaymentAuthorized { .. } => {
                EventAction::PaymentAuthorized(PaymentAuthorizedApplier)
            }
            EventPayload::PaymentCaptured { .. } => {
                EventAction::PaymentCaptured(PaymentCapturedApplier)
            }
            EventPayload::PaymentVoided { .. } => {
                EventAction::PaymentVoided(PaymentVoidedApplier)
            }
            EventPayload::PaymentRefunded { .. } => {
                EventAction::PaymentRefunded(PaymentRefundedApplier)
            }
            EventPayload::CheckClosed { .. } => EventAction::CheckClosed(CheckClosedApplier),
            EventPayload::CheckVoided { .. } => EventAction::CheckVoided(CheckVoidedApplier),
            EventPayload::CustomerAttached { .. } => {
                EventAction::CustomerAttached(CustomerAttachedApplier)
            }
            EventPayload::CustomerDetached { .. } => {
                EventAction::CustomerDetached(CustomerDetachedApplier)
            }
        }
    }
}

/// Stamp the bookkeeping fields every applier maintains
pub(crate) fn finish(snapshot: &mut CheckSnapshot, event: &CheckEvent) {
    snapshot.last_sequence = event.sequence;
    snapshot.updated_at = event.timestamp;
    snapshot.update_checksum();
}
