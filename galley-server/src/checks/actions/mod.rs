//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles one
//! specific command type. Actions validate against the loaded snapshot
//! and emit events; they never mutate state directly.

use async_trait::async_trait;

use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{CheckCommand, CheckCommandPayload, CheckEvent, CheckSnapshot, CheckStatus};

mod add_items;
mod cancel_transaction;
mod capture_payment;
mod close_check;
mod customer;
mod finalize_item;
mod modify_item;
mod open_check;
mod record_payment;
mod refund_payment;
mod send_check;
mod void_check;
mod void_item;
mod void_payment;

pub use add_items::AddItemsAction;
pub use cancel_transaction::CancelTransactionAction;
pub use capture_payment::RecordCaptureAction;
pub use close_check::CloseCheckAction;
pub use customer::{AttachCustomerAction, DetachCustomerAction};
pub use finalize_item::FinalizeItemAction;
pub use modify_item::ModifyItemAction;
pub use open_check::OpenCheckAction;
pub use record_payment::{RecordAuthorizationAction, RecordTenderAction};
pub use refund_payment::RecordRefundAction;
pub use send_check::SendCheckAction;
pub use void_payment::RecordPaymentVoidAction;
pub use void_check::VoidCheckAction;
pub use void_item::VoidItemAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    OpenCheck(OpenCheckAction),
    AddItems(AddItemsAction),
    FinalizeItem(FinalizeItemAction),
    ModifyItem(ModifyItemAction),
    VoidItem(VoidItemAction),
    SendCheck(SendCheckAction),
    CancelTransaction(CancelTransactionAction),
    RecordTender(RecordTenderAction),
    RecordAuthorization(RecordAuthorizationAction),
    RecordCapture(RecordCaptureAction),
    RecordPaymentVoid(RecordPaymentVoidAction),
    RecordRefund(RecordRefundAction),
    CloseCheck(CloseCheckAction),
    VoidCheck(VoidCheckAction),
    AttachCustomer(AttachCustomerAction),
    DetachCustomer(DetachCustomerAction),
}

#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        match self {
            CommandAction::OpenCheck(action) => action.execute(ctx, metadata).await,
            CommandAction::AddItems(action) => action.execute(ctx, metadata).await,
            CommandAction::FinalizeItem(action) => action.execute(ctx, metadata).await,
            CommandAction::ModifyItem(action) => action.execute(ctx, metadata).await,
            CommandAction::VoidItem(action) => action.execute(ctx, metadata).await,
            CommandAction::SendCheck(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelTransaction(action) => action.execute(ctx, metadata).await,
            CommandAction::RecordTender(action) => action.execute(ctx, metadata).await,
            CommandAction::RecordAuthorization(action) => action.execute(ctx, metadata).await,
            CommandAction::RecordCapture(action) => action.execute(ctx, metadata).await,
            CommandAction::RecordPaymentVoid(action) => action.execute(ctx, metadata).await,
            CommandAction::RecordRefund(action) => action.execute(ctx, metadata).await,
            CommandAction::CloseCheck(action) => action.execute(ctx, metadata).await,
            CommandAction::VoidCheck(action) => action.execute(ctx, metadata).await,
            CommandAction::AttachCustomer(action) => action.execute(ctx, metadata).await,
            CommandAction::DetachCustomer(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert CheckCommand to CommandAction
///
/// This is the ONLY place with a match on CheckCommandPayload. OpenCheck
/// and AddItems are handled by CheckManager directly because they need
/// injected data (pre-generated check number, resolved tax rates).
impl From<&CheckCommand> for CommandAction {
    fn from(cmd: &CheckCommand) -> Self {
        match &cmd.payload {
            CheckCommandPayload::OpenCheck { .. } => {
                // check_number must be pre-generated outside the write
                // transaction; CheckManager builds this action itself
                unreachable!("OpenCheck is handled by CheckManager, not From<&CheckCommand>")
            }
            CheckCommandPayload::AddItems { .. } => {
                unreachable!("AddItems is handled by CheckManager, not From<&CheckCommand>")
            }
            CheckCommandPayload::FinalizeItem {
                check_id,
                instance_id,
                modifiers,
            } => CommandAction::FinalizeItem(FinalizeItemAction {
                check_id: check_id.clone(),
                instance_id: instance_id.clone(),
                modifiers: modifiers.clone(),
            }),
            CheckCommandPayload::ModifyItem {
                check_id,
                instance_id,
                changes,
            } => CommandAction::ModifyItem(ModifyItemAction {
                check_id: check_id.clone(),
                instance_id: instance_id.clone(),
                changes: changes.clone(),
            }),
            CheckCommandPayload::VoidItem {
                check_id,
                instance_id,
                reason,
                authorizer_id,
                authorizer_name,
            } => CommandAction::VoidItem(VoidItemAction {
                check_id: check_id.clone(),
                instance_id: instance_id.clone(),
                reason: reason.clone(),
                authorizer_id: authorizer_id.clone(),
                authorizer_name: authorizer_name.clone(),
            }),
            CheckCommandPayload::SendCheck { check_id } => {
                CommandAction::SendCheck(SendCheckAction {
                    check_id: check_id.clone(),
                })
            }
            CheckCommandPayload::CancelTransaction { check_id } => {
                CommandAction::CancelTransaction(CancelTransactionAction {
                    check_id: check_id.clone(),
                })
            }
            CheckCommandPayload::RecordTender {
                check_id,
                tender_id,
                amount,
            } => CommandAction::RecordTender(RecordTenderAction {
                check_id: check_id.clone(),
                tender_id: tender_id.clone(),
                amount: *amount,
            }),
            CheckCommandPayload::RecordAuthorization {
                check_id,
                tender_id,
                amount,
                gateway_txn_id,
            } => CommandAction::RecordAuthorization(RecordAuthorizationAction {
                check_id: check_id.clone(),
                tender_id: tender_id.clone(),
                amount: *amount,
                gateway_txn_id: gateway_txn_id.clone(),
            }),
            CheckCommandPayload::RecordCapture {
                check_id,
                payment_id,
                tip,
            } => CommandAction::RecordCapture(RecordCaptureAction {
                check_id: check_id.clone(),
                payment_id: payment_id.clone(),
                tip: *tip,
            }),
            CheckCommandPayload::RecordPaymentVoid {
                check_id,
                payment_id,
            } => CommandAction::RecordPaymentVoid(RecordPaymentVoidAction {
                check_id: check_id.clone(),
                payment_id: payment_id.clone(),
            }),
            CheckCommandPayload::RecordRefund {
                check_id,
                payment_id,
                amount,
            } => CommandAction::RecordRefund(RecordRefundAction {
                check_id: check_id.clone(),
                payment_id: payment_id.clone(),
                amount: *amount,
            }),
            CheckCommandPayload::CloseCheck { check_id } => {
                CommandAction::CloseCheck(CloseCheckAction {
                    check_id: check_id.clone(),
                })
            }
            CheckCommandPayload::VoidCheck {
                check_id,
                reason,
                authorizer_id,
                authorizer_name,
            } => CommandAction::VoidCheck(VoidCheckAction {
                check_id: check_id.clone(),
                reason: reason.clone(),
                authorizer_id: authorizer_id.clone(),
                authorizer_name: authorizer_name.clone(),
            }),
            CheckCommandPayload::AttachCustomer {
                check_id,
                customer_id,
            } => CommandAction::AttachCustomer(AttachCustomerAction {
                check_id: check_id.clone(),
                customer_id: customer_id.clone(),
            }),
            CheckCommandPayload::DetachCustomer { check_id } => {
                CommandAction::DetachCustomer(DetachCustomerAction {
                    check_id: check_id.clone(),
                })
            }
        }
    }
}

/// Gate shared by every action mutating an existing check: the check
/// must still be open
pub(crate) fn require_open(snapshot: &CheckSnapshot) -> Result<(), CheckError> {
    match snapshot.status {
        CheckStatus::Open => Ok(()),
        CheckStatus::Closed => Err(CheckError::CheckAlreadyClosed(snapshot.check_id.clone())),
        CheckStatus::Voided => Err(CheckError::CheckAlreadyVoided(snapshot.check_id.clone())),
    }
}
