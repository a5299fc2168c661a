//! SendCheck command handler
//!
//! Gathers every active, unsent item and fires them as one round. The
//! round record is what the kitchen-ticket publisher consumes.
//! Re-sending is idempotent per round: items already sent are excluded,
//! and a send with nothing new emits no event and no ticket.

use async_trait::async_trait;

use super::require_open;
use crate::checks::traits::{CheckError, CommandContext, CommandHandler, CommandMetadata};
use shared::check::{
    CheckEvent, CheckEventType, CommandErrorCode, EventPayload, RoundItem,
};

/// SendCheck action
#[derive(Debug, Clone)]
pub struct SendCheckAction {
    pub check_id: String,
}

#[async_trait]
impl CommandHandler for SendCheckAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<CheckEvent>, CheckError> {
        let snapshot = ctx.load_snapshot(&self.check_id)?;
        require_open(&snapshot)?;

        // pending items must be finalized or voided before the check can
        // be sent
        let pending = snapshot.pending_count();
        if pending > 0 {
            return Err(CheckError::InvalidOperation(
                CommandErrorCode::PendingItemsRemain,
                format!("{pending} pending item(s) must be finalized or voided before sending"),
            ));
        }

        let round_items: Vec<RoundItem> = snapshot
            .items
            .iter()
            .filter(|i| i.is_active() && !i.sent)
            .map(|i| RoundItem {
                instance_id: i.instance_id.clone(),
                name: i.name.clone(),
                quantity: i.quantity,
                modifiers: i.modifiers.clone(),
                seat_number: i.seat_number,
            })
            .collect();

        // nothing new to fire: idempotent no-op, no round, no ticket
        if round_items.is_empty() {
            return Ok(vec![]);
        }

        let round_number = snapshot.rounds.len() as u32 + 1;
        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            self.check_id.clone(),
            CheckEventType::RoundSent,
            EventPayload::RoundSent {
                round_number,
                check_number: snapshot.check_number,
                order_type: snapshot.order_type,
                items: round_items,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::storage::CheckStorage;
    use crate::checks::traits::CommandContext;
    use shared::check::{CheckItemSnapshot, CheckSnapshot, ItemStatus};

    fn metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            workstation_id: "ws-1".to_string(),
            employee_id: "emp-1".to_string(),
            employee_name: "Test User".to_string(),
            timestamp: 1234567890,
        }
    }

    fn item(instance_id: &str, status: ItemStatus, sent: bool) -> CheckItemSnapshot {
        CheckItemSnapshot {
            instance_id: instance_id.to_string(),
            menu_item_id: "m1".to_string(),
            name: "Burger".to_string(),
            unit_price: "10.00".parse().unwrap(),
            quantity: 1,
            modifiers: vec![],
            seat_number: Some(2),
            tax_rate: "8".parse().unwrap(),
            item_status: status,
            sent,
            void_reason: None,
        }
    }

    fn run(snapshot: CheckSnapshot) -> Result<Vec<CheckEvent>, CheckError> {
        let storage = CheckStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        ctx.save_snapshot(snapshot);
        let action = SendCheckAction {
            check_id: "c1".to_string(),
        };
        futures::executor::block_on(action.execute(&mut ctx, &metadata()))
    }

    #[test]
    fn already_sent_items_are_excluded() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.items.push(item("i1", ItemStatus::Active, true));
        snapshot.items.push(item("i2", ItemStatus::Active, false));
        snapshot.items.push(item("i3", ItemStatus::Voided, false));

        let events = run(snapshot).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0].payload {
            EventPayload::RoundSent { items, .. } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].instance_id, "i2");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn send_with_nothing_new_emits_no_event() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.items.push(item("i1", ItemStatus::Active, true));

        let events = run(snapshot).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn pending_items_block_the_send() {
        let mut snapshot = CheckSnapshot::new("c1".to_string());
        snapshot.items.push(item("i1", ItemStatus::Pending, false));
        snapshot.items.push(item("i2", ItemStatus::Active, false));

        let err = run(snapshot).unwrap_err();
        assert!(matches!(
            err,
            CheckError::InvalidOperation(CommandErrorCode::PendingItemsRemain, _)
        ));
    }
}
