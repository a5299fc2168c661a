//! Kitchen ticket routing
//!
//! A worker subscribed to the manager's event broadcast turns ROUND_SENT
//! events into kitchen tickets and hands them to the publisher. Ticket
//! formatting and printer fan-out live behind `TicketPublisher`; this
//! module only guarantees one ticket per round.

use shared::check::{CheckEvent, EventPayload, OrderType, RoundItem};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// One line on a kitchen ticket
#[derive(Debug, Clone, serde::Serialize)]
pub struct TicketItem {
    pub name: String,
    pub quantity: i32,
    pub modifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<i32>,
}

/// The event emitted to the kitchen on a successful send
#[derive(Debug, Clone, serde::Serialize)]
pub struct KitchenTicket {
    pub check_id: String,
    pub check_number: i64,
    pub order_type: OrderType,
    pub round_number: u32,
    pub items: Vec<TicketItem>,
}

impl KitchenTicket {
    fn from_round(
        check_id: &str,
        check_number: i64,
        order_type: OrderType,
        round_number: u32,
        items: &[RoundItem],
    ) -> Self {
        Self {
            check_id: check_id.to_string(),
            check_number,
            order_type,
            round_number,
            items: items
                .iter()
                .map(|i| TicketItem {
                    name: i.name.clone(),
                    quantity: i.quantity,
                    modifiers: i.modifiers.iter().map(|m| m.name.clone()).collect(),
                    seat_number: i.seat_number,
                })
                .collect(),
        }
    }
}

/// Ticket sink - formatting and device fan-out are out of scope here
pub trait TicketPublisher: Send + Sync {
    fn publish(&self, ticket: KitchenTicket);
}

/// Default publisher: structured log only (useful on dev boxes and in
/// sites without kitchen devices)
pub struct LogTicketPublisher;

impl TicketPublisher for LogTicketPublisher {
    fn publish(&self, ticket: KitchenTicket) {
        tracing::info!(
            check_id = %ticket.check_id,
            check_number = ticket.check_number,
            round = ticket.round_number,
            items = ticket.items.len(),
            "Kitchen ticket"
        );
    }
}

/// Broadcast subscriber turning rounds into tickets
pub struct KitchenRouter;

impl KitchenRouter {
    /// Spawn the routing worker. It runs until the broadcast channel
    /// closes; a lagged receiver logs and keeps going (missed rounds are
    /// recoverable from the event stream).
    pub fn spawn(
        mut events: broadcast::Receiver<CheckEvent>,
        publisher: Arc<dyn TicketPublisher>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let EventPayload::RoundSent {
                            round_number,
                            check_number,
                            order_type,
                            items,
                        } = &event.payload
                        {
                            let ticket = KitchenTicket::from_round(
                                &event.check_id,
                                *check_number,
                                *order_type,
                                *round_number,
                                items,
                            );
                            publisher.publish(ticket);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Kitchen router lagged behind event broadcast");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared::check::{CheckEventType, ItemModifier};

    struct CapturePublisher(Mutex<Vec<KitchenTicket>>);

    impl TicketPublisher for CapturePublisher {
        fn publish(&self, ticket: KitchenTicket) {
            self.0.lock().push(ticket);
        }
    }

    #[tokio::test]
    async fn routes_rounds_and_ignores_other_events() {
        let (tx, rx) = broadcast::channel(16);
        let publisher = Arc::new(CapturePublisher(Mutex::new(Vec::new())));
        let handle = KitchenRouter::spawn(rx, publisher.clone());

        let round = CheckEvent::new(
            1,
            "c1".to_string(),
            "ws-1".to_string(),
            "emp-1".to_string(),
            "Test".to_string(),
            "cmd-1".to_string(),
            None,
            CheckEventType::RoundSent,
            EventPayload::RoundSent {
                round_number: 1,
                check_number: 1001,
                order_type: OrderType::DineIn,
                items: vec![RoundItem {
                    instance_id: "i1".to_string(),
                    name: "Burger".to_string(),
                    quantity: 2,
                    modifiers: vec![ItemModifier {
                        name: "No onion".to_string(),
                        price_delta: rust_decimal::Decimal::ZERO,
                    }],
                    seat_number: Some(3),
                }],
            },
        );
        let unrelated = CheckEvent::new(
            2,
            "c1".to_string(),
            "ws-1".to_string(),
            "emp-1".to_string(),
            "Test".to_string(),
            "cmd-2".to_string(),
            None,
            CheckEventType::CustomerDetached,
            EventPayload::CustomerDetached {},
        );

        tx.send(round).unwrap();
        tx.send(unrelated).unwrap();
        drop(tx);
        handle.await.unwrap();

        let tickets = publisher.0.lock();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].check_number, 1001);
        assert_eq!(tickets[0].items[0].modifiers, vec!["No onion".to_string()]);
    }
}
