//! External collaborators of the check pipeline
//!
//! - **tax**: tax-group to rate resolution (the totals contract itself
//!   lives in `shared::check::money`)
//! - **kitchen**: routes ROUND_SENT events to the ticket publisher
//! - **loyalty**: fire-and-forget point earning after close

pub mod kitchen;
pub mod loyalty;
pub mod tax;

pub use kitchen::{KitchenRouter, KitchenTicket, TicketPublisher};
pub use loyalty::LoyaltyNotifier;
pub use tax::TaxTable;
