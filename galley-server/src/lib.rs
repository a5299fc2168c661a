//! Galley check & posting backend
//!
//! The backend every terminal talks to: the authoritative Check Store,
//! the order state machine, the multi-workstation lock manager, the
//! payment orchestrator, and the reconnect sync service.
//!
//! # Architecture
//!
//! ```text
//! Command → CheckManager → Event → Storage (redb)
//!               ↓                      ↓
//!           Broadcast           Snapshot Update
//!               ↓
//!     Kitchen Router / Subscribers
//! ```
//!
//! Every mutation, whether issued live by a terminal or replayed by the
//! sync reconciler, passes through the same lock-then-transition path.

pub mod api;
pub mod checks;
pub mod core;
pub mod locks;
pub mod payments;
pub mod services;
pub mod utils;

// Re-exports
pub use crate::checks::manager::CheckManager;
pub use crate::checks::storage::CheckStorage;
pub use crate::checks::sync::SyncService;
pub use crate::core::{Config, ServerState};
pub use crate::locks::LockManager;
pub use crate::payments::{GatewayAdapter, PaymentOrchestrator};
