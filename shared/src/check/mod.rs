//! Check domain types
//!
//! This module provides the types for the check command pipeline:
//! - Commands: requests from terminals to mutate checks
//! - Events: immutable facts recorded after command processing
//! - Snapshots: computed check state from the event stream
//! - Money: fixed-point arithmetic and totals recomputation

pub mod command;
pub mod event;
pub mod money;
pub mod snapshot;
pub mod types;

// Re-exports
pub use command::{CheckCommand, CheckCommandPayload};
pub use event::{CheckEvent, CheckEventType, EventPayload};
pub use snapshot::{CheckSnapshot, CheckStatus};
pub use types::*;
