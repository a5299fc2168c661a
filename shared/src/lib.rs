//! Shared types for the galley check & posting platform
//!
//! Common types used by both the backend (`galley-server`) and the
//! terminal-side offline engine (`galley-terminal`): check commands,
//! events, snapshots, lock and number-range DTOs, the reconnect sync
//! protocol, and the fixed-point money module.

pub mod check;
pub mod lock;
pub mod numbering;
pub mod sync;
pub mod util;

// Re-exports
pub use check::{
    CheckCommand, CheckCommandPayload, CheckEvent, CheckEventType, CheckSnapshot, CheckStatus,
    CommandError, CommandErrorCode, CommandResponse, EventPayload,
};
pub use lock::{LockHolder, LockInfo};
pub use numbering::CheckNumberRange;
pub use sync::{SyncRequest, SyncResponse};
