//! Galley terminal-side offline engine
//!
//! A terminal keeps taking orders when the backend is unreachable:
//!
//! - **replica**: durable local copy of check snapshots - a *copy*,
//!   never authoritative while a partition exists
//! - **queue**: FIFO of mutations attempted while offline
//! - **projection**: optimistic local application of those mutations so
//!   the replica tracks what the cashier sees
//! - **reconciler**: drains the queue against the backend through the
//!   normal lock-then-transition path once connectivity returns
//! - **session**: offline sign-in against cached credentials with a
//!   reduced privilege set
//! - **numbering**: the reserved check-number cursor
//!
//! Cross-terminal visibility only ever happens through the backend; the
//! replica and queue are exclusively owned by this terminal.

pub mod backend;
pub mod error;
pub mod numbering;
pub mod offline;
pub mod projection;
pub mod queue;
pub mod reconciler;
pub mod replica;
pub mod session;

// Re-exports
pub use backend::{BackendError, CheckBackend, HttpBackend};
pub use error::TerminalError;
pub use offline::OfflineLedger;
pub use queue::{QueueEntry, SyncQueue};
pub use reconciler::{DrainReport, RetryPolicy, SyncReconciler};
pub use replica::LocalReplica;
pub use session::{CredentialCache, OfflineSession};
