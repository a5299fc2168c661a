//! Payment processing
//!
//! - **gateway**: the processor capability seam (authorize / capture /
//!   void / refund / status), one implementation per processor
//! - **orchestrator**: sequences gateway calls against the check state
//!   machine and keeps local payment records consistent with gateway
//!   truth even when a call fails partway

pub mod gateway;
pub mod orchestrator;

pub use gateway::{GatewayAdapter, GatewayAuth, GatewayError, GatewayStatus, NullGateway, ProcessorKind};
pub use orchestrator::{PaymentError, PaymentOrchestrator};
