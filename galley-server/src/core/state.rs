//! Shared server state
//!
//! One instance per process, cloned into every handler. All members are
//! shared handles.

use crate::checks::manager::{CheckManager, ManagerResult};
use crate::checks::sync::SyncService;
use crate::locks::LockManager;
use crate::payments::{GatewayAdapter, PaymentOrchestrator};
use crate::services::kitchen::{KitchenRouter, LogTicketPublisher, TicketPublisher};
use crate::services::tax::TaxTable;
use std::sync::Arc;

use super::Config;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub manager: CheckManager,
    pub locks: Arc<LockManager>,
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub sync: SyncService,
}

impl ServerState {
    /// Build the full state: storage, manager, locks, orchestrator, and
    /// the kitchen router worker.
    pub fn new(
        config: Config,
        tax: Arc<TaxTable>,
        gateway: Arc<dyn GatewayAdapter>,
    ) -> ManagerResult<Self> {
        let locks = Arc::new(LockManager::new(config.lock_ttl));
        let manager = CheckManager::new(
            config.db_path(),
            locks.clone(),
            tax,
            config.number_range_span,
        )?;

        let orchestrator = Arc::new(PaymentOrchestrator::new(
            manager.clone(),
            gateway,
            config.gateway_timeout,
            config.gateway_status_retries,
        ));
        let sync = SyncService::new(manager.clone());

        Ok(Self {
            config: Arc::new(config),
            manager,
            locks,
            orchestrator,
            sync,
        })
    }

    /// Start the kitchen ticket router on the current runtime
    pub fn spawn_kitchen_router(&self, publisher: Option<Arc<dyn TicketPublisher>>) {
        let publisher = publisher.unwrap_or_else(|| Arc::new(LogTicketPublisher));
        KitchenRouter::spawn(self.manager.subscribe(), publisher);
    }
}
