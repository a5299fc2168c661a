//! Offline replay tests against a real backend manager
//!
//! The backend here is the actual galley-server command pipeline,
//! wrapped in-process, so replay exercises the same lock and state
//! machine rules a live terminal hits.

use async_trait::async_trait;
use galley_server::checks::manager::CheckManager;
use galley_server::checks::sync::SyncService;
use galley_server::locks::LockManager;
use galley_server::services::tax::TaxTable;
use galley_terminal::backend::{BackendError, CheckBackend};
use galley_terminal::offline::OfflineLedger;
use galley_terminal::queue::SyncQueue;
use galley_terminal::reconciler::{DrainReport, RetryPolicy, SyncReconciler};
use galley_terminal::replica::LocalReplica;
use galley_terminal::session::{OFFLINE_PRIVILEGES, OfflineSession};
use rust_decimal::Decimal;
use shared::check::{
    CheckCommand, CheckCommandPayload, CheckItemInput, CheckSnapshot, CommandResponse, OrderType,
};
use shared::numbering::CheckNumberRange;
use shared::sync::{SyncRequest, SyncResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// In-process backend over a real CheckManager. `offline` makes command
/// execution fail at the transport level while reads keep working,
/// which is enough to exercise the retry path.
struct InProcessBackend {
    manager: CheckManager,
    sync: SyncService,
    offline: AtomicBool,
}

impl InProcessBackend {
    fn new() -> (tempfile::TempDir, Arc<Self>) {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(LockManager::new(Duration::from_secs(60)));
        let manager = CheckManager::new(
            dir.path().join("server.redb"),
            locks,
            Arc::new(TaxTable::default()),
            500,
        )
        .unwrap();
        let sync = SyncService::new(manager.clone());
        (
            dir,
            Arc::new(Self {
                manager,
                sync,
                offline: AtomicBool::new(false),
            }),
        )
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckBackend for InProcessBackend {
    async fn execute(&self, command: &CheckCommand) -> Result<CommandResponse, BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(self.manager.execute_command(command.clone()))
    }

    async fn fetch_check(&self, check_id: &str) -> Result<Option<CheckSnapshot>, BackendError> {
        self.manager
            .get_snapshot(check_id)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn fetch_open_checks(&self) -> Result<Vec<CheckSnapshot>, BackendError> {
        self.manager
            .get_open_checks()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, BackendError> {
        self.sync
            .sync(request)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn request_number_range(
        &self,
        workstation_id: &str,
    ) -> Result<CheckNumberRange, BackendError> {
        self.manager
            .grant_number_range(workstation_id)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn release_all_locks(&self, workstation_id: &str) -> Result<(), BackendError> {
        self.manager.locks().release_all(workstation_id);
        Ok(())
    }
}

struct Terminal {
    _dir: tempfile::TempDir,
    replica: Arc<LocalReplica>,
    queue: Arc<SyncQueue>,
    ledger: OfflineLedger,
    session: OfflineSession,
}

impl Terminal {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let replica = Arc::new(LocalReplica::open(dir.path().join("replica.redb")).unwrap());
        let queue = Arc::new(SyncQueue::open(dir.path().join("queue.redb")).unwrap());
        let ledger = OfflineLedger::new(replica.clone(), queue.clone());
        Terminal {
            _dir: dir,
            replica,
            queue,
            ledger,
            session: OfflineSession {
                employee_id: "emp-1".to_string(),
                employee_name: "Sam".to_string(),
                privileges: OFFLINE_PRIVILEGES,
            },
        }
    }

    fn reconciler(&self, backend: Arc<InProcessBackend>) -> SyncReconciler<InProcessBackend> {
        SyncReconciler::new(
            backend,
            self.replica.clone(),
            self.queue.clone(),
            RetryPolicy {
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                max_attempts: 3,
            },
        )
    }
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn cmd(payload: CheckCommandPayload) -> CheckCommand {
    CheckCommand::new("ws-term", "emp-1", "Sam", payload)
}

fn burger(instance_id: Option<&str>) -> CheckItemInput {
    CheckItemInput {
        menu_item_id: "m1".to_string(),
        name: "Burger".to_string(),
        unit_price: d("10.00"),
        quantity: 1,
        modifiers: vec![],
        seat_number: Some(1),
        tax_group_id: None,
        pending: false,
        instance_id: instance_id.map(str::to_string),
    }
}

#[tokio::test]
async fn offline_session_replays_in_order_with_id_remap() {
    let (_server_dir, backend) = InProcessBackend::new();
    let terminal = Terminal::new();

    // range granted during the last online window
    let range = backend.request_number_range("ws-term").await.unwrap();
    terminal.ledger.numbers().install(range.clone()).unwrap();

    // offline: open, ring up, fire
    let local_id = terminal
        .ledger
        .record(
            &terminal.session,
            cmd(CheckCommandPayload::OpenCheck {
                rvc_id: "rvc-1".to_string(),
                order_type: OrderType::DineIn,
                check_number: None,
                customer_id: None,
            }),
        )
        .unwrap();
    terminal
        .ledger
        .record(
            &terminal.session,
            cmd(CheckCommandPayload::AddItems {
                check_id: local_id.clone(),
                items: vec![burger(None)],
            }),
        )
        .unwrap();
    terminal
        .ledger
        .record(
            &terminal.session,
            cmd(CheckCommandPayload::SendCheck {
                check_id: local_id.clone(),
            }),
        )
        .unwrap();
    assert_eq!(terminal.queue.pending_count().unwrap(), 3);

    // connectivity returns
    let report = terminal.reconciler(backend.clone()).drain().await.unwrap();
    assert_eq!(
        report,
        DrainReport {
            applied: 3,
            dropped: 0,
            dead_lettered: 0,
            cancelled: false,
        }
    );
    assert!(terminal.queue.is_empty().unwrap());

    // the backend is now authoritative: one open check, one round, the
    // reserved display number
    let open = backend.manager.get_open_checks().unwrap();
    assert_eq!(open.len(), 1);
    let server_snapshot = &open[0];
    assert_eq!(server_snapshot.check_number, range.start);
    assert_eq!(server_snapshot.rounds.len(), 1);
    assert_eq!(server_snapshot.total, d("10.00"));

    // placeholder id remapped; the replica holds the canonical snapshot
    assert_ne!(server_snapshot.check_id, local_id);
    assert!(terminal.replica.get_snapshot(&local_id).unwrap().is_none());
    let replicated = terminal
        .replica
        .get_snapshot(&server_snapshot.check_id)
        .unwrap()
        .unwrap();
    assert_eq!(replicated.last_sequence, server_snapshot.last_sequence);
    assert!(!terminal
        .replica
        .is_provisional(&server_snapshot.check_id)
        .unwrap());
    assert_eq!(
        terminal.replica.last_sequence().unwrap(),
        backend.manager.get_current_sequence().unwrap()
    );
}

#[tokio::test]
async fn moot_replays_are_dropped_silently() {
    let (_server_dir, backend) = InProcessBackend::new();
    let terminal = Terminal::new();

    // the check exists on the backend and in the replica
    let open = backend
        .execute(&cmd(CheckCommandPayload::OpenCheck {
            rvc_id: "rvc-1".to_string(),
            order_type: OrderType::DineIn,
            check_number: None,
            customer_id: None,
        }))
        .await
        .unwrap();
    let check_id = open.check_id.unwrap();
    let snapshot = backend.fetch_check(&check_id).await.unwrap().unwrap();
    terminal.replica.upsert_snapshot(&snapshot).unwrap();

    // this terminal goes offline and queues work against the check
    terminal
        .ledger
        .record(
            &terminal.session,
            cmd(CheckCommandPayload::AddItems {
                check_id: check_id.clone(),
                items: vec![burger(Some("i-offline"))],
            }),
        )
        .unwrap();
    terminal
        .ledger
        .record(
            &terminal.session,
            cmd(CheckCommandPayload::SendCheck {
                check_id: check_id.clone(),
            }),
        )
        .unwrap();

    // meanwhile another terminal voids the whole check
    backend.manager.locks().release(&check_id, "ws-term");
    let void = backend
        .execute(&CheckCommand::new(
            "ws-other",
            "emp-9",
            "Alex",
            CheckCommandPayload::VoidCheck {
                check_id: check_id.clone(),
                reason: Some("walked out".to_string()),
                authorizer_id: None,
                authorizer_name: None,
            },
        ))
        .await
        .unwrap();
    assert!(void.success);

    // both queued mutations are moot; nothing surfaces beyond the report
    let report = terminal.reconciler(backend.clone()).drain().await.unwrap();
    assert_eq!(
        report,
        DrainReport {
            applied: 0,
            dropped: 2,
            dead_lettered: 0,
            cancelled: false,
        }
    );
    assert!(terminal.queue.is_empty().unwrap());
    assert!(terminal.queue.dead_letters().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_replay_never_double_applies() {
    let (_server_dir, backend) = InProcessBackend::new();
    let terminal = Terminal::new();

    let open = backend
        .execute(&cmd(CheckCommandPayload::OpenCheck {
            rvc_id: "rvc-1".to_string(),
            order_type: OrderType::DineIn,
            check_number: None,
            customer_id: None,
        }))
        .await
        .unwrap();
    let check_id = open.check_id.unwrap();
    let snapshot = backend.fetch_check(&check_id).await.unwrap().unwrap();
    terminal.replica.upsert_snapshot(&snapshot).unwrap();

    let add = cmd(CheckCommandPayload::AddItems {
        check_id: check_id.clone(),
        items: vec![burger(Some("i-1"))],
    });

    terminal.queue.enqueue(add.clone(), None).unwrap();
    let report = terminal.reconciler(backend.clone()).drain().await.unwrap();
    assert_eq!(report.applied, 1);

    // the ack was lost: the exact same command is replayed
    terminal.queue.enqueue(add, None).unwrap();
    let report = terminal.reconciler(backend.clone()).drain().await.unwrap();
    assert_eq!(report.applied, 1);

    let snapshot = backend.fetch_check(&check_id).await.unwrap().unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.total, d("10.00"));
}

#[tokio::test]
async fn transient_failures_hit_the_ceiling_and_surface() {
    let (_server_dir, backend) = InProcessBackend::new();
    let terminal = Terminal::new();

    terminal
        .queue
        .enqueue(
            cmd(CheckCommandPayload::SendCheck {
                check_id: "some-check".to_string(),
            }),
            None,
        )
        .unwrap();

    backend.set_offline(true);
    let report = terminal.reconciler(backend.clone()).drain().await.unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(report.dead_lettered, 1);
    assert!(terminal.queue.is_empty().unwrap());

    let dead = terminal.queue.dead_letters().unwrap();
    assert_eq!(dead.len(), 1);
    assert!(dead[0].entry.last_error.is_some());
}

#[tokio::test]
async fn cancellation_stops_the_drain_and_preserves_the_queue() {
    let (_server_dir, backend) = InProcessBackend::new();
    let terminal = Terminal::new();

    terminal
        .queue
        .enqueue(
            cmd(CheckCommandPayload::SendCheck {
                check_id: "some-check".to_string(),
            }),
            None,
        )
        .unwrap();

    backend.set_offline(true);
    let reconciler = SyncReconciler::new(
        backend.clone(),
        terminal.replica.clone(),
        terminal.queue.clone(),
        RetryPolicy {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        },
    );
    let token = reconciler.cancellation_token();

    let drain = tokio::spawn(async move { reconciler.drain().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let report = drain.await.unwrap().unwrap();
    assert!(report.cancelled);
    // the unacknowledged entry is still first in line for the next drain
    assert_eq!(terminal.queue.pending_count().unwrap(), 1);
}
