//! Sync reconciler - offline-first replay
//!
//! Drains the sync queue strictly in enqueue order, re-issuing each
//! command against the backend through the normal lock-then-transition
//! path. Ordering across terminals is arbitrated by the backend, not by
//! this queue; FIFO replay only preserves THIS terminal's causal
//! history.
//!
//! Outcome per entry:
//! - acknowledged: remove it, overwrite the replica with the canonical
//!   snapshot (server ids and timestamps supersede local placeholders)
//! - moot conflict (check/item already settled elsewhere): drop it -
//!   retrying would at best no-op and at worst resurrect stale state
//! - contention (lock held, payment in flight, backend busy): bounded
//!   exponential backoff, then dead-letter
//! - transient failure (network, 5xx): same backoff path
//! - any other rejection: dead-letter immediately for the operator
//!
//! The drain is cancellable (terminal going offline mid-drain) and
//! resumes cleanly from the first unacknowledged entry next time.

use shared::check::{CommandError, CommandErrorCode, CommandResponse};
use shared::sync::SyncRequest;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::backend::CheckBackend;
use crate::error::TerminalResult;
use crate::queue::{QueueEntry, SyncQueue};
use crate::replica::LocalReplica;

/// Retry pacing for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Attempt ceiling before an entry is surfaced to an operator
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 8,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff, capped
    fn delay_for(&self, attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempts.saturating_sub(1).min(16));
        (self.base_delay.saturating_mul(factor)).min(self.max_delay)
    }
}

/// What a drain accomplished
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries the backend acknowledged
    pub applied: usize,
    /// Moot entries dropped silently
    pub dropped: usize,
    /// Entries surfaced to the operator
    pub dead_lettered: usize,
    /// Whether the drain was cancelled mid-way
    pub cancelled: bool,
}

/// Drains the sync queue against a backend
pub struct SyncReconciler<B: CheckBackend> {
    backend: Arc<B>,
    replica: Arc<LocalReplica>,
    queue: Arc<SyncQueue>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<B: CheckBackend> SyncReconciler<B> {
    pub fn new(
        backend: Arc<B>,
        replica: Arc<LocalReplica>,
        queue: Arc<SyncQueue>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            replica,
            queue,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Token to cancel an in-flight drain (terminal going offline)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain the queue, then pull the backend's state into the replica
    pub async fn drain(&self) -> TerminalResult<DrainReport> {
        let mut report = DrainReport::default();

        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(entry) = self.queue.front()? else {
                break;
            };

            // rewrite placeholder ids assigned while offline
            let mut command = entry.command.clone();
            if let Some(check_id) = command.payload.check_id() {
                let canonical = self.replica.resolve_id(check_id)?;
                if canonical != check_id {
                    command.payload.set_check_id(&canonical);
                }
            }

            match self.backend.execute(&command).await {
                Ok(response) if response.success => {
                    self.on_applied(&entry, &command, &response).await?;
                    report.applied += 1;
                }
                Ok(response) => {
                    let error = response.error.unwrap_or_else(|| {
                        CommandError::new(
                            CommandErrorCode::InternalError,
                            "command failed without error detail",
                        )
                    });
                    if error.code.is_moot() {
                        // already settled by another terminal; dropping is
                        // the correct, invisible outcome
                        tracing::info!(
                            queue_id = entry.id,
                            command_id = %entry.command.command_id,
                            code = ?error.code,
                            "Dropping moot offline mutation"
                        );
                        self.queue.ack(entry.id)?;
                        report.dropped += 1;
                    } else if is_contention(error.code) {
                        if !self.backoff(&entry, &error.message, &mut report).await? {
                            break;
                        }
                    } else {
                        self.queue.dead_letter(entry.id, &error.message)?;
                        report.dead_lettered += 1;
                    }
                }
                Err(e) if e.is_transient() => {
                    if !self.backoff(&entry, &e.to_string(), &mut report).await? {
                        break;
                    }
                }
                Err(e) => {
                    self.queue.dead_letter(entry.id, &e.to_string())?;
                    report.dead_lettered += 1;
                }
            }
        }

        if !report.cancelled {
            self.pull_state().await?;
        }

        tracing::info!(
            applied = report.applied,
            dropped = report.dropped,
            dead_lettered = report.dead_lettered,
            cancelled = report.cancelled,
            "Sync drain finished"
        );
        Ok(report)
    }

    /// Handle a successful replay: remap placeholder ids and refresh the
    /// replica with the canonical snapshot
    async fn on_applied(
        &self,
        entry: &QueueEntry,
        command: &shared::check::CheckCommand,
        response: &CommandResponse,
    ) -> TerminalResult<()> {
        if let (Some(local_id), Some(server_id)) =
            (entry.local_check_id.as_deref(), response.check_id.as_deref())
            && local_id != server_id
        {
            tracing::debug!(local_id, server_id, "Remapping offline check id");
            self.replica.map_id(local_id, server_id)?;
            self.replica.rename_check(local_id, server_id)?;
        }

        let canonical_id = response
            .check_id
            .as_deref()
            .or_else(|| command.payload.check_id());
        if let Some(check_id) = canonical_id {
            // best effort: the pull sync at the end reconciles anything
            // this misses
            match self.backend.fetch_check(check_id).await {
                Ok(Some(snapshot)) => {
                    self.replica.upsert_snapshot(&snapshot)?;
                    self.replica.clear_provisional(check_id)?;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(check_id, error = %e, "Snapshot refresh failed after replay");
                }
            }
        }

        self.queue.ack(entry.id)?;
        Ok(())
    }

    /// Back off before retrying; returns false when the drain should
    /// stop (cancelled). Entries over the attempt ceiling are
    /// dead-lettered and the drain moves on.
    async fn backoff(
        &self,
        entry: &QueueEntry,
        error: &str,
        report: &mut DrainReport,
    ) -> TerminalResult<bool> {
        let attempts = self.queue.record_failure(entry.id, error)?;
        if attempts >= self.policy.max_attempts {
            self.queue.dead_letter(entry.id, error)?;
            report.dead_lettered += 1;
            return Ok(true);
        }

        let delay = self.policy.delay_for(attempts);
        tracing::debug!(
            queue_id = entry.id,
            attempts,
            delay_ms = delay.as_millis() as u64,
            error,
            "Transient failure, backing off"
        );
        tokio::select! {
            _ = self.cancel.cancelled() => {
                report.cancelled = true;
                Ok(false)
            }
            _ = tokio::time::sleep(delay) => Ok(true),
        }
    }

    /// Pull the backend's state into the replica after a drain
    async fn pull_state(&self) -> TerminalResult<()> {
        let since = self.replica.last_sequence()?;
        let response = self.backend.sync(SyncRequest { since_sequence: since }).await?;

        let epoch_changed = self
            .replica
            .server_epoch()?
            .is_some_and(|epoch| epoch != response.server_epoch);

        if response.requires_full_sync || epoch_changed {
            let open_checks = if response.requires_full_sync {
                response.open_checks
            } else {
                self.backend.fetch_open_checks().await?
            };
            tracing::info!(
                open_checks = open_checks.len(),
                epoch_changed,
                "Full replica refresh"
            );
            self.replica.replace_all(&open_checks)?;
        } else {
            // incremental: refresh each touched check once
            let touched: HashSet<&str> = response
                .events
                .iter()
                .map(|e| e.check_id.as_str())
                .collect();
            for check_id in touched {
                match self.backend.fetch_check(check_id).await? {
                    Some(snapshot) => self.replica.upsert_snapshot(&snapshot)?,
                    None => self.replica.remove_snapshot(check_id)?,
                }
            }
        }

        self.replica.set_last_sequence(response.server_sequence)?;
        self.replica.set_server_epoch(&response.server_epoch)?;
        Ok(())
    }
}

/// Conflicts worth retrying: the state they report is expected to clear
/// on its own shortly
fn is_contention(code: CommandErrorCode) -> bool {
    matches!(
        code,
        CommandErrorCode::LockHeld
            | CommandErrorCode::PaymentInFlight
            | CommandErrorCode::SystemBusy
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_attempts: 8,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(10), Duration::from_secs(1));
    }
}
