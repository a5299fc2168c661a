//! Backend client seam
//!
//! `CheckBackend` is what the reconciler (and an online terminal UI)
//! talks to. The HTTP implementation classifies failures the way the
//! retry policy needs them: connectivity problems and 5xx responses are
//! transient, everything else is final. A refused command (409-style
//! body) is NOT a transport error - it comes back as an unsuccessful
//! `CommandResponse` so callers see the structured conflict.

use async_trait::async_trait;
use serde::Deserialize;
use shared::check::{
    CheckCommand, CheckSnapshot, CheckStatus, CommandError, CommandErrorCode, CommandResponse,
};
use shared::lock::LockHolder;
use shared::numbering::CheckNumberRange;
use shared::sync::{SyncRequest, SyncResponse};
use thiserror::Error;

/// Backend communication failures
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-level failure (unreachable, reset, timed out)
    #[error("Network error: {0}")]
    Transport(String),

    /// Backend reachable but failing (5xx)
    #[error("Server error: HTTP {0}")]
    Unavailable(u16),

    /// Response did not parse; not retryable
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Only transient failures are eligible for automatic retry
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transport(_) | BackendError::Unavailable(_))
    }
}

/// Backend capability used by the reconciler and the online path
#[async_trait]
pub trait CheckBackend: Send + Sync {
    /// Execute a command through the backend's lock-then-transition path
    async fn execute(&self, command: &CheckCommand) -> Result<CommandResponse, BackendError>;

    /// Fetch the canonical snapshot for one check (None when unknown)
    async fn fetch_check(&self, check_id: &str) -> Result<Option<CheckSnapshot>, BackendError>;

    /// Fetch every open check (full-sync refresh)
    async fn fetch_open_checks(&self) -> Result<Vec<CheckSnapshot>, BackendError>;

    /// Catch up by sequence number
    async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, BackendError>;

    /// Reserve a fresh check-number range for this workstation
    async fn request_number_range(
        &self,
        workstation_id: &str,
    ) -> Result<CheckNumberRange, BackendError>;

    /// Drop every lock this workstation holds (sign-out / shutdown)
    async fn release_all_locks(&self, workstation_id: &str) -> Result<(), BackendError>;
}

/// Wire shape of the server's structured error body
#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    message: String,
    #[serde(default)]
    current_status: Option<CheckStatus>,
    #[serde(default)]
    holder: Option<LockHolder>,
}

impl WireError {
    fn into_command_error(self) -> CommandError {
        // unknown codes (non-command endpoints) degrade to internal
        let code: CommandErrorCode =
            serde_json::from_value(serde_json::Value::String(self.code.clone()))
                .unwrap_or(CommandErrorCode::InternalError);
        CommandError {
            code,
            message: self.message,
            current_status: self.current_status,
            holder: self.holder,
        }
    }
}

/// HTTP backend over reqwest
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Map a response into Ok(body) / structured command failure /
    /// transport classification
    async fn command_response(
        response: reqwest::Response,
        command_id: &str,
    ) -> Result<CommandResponse, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Self::parse_json(response).await;
        }
        if status.is_server_error() {
            return Err(BackendError::Unavailable(status.as_u16()));
        }
        let wire: WireError = Self::parse_json(response).await?;
        Ok(CommandResponse::error(
            command_id.to_string(),
            wire.into_command_error(),
        ))
    }
}

#[async_trait]
impl CheckBackend for HttpBackend {
    async fn execute(&self, command: &CheckCommand) -> Result<CommandResponse, BackendError> {
        let response = self
            .client
            .post(self.url("/api/checks/commands"))
            .json(command)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Self::command_response(response, &command.command_id).await
    }

    async fn fetch_check(&self, check_id: &str) -> Result<Option<CheckSnapshot>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/api/checks/{check_id}")))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_server_error() {
            return Err(BackendError::Unavailable(status.as_u16()));
        }
        Ok(Some(Self::parse_json(response).await?))
    }

    async fn fetch_open_checks(&self) -> Result<Vec<CheckSnapshot>, BackendError> {
        let response = self
            .client
            .get(self.url("/api/checks"))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_server_error() {
            return Err(BackendError::Unavailable(status.as_u16()));
        }
        Self::parse_json(response).await
    }

    async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, BackendError> {
        let response = self
            .client
            .post(self.url("/api/sync"))
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_server_error() {
            return Err(BackendError::Unavailable(status.as_u16()));
        }
        Self::parse_json(response).await
    }

    async fn request_number_range(
        &self,
        workstation_id: &str,
    ) -> Result<CheckNumberRange, BackendError> {
        let response = self
            .client
            .post(self.url("/api/number-ranges"))
            .json(&serde_json::json!({ "workstation_id": workstation_id }))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_server_error() {
            return Err(BackendError::Unavailable(status.as_u16()));
        }
        Self::parse_json(response).await
    }

    async fn release_all_locks(&self, workstation_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/api/locks/release-all"))
            .json(&serde_json::json!({ "workstation_id": workstation_id }))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if response.status().is_server_error() {
            return Err(BackendError::Unavailable(response.status().as_u16()));
        }
        Ok(())
    }
}
