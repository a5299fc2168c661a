//! Sync API handler

use axum::{Json, extract::State};
use shared::sync::{SyncRequest, SyncResponse};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Catch a reconnecting terminal up by sequence number
pub async fn sync(
    State(state): State<ServerState>,
    Json(request): Json<SyncRequest>,
) -> AppResult<Json<SyncResponse>> {
    let response = state
        .sync
        .sync(request)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(response))
}
