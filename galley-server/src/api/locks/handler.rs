//! Lock API handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::lock::{LockInfo, LockRequest};
use validator::Validate;

use crate::core::ServerState;
use crate::locks::LockError;
use crate::utils::{AppError, AppResult};

/// Acquire the editing lock for a check
///
/// A conflict returns 409 with the holding workstation/employee so the
/// terminal can show "locked by X".
pub async fn acquire(
    State(state): State<ServerState>,
    Json(request): Json<LockRequest>,
) -> AppResult<Json<LockInfo>> {
    state
        .locks
        .acquire(&request.check_id, &request.workstation_id, &request.employee_id)
        .map(Json)
        .map_err(lock_error)
}

/// Extend a held lock
pub async fn refresh(
    State(state): State<ServerState>,
    Json(request): Json<LockRequest>,
) -> AppResult<Json<LockInfo>> {
    state
        .locks
        .refresh(&request.check_id, &request.workstation_id, &request.employee_id)
        .map(Json)
        .map_err(lock_error)
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: usize,
}

/// Release a lock (no-op when not held)
pub async fn release(
    State(state): State<ServerState>,
    Json(request): Json<LockRequest>,
) -> AppResult<Json<ReleaseResponse>> {
    state.locks.release(&request.check_id, &request.workstation_id);
    Ok(Json(ReleaseResponse { released: 1 }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReleaseAllRequest {
    #[validate(length(min = 1))]
    pub workstation_id: String,
}

/// Release every lock a workstation holds (disconnect / logout)
pub async fn release_all(
    State(state): State<ServerState>,
    Json(request): Json<ReleaseAllRequest>,
) -> AppResult<Json<ReleaseResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let released = state.locks.release_all(&request.workstation_id);
    Ok(Json(ReleaseResponse { released }))
}

fn lock_error(err: LockError) -> AppError {
    match err {
        LockError::Held(info) => AppError::Locked(info),
        LockError::PaymentInFlight { check_id } => AppError::Payment(
            crate::payments::PaymentError::InFlight(check_id),
        ),
    }
}
