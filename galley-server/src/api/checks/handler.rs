//! Check API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::check::{CheckCommand, CheckEvent, CheckSnapshot, CommandResponse};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Execute a check command
///
/// Success returns the command response; a refused command surfaces as
/// a structured conflict with the current state/holder.
pub async fn execute(
    State(state): State<ServerState>,
    Json(command): Json<CheckCommand>,
) -> AppResult<Json<CommandResponse>> {
    if command.command_id.is_empty() {
        return Err(AppError::Validation("command_id must not be empty".to_string()));
    }
    if command.workstation_id.is_empty() || command.employee_id.is_empty() {
        return Err(AppError::Validation(
            "workstation_id and employee_id must not be empty".to_string(),
        ));
    }

    let response = state.manager.execute_command(command);
    match response.error {
        Some(error) => Err(AppError::Command(error)),
        None => Ok(Json(response)),
    }
}

/// List open checks
pub async fn list_open(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<CheckSnapshot>>> {
    let checks = state
        .manager
        .get_open_checks()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(checks))
}

/// Get a check by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<CheckSnapshot>> {
    let snapshot = state
        .manager
        .get_snapshot(&id)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Check {} not found", id)))?;
    Ok(Json(snapshot))
}

/// Get the audit event stream for a check
pub async fn get_events(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CheckEvent>>> {
    let events = state
        .manager
        .get_events_for_check(&id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if events.is_empty() {
        return Err(AppError::NotFound(format!("Check {} not found", id)));
    }
    Ok(Json(events))
}
