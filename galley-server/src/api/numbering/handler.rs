//! Number-range API handler

use axum::{Json, extract::State};
use serde::Deserialize;
use shared::numbering::CheckNumberRange;
use validator::Validate;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
pub struct GrantRequest {
    #[validate(length(min = 1))]
    pub workstation_id: String,
}

/// Grant a fresh check-number range to a workstation
pub async fn grant(
    State(state): State<ServerState>,
    Json(request): Json<GrantRequest>,
) -> AppResult<Json<CheckNumberRange>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let range = state
        .manager
        .grant_number_range(&request.workstation_id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(range))
}
