//! Payment API handlers
//!
//! Each request carries a client-generated `request_id` - the
//! idempotency key for the attempt. Retrying with the same id after a
//! lost response is safe end to end.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::check::CommandResponse;
use validator::Validate;

use crate::core::ServerState;
use crate::payments::orchestrator::Operator;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OperatorFields {
    #[validate(length(min = 1))]
    pub workstation_id: String,
    #[validate(length(min = 1))]
    pub employee_id: String,
    #[serde(default)]
    pub employee_name: String,
}

impl From<OperatorFields> for Operator {
    fn from(fields: OperatorFields) -> Self {
        Operator {
            workstation_id: fields.workstation_id,
            employee_id: fields.employee_id,
            employee_name: fields.employee_name,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TenderRequest {
    #[validate(length(min = 1))]
    pub request_id: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub operator: OperatorFields,
    #[validate(length(min = 1))]
    pub tender_id: String,
    pub amount: Decimal,
}

/// Record a cash-style tender
pub async fn tender(
    State(state): State<ServerState>,
    Path(check_id): Path<String>,
    Json(request): Json<TenderRequest>,
) -> AppResult<Json<CommandResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let response = state.orchestrator.record_tender(
        &check_id,
        &request.request_id,
        &request.operator.into(),
        &request.tender_id,
        request.amount,
    )?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AuthorizeRequest {
    #[validate(length(min = 1))]
    pub request_id: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub operator: OperatorFields,
    #[validate(length(min = 1))]
    pub tender_id: String,
    pub amount: Decimal,
}

/// Authorize a card payment via the gateway
pub async fn authorize(
    State(state): State<ServerState>,
    Path(check_id): Path<String>,
    Json(request): Json<AuthorizeRequest>,
) -> AppResult<Json<CommandResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let response = state
        .orchestrator
        .authorize(
            &check_id,
            &request.request_id,
            &request.operator.into(),
            &request.tender_id,
            request.amount,
        )
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CaptureRequest {
    #[validate(length(min = 1))]
    pub request_id: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub operator: OperatorFields,
    #[validate(length(min = 1))]
    pub payment_id: String,
    /// Tip added at capture time
    #[serde(default)]
    pub tip: Decimal,
}

/// Capture an authorized payment (tip added here)
pub async fn capture(
    State(state): State<ServerState>,
    Path(check_id): Path<String>,
    Json(request): Json<CaptureRequest>,
) -> AppResult<Json<CommandResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let response = state
        .orchestrator
        .capture(
            &check_id,
            &request.request_id,
            &request.operator.into(),
            &request.payment_id,
            request.tip,
        )
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoidPaymentRequest {
    #[validate(length(min = 1))]
    pub request_id: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub operator: OperatorFields,
    #[validate(length(min = 1))]
    pub payment_id: String,
}

/// Void an authorized, uncaptured payment
pub async fn void_payment(
    State(state): State<ServerState>,
    Path(check_id): Path<String>,
    Json(request): Json<VoidPaymentRequest>,
) -> AppResult<Json<CommandResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let response = state
        .orchestrator
        .void_payment(
            &check_id,
            &request.request_id,
            &request.operator.into(),
            &request.payment_id,
        )
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequest {
    #[validate(length(min = 1))]
    pub request_id: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub operator: OperatorFields,
    #[validate(length(min = 1))]
    pub payment_id: String,
    pub amount: Decimal,
}

/// Refund a captured payment, fully or partially
pub async fn refund(
    State(state): State<ServerState>,
    Path(check_id): Path<String>,
    Json(request): Json<RefundRequest>,
) -> AppResult<Json<CommandResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let response = state
        .orchestrator
        .refund(
            &check_id,
            &request.request_id,
            &request.operator.into(),
            &request.payment_id,
            request.amount,
        )
        .await?;
    Ok(Json(response))
}
