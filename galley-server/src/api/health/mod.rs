//! Health endpoint

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    /// Server instance epoch - terminals compare this to detect restarts
    pub epoch: String,
}

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<ServerState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        epoch: state.manager.epoch().to_string(),
    })
}
