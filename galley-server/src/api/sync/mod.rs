//! Sync API module

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Sync router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/sync", post(handler::sync))
}
