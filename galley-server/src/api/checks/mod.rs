//! Check API module
//!
//! All mutations flow through the command endpoint so live terminals
//! and the sync reconciler replay the exact same operations.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Check router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checks", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/commands", post(handler::execute))
        .route("/", get(handler::list_open))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/events", get(handler::get_events))
}
