//! Lock API module

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Lock router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/locks", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/acquire", post(handler::acquire))
        .route("/refresh", post(handler::refresh))
        .route("/release", post(handler::release))
        .route("/release-all", post(handler::release_all))
}
