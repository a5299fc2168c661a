//! Payment API module

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Payment router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checks/{id}/payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/tender", post(handler::tender))
        .route("/authorize", post(handler::authorize))
        .route("/capture", post(handler::capture))
        .route("/void", post(handler::void_payment))
        .route("/refund", post(handler::refund))
}
