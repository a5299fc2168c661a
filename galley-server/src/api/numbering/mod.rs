//! Number-range API module

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Number-range router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/number-ranges", post(handler::grant))
}
