//! HTTP API
//!
//! One module per resource, each exposing a `router()`. Lock and check
//! operations are request/response endpoints; mutations return either
//! the updated entity or a structured 409-style conflict identifying
//! the current holder/state.

pub mod checks;
pub mod health;
pub mod locks;
pub mod numbering;
pub mod payments;
pub mod sync;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Assemble the full API router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(checks::router())
        .merge(locks::router())
        .merge(payments::router())
        .merge(sync::router())
        .merge(numbering::router())
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
