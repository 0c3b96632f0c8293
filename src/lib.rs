//! Stock price forecast service.
//!
//! Fetches daily closes for a ticker, scales the last 60 into a model input
//! window, asks a remote model for 30 more steps and charts the actual and
//! forecast prices on one date axis.

pub mod config;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod render;
pub mod routes;
pub mod source;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Full application router: pages, API and the liveness probe.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::app_router())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
