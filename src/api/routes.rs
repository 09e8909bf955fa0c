//! Route configuration.

use crate::api::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Portfolio analysis
        .route("/api/analyze_portfolio", post(handlers::analyze_portfolio))
        .route("/api/v1/analyze_portfolio", post(handlers::analyze_portfolio))
        .with_state(state)
}
