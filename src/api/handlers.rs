//! API request handlers.

use crate::error::ApiError;
use crate::market::instant_after;
use crate::models::{AnalyzeRequest, HealthResponse, Metrics};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{Instrument, info_span, warn};
use uuid::Uuid;

/// Response header carrying the number of skipped lookups and pricing calls.
pub const PARTIAL_FAILURES_HEADER: &str = "x-partial-failures";

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Portfolio Analysis
// ============================================================================

/// Runs every position through every scenario shock.
///
/// Always answers 200 with whatever could be computed; tickers or scenarios
/// that failed upstream are missing from the table and counted in the
/// `x-partial-failures` header.
#[utoipa::path(
    post,
    path = "/api/analyze_portfolio",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Metrics per ticker and shock", body = BTreeMap<String, BTreeMap<String, Metrics>>),
        (status = 400, description = "Invalid request")
    ),
    tag = "Analysis"
)]
pub async fn analyze_portfolio(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let request_id = Uuid::new_v4();
    let span = info_span!("analyze_portfolio", %request_id);
    let deadline = instant_after(Instant::now(), state.request_timeout);

    let outcome = state
        .aggregator
        .analyze(&request, deadline)
        .instrument(span.clone())
        .await;

    if !outcome.failures.is_empty() {
        span.in_scope(|| {
            warn!(
                "Returning partial results for {} tickers: {} failures",
                outcome.results.len(),
                outcome.failures.len()
            )
        });
    }

    Ok((
        [(PARTIAL_FAILURES_HEADER, outcome.failures.len().to_string())],
        Json(outcome.results),
    ))
}
