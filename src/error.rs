//! Error types for the gateway.
//!
//! [`UpstreamError`] classifies failures of the two outbound collaborators
//! (quote endpoint and pricing engine). [`ApiError`] is what handlers return
//! to HTTP clients.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;


/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

/// Failure of an outbound call to the quote endpoint or the pricing engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpstreamError {
    /// Connection failure or non-success status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Deadline elapsed before a response was received.
    #[error("Upstream call timed out")]
    Timeout,

    /// The upstream has no data for the requested ticker.
    #[error("No data found for ticker {0}")]
    NotFound(String),

    /// Malformed response body.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Short machine-readable class name, attached to failure log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout => "timeout",
            Self::NotFound(_) => "not_found",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for UpstreamError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        UpstreamError::Timeout
    }
}

/// Errors a handler returns instead of a result table.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
