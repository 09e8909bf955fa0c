//! Integration tests for the Scenario Gateway API.
//!
//! These tests require the gateway to be running. Configure the server URL
//! via the `API_BASE_URL` environment variable (default: `http://localhost:3000`).

use gateway_client::{AnalyzeRequest, ClientConfig, GatewayClient, Leg, OptionType, Position};
use std::time::Duration;

/// Gets the API base URL from environment or uses default.
#[must_use]
pub fn get_api_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Creates a test client configured for the API.
///
/// # Errors
/// Returns error if client creation fails.
pub fn create_test_client() -> Result<GatewayClient, gateway_client::Error> {
    GatewayClient::new(ClientConfig {
        base_url: get_api_url(),
        timeout: Duration::from_secs(30),
    })
}

/// Single-leg call position.
#[must_use]
pub fn call_position(ticker: &str, quantity: f64, strike: f64, expiry: &str) -> Position {
    Position {
        ticker: ticker.to_string(),
        quantity,
        beta: 1.0,
        legs: vec![Leg {
            option_type: OptionType::Call,
            strike,
            expiry: expiry.to_string(),
        }],
    }
}

/// Request over `positions` with the standard five-point shock ladder.
#[must_use]
pub fn ladder_request(positions: Vec<Position>) -> AnalyzeRequest {
    AnalyzeRequest {
        positions,
        scenario_range: vec![-0.10, -0.05, 0.0, 0.05, 0.10],
        volatility: 0.0,
    }
}
