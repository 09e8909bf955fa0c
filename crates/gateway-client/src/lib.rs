//! HTTP client library for the Scenario Gateway API.
//!
//! This crate provides a typed HTTP client for the gateway's portfolio
//! analysis endpoint, plus helpers to turn the result table into
//! numerically-ordered report rows.
//!
//! # Example
//!
//! ```no_run
//! use gateway_client::{AnalyzeRequest, ClientConfig, GatewayClient, Leg, OptionType, Position};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_client::Error> {
//!     let client = GatewayClient::new(ClientConfig {
//!         base_url: "http://localhost:3000".into(),
//!         timeout: Duration::from_secs(30),
//!     })?;
//!
//!     let request = AnalyzeRequest {
//!         positions: vec![Position {
//!             ticker: "AAPL".into(),
//!             quantity: 100.0,
//!             beta: 1.0,
//!             legs: vec![Leg {
//!                 option_type: OptionType::Call,
//!                 strike: 180.0,
//!                 expiry: "2026-06-19".into(),
//!             }],
//!         }],
//!         scenario_range: vec![-0.10, -0.05, 0.0, 0.05, 0.10],
//!         volatility: 0.3,
//!     };
//!
//!     let analysis = client.analyze_portfolio(&request).await?;
//!     for row in analysis.rows("AAPL") {
//!         println!("{:<12} | {:>12.2} | {:>10.2}", row.scenario, row.metrics.pnl, row.metrics.delta);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{ClientConfig, GatewayClient, PARTIAL_FAILURES_HEADER};
pub use error::Error;
pub use types::*;
