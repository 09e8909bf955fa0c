//! # Scenario Gateway - Portfolio Scenario Analysis Server
//!
//! A REST gateway that turns a multi-position option portfolio into the
//! smallest set of calls to a remote pricing engine, using cached market
//! data to avoid redundant quote lookups. Built with
//! [Axum](https://crates.io/crates/axum) for async HTTP handling and
//! [reqwest](https://crates.io/crates/reqwest) for outbound calls.
//!
//! ## Key Features
//!
//! - **TTL Quote Cache**: Spot prices, volatilities and the risk-free rate are
//!   cached per key with a configurable time-to-live, shared by all requests.
//!
//! - **Per-Request Deduplication**: Each ticker's market data is resolved once
//!   per request no matter how many positions hold it.
//!
//! - **Scenario Fan-Out**: One pricing call per position and shock; results
//!   are summed into a per-ticker, per-shock metrics table.
//!
//! - **Partial Results**: A failing ticker or scenario never fails the whole
//!   request; the response carries everything that could be computed.
//!
//! - **Deadlines**: Every outbound call is bounded by the request deadline.
//!
//! ## Architecture
//!
//! ```text
//! HTTP handler
//!   └── ScenarioAggregator            (request-scoped resolved market data)
//!         ├── QuoteSource             (process-wide QuoteCache)
//!         │     ├── ChartQuoteFeed    → spot price (HTTP)
//!         │     └── ConstantQuoteFeed → risk-free rate, volatility
//!         └── PricingEngine           → one call per (position, shock)
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`analysis`] | Scenario aggregator and result table construction |
//! | [`api`] | Route handlers and router configuration |
//! | [`config`] | TOML configuration |
//! | [`error`] | Upstream and API error types |
//! | [`market`] | Quote cache, quote feeds and quote source |
//! | [`models`] | Request/response DTOs with OpenAPI schemas |
//! | [`pricing`] | Pricing engine trait and HTTP client |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/analyze_portfolio` | Scenario analysis |
//! | POST | `/api/v1/analyze_portfolio` | Scenario analysis |
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/analyze_portfolio \
//!   -H "Content-Type: application/json" \
//!   -d '{"positions":[{"ticker":"AAPL","quantity":100,"beta":1.0,
//!        "legs":[{"type":"CALL","strike":180,"expiry":"2026-06-19"}]}],
//!        "scenario_range":[-0.10,0,0.10],"volatility":0}'
//! ```
//!
//! The response maps ticker → shock (two decimals) → `{pnl, delta, gamma, theta}`.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod pricing;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
