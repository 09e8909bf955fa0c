//! Remote pricing engine boundary.
//!
//! The engine takes a market context, a set of option legs and one price
//! shock, and returns the scenario P&L and Greeks for those legs. How it
//! computes them is its own business; the gateway only needs
//! [`PricingEngine::price_scenario`].

mod http;

pub use http::HttpPricingEngine;

use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Option leg type as enumerated by the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegType {
    /// Call option.
    Call,
    /// Put option.
    Put,
}

impl std::fmt::Display for LegType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// One leg in a pricing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    /// Call or put.
    #[serde(rename = "type")]
    pub leg_type: LegType,
    /// Strike price.
    pub strike: f64,
    /// Expiry date, `YYYY-MM-DD`.
    pub expiry: String,
    /// Contract quantity (taken from the owning position).
    pub quantity: f64,
}

/// Scenario pricing request for one position at one shock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    /// Current spot price of the underlying.
    pub spot_price: f64,
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
    /// Annualized volatility.
    pub volatility: f64,
    /// Fractional market move (e.g. `-0.10`).
    pub scenario_pct_change: f64,
    /// Sensitivity of the underlying to the market move.
    pub beta: f64,
    /// Legs to price.
    pub legs: Vec<OptionLeg>,
}

/// Scenario P&L and Greeks returned by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResponse {
    /// Change in value under the shock.
    pub scenario_pnl: f64,
    /// Aggregate delta.
    pub scenario_delta: f64,
    /// Aggregate gamma.
    pub scenario_gamma: f64,
    /// Aggregate theta.
    pub scenario_theta: f64,
}

/// Remote scenario pricing capability.
#[async_trait]
pub trait PricingEngine: Send + Sync {
    /// Prices `request`.
    ///
    /// # Errors
    /// Returns an [`UpstreamError`] classifying the failure.
    async fn price_scenario(&self, request: &ScenarioRequest) -> Result<ScenarioResponse, UpstreamError>;
}
