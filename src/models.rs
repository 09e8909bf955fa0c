//! Request and response models for the REST API.

use crate::error::ApiError;
use crate::pricing::LegType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;
use utoipa::ToSchema;

/// Option type token accepted in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OptionType {
    /// Call option.
    #[serde(rename = "CALL", alias = "call", alias = "Call")]
    Call,
    /// Put option.
    #[serde(rename = "PUT", alias = "put", alias = "Put")]
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

impl From<OptionType> for LegType {
    fn from(value: OptionType) -> Self {
        match value {
            OptionType::Call => LegType::Call,
            OptionType::Put => LegType::Put,
        }
    }
}

// ============================================================================
// Portfolio Analysis
// ============================================================================

/// One option contract within a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Leg {
    /// Call or put.
    #[serde(rename = "type")]
    pub option_type: OptionType,
    /// Strike price.
    pub strike: f64,
    /// Expiry date, `YYYY-MM-DD`.
    pub expiry: String,
}

/// A holding in one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    /// Underlying ticker.
    pub ticker: String,
    /// Quantity applied to every leg.
    pub quantity: f64,
    /// Beta of the ticker relative to the market.
    pub beta: f64,
    /// Option legs.
    #[serde(default)]
    pub legs: Vec<Leg>,
}

/// Portfolio analysis request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Positions to analyze.
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Market shocks, as signed fractions (e.g. `-0.10`).
    #[serde(default)]
    pub scenario_range: Vec<f64>,
    /// Volatility override for every ticker; `0` means use the market default.
    #[serde(default)]
    pub volatility: f64,
}

impl AnalyzeRequest {
    /// Rejects values the pricing engine cannot work with.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidRequest`] describing the first offending field.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(ApiError::InvalidRequest(
                "volatility must be a non-negative number".to_string(),
            ));
        }
        if let Some(shock) = self.scenario_range.iter().find(|s| !s.is_finite()) {
            return Err(ApiError::InvalidRequest(format!(
                "scenario_range contains a non-finite value: {}",
                shock
            )));
        }

        for (i, position) in self.positions.iter().enumerate() {
            if !position.quantity.is_finite() || !position.beta.is_finite() {
                return Err(ApiError::InvalidRequest(format!(
                    "positions[{}] ({}) has a non-finite quantity or beta",
                    i, position.ticker
                )));
            }
            if position.legs.iter().any(|leg| !leg.strike.is_finite()) {
                return Err(ApiError::InvalidRequest(format!(
                    "positions[{}] ({}) has a non-finite strike",
                    i, position.ticker
                )));
            }
        }

        Ok(())
    }
}

/// Scenario P&L and Greeks for one (ticker, shock) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Metrics {
    /// Profit and loss under the shock.
    pub pnl: f64,
    /// Delta.
    pub delta: f64,
    /// Gamma.
    pub gamma: f64,
    /// Theta.
    pub theta: f64,
}

impl AddAssign for Metrics {
    fn add_assign(&mut self, rhs: Self) {
        self.pnl += rhs.pnl;
        self.delta += rhs.delta;
        self.gamma += rhs.gamma;
        self.theta += rhs.theta;
    }
}

/// Metrics per shock key, for one ticker.
pub type ScenarioMetrics = BTreeMap<String, Metrics>;

/// Metrics per ticker and shock key.
pub type ResultTable = BTreeMap<String, ScenarioMetrics>;

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}
