//! Request and response types for the gateway API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;


/// Option type of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    /// Call option.
    Call,
    /// Put option.
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

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

// ============================================================================
// Portfolio Analysis
// ============================================================================

/// One option contract within a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Underlying ticker.
    pub ticker: String,
    /// Quantity applied to every leg.
    pub quantity: f64,
    /// Beta relative to the market.
    pub beta: f64,
    /// Option legs.
    pub legs: Vec<Leg>,
}

/// Portfolio analysis request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Positions to analyze.
    pub positions: Vec<Position>,
    /// Market shocks as signed fractions.
    pub scenario_range: Vec<f64>,
    /// Volatility override; `0` lets the gateway choose.
    pub volatility: f64,
}

/// Scenario P&L and Greeks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Profit and loss.
    pub pnl: f64,
    /// Delta.
    pub delta: f64,
    /// Gamma.
    pub gamma: f64,
    /// Theta.
    pub theta: f64,
}

/// Metrics per ticker and shock key.
pub type ResultTable = BTreeMap<String, BTreeMap<String, Metrics>>;

/// One printed row of a risk report.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRow {
    /// Shock key as returned by the gateway, e.g. `-0.05`.
    pub scenario: String,
    /// Metrics for that shock.
    pub metrics: Metrics,
}

/// Analysis result plus the gateway's partial-failure count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResponse {
    /// Per-ticker, per-shock metrics.
    pub results: ResultTable,
    /// Number of lookups or pricing calls the gateway had to skip.
    pub partial_failures: usize,
}

impl AnalysisResponse {
    /// Rows for `ticker`, ordered by numeric shock value.
    ///
    /// Keys that do not parse as numbers sort last, in key order.
    #[must_use]
    pub fn rows(&self, ticker: &str) -> Vec<ScenarioRow> {
        let Some(cells) = self.results.get(ticker) else {
            return Vec::new();
        };

        let mut rows: Vec<ScenarioRow> = cells
            .iter()
            .map(|(scenario, metrics)| ScenarioRow {
                scenario: scenario.clone(),
                metrics: *metrics,
            })
            .collect();

        rows.sort_by(|a, b| {
            let x = a.scenario.parse::<f64>().unwrap_or(f64::INFINITY);
            let y = b.scenario.parse::<f64>().unwrap_or(f64::INFINITY);
            x.total_cmp(&y).then_with(|| a.scenario.cmp(&b.scenario))
        });
        rows
    }

    /// Returns `true` if the gateway skipped nothing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.partial_failures == 0
    }
}
