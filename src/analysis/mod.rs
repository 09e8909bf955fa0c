//! Scenario fan-out and aggregation.
//!
//! For every position the aggregator resolves its ticker's market data once
//! per request, issues one pricing call per requested shock, and adds the
//! returned metrics into the `(ticker, shock)` cell of the result table.
//!
//! Failures never abort the request:
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Spot price lookup, blank ticker | Ticker skipped for the rest of the request |
//! | Risk-free rate / volatility lookup | Configured fallback used |
//! | Pricing call | That `(position, shock)` contributes nothing |

use crate::config::{AnalysisConfig, FailedTickerPolicy, MarketConfig};
use crate::error::UpstreamError;
use crate::market::QuoteSource;
use crate::models::{AnalyzeRequest, Metrics, Position, ResultTable};
use crate::pricing::{OptionLeg, PricingEngine, ScenarioRequest};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Formats a shock as its result-table key, e.g. `-0.10`.
///
/// Negative zero is written as `0.00`.
#[must_use]
pub fn format_shock(shock: f64) -> String {
    let key = format!("{:.2}", shock);
    if key == "-0.00" {
        "0.00".to_string()
    } else {
        key
    }
}

/// Market data for one ticker, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerMarketData {
    /// Spot price.
    pub spot: f64,
    /// Annualized volatility.
    pub volatility: f64,
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
}

/// Stage at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Market data resolution for a ticker.
    MarketData,
    /// Pricing call for a (position, shock) pair.
    Pricing,
}

/// A failure recorded while processing a request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    /// Where it happened.
    pub stage: FailureStage,
    /// Ticker involved.
    pub ticker: String,
    /// Shock key, for pricing failures.
    pub shock: Option<String>,
    /// What went wrong.
    pub error: UpstreamError,
}

/// Result of one analysis request.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Per-ticker, per-shock metrics.
    pub results: ResultTable,
    /// Everything that was skipped, in processing order.
    pub failures: Vec<AnalysisFailure>,
    /// Number of pricing calls issued.
    pub pricing_calls: usize,
}

/// Fallback values used when a best-effort lookup fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketDefaults {
    /// Risk-free rate fallback.
    pub risk_free_rate: f64,
    /// Volatility fallback.
    pub volatility: f64,
}

impl From<&MarketConfig> for MarketDefaults {
    fn from(config: &MarketConfig) -> Self {
        Self {
            risk_free_rate: config.risk_free_rate,
            volatility: config.default_volatility,
        }
    }
}

/// Request-scoped memo of resolved market data. Failed tickers are
/// remembered too so they are not retried within the same request.
#[derive(Debug, Default)]
struct ResolvedMarket {
    tickers: HashMap<String, Option<TickerMarketData>>,
}

impl ResolvedMarket {
    fn get(&self, ticker: &str) -> Option<Option<TickerMarketData>> {
        self.tickers.get(ticker).copied()
    }

    fn insert(&mut self, ticker: &str, data: Option<TickerMarketData>) {
        self.tickers.insert(ticker.to_string(), data);
    }

    fn failed(&self) -> impl Iterator<Item = &str> {
        self.tickers
            .iter()
            .filter(|(_, data)| data.is_none())
            .map(|(ticker, _)| ticker.as_str())
    }
}

/// Runs `fut`, failing with [`UpstreamError::Timeout`] once `deadline` passes.
async fn within<T, F>(deadline: Instant, fut: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    tokio::time::timeout_at(deadline, fut).await?
}

/// Turns portfolio requests into pricing calls and aggregates the results.
#[derive(Clone)]
pub struct ScenarioAggregator {
    quotes: QuoteSource,
    engine: Arc<dyn PricingEngine>,
    defaults: MarketDefaults,
    policy: FailedTickerPolicy,
}

impl ScenarioAggregator {
    /// Creates an aggregator.
    #[must_use]
    pub fn new(
        quotes: QuoteSource,
        engine: Arc<dyn PricingEngine>,
        defaults: MarketDefaults,
        policy: FailedTickerPolicy,
    ) -> Self {
        Self {
            quotes,
            engine,
            defaults,
            policy,
        }
    }

    /// Creates an aggregator with defaults and policy taken from configuration.
    #[must_use]
    pub fn from_config(
        quotes: QuoteSource,
        engine: Arc<dyn PricingEngine>,
        market: &MarketConfig,
        analysis: &AnalysisConfig,
    ) -> Self {
        Self::new(
            quotes,
            engine,
            MarketDefaults::from(market),
            analysis.failed_ticker_policy,
        )
    }

    /// The quote source used for market data.
    #[must_use]
    pub fn quotes(&self) -> &QuoteSource {
        &self.quotes
    }

    /// Analyzes `request`; every outbound call must finish before `deadline`.
    ///
    /// Positions and shocks are processed sequentially. The returned table
    /// always holds whatever could be computed.
    pub async fn analyze(&self, request: &AnalyzeRequest, deadline: Instant) -> AnalysisOutcome {
        let mut outcome = AnalysisOutcome::default();
        let mut resolved = ResolvedMarket::default();

        for position in &request.positions {
            outcome
                .results
                .entry(position.ticker.clone())
                .or_default();

            let data = match resolved.get(&position.ticker) {
                Some(Some(data)) => data,
                Some(None) => {
                    debug!(
                        "Skipping position on {}: market data unavailable",
                        position.ticker
                    );
                    continue;
                }
                None => match self
                    .resolve(&position.ticker, request.volatility, deadline)
                    .await
                {
                    Ok(data) => {
                        resolved.insert(&position.ticker, Some(data));
                        data
                    }
                    Err(error) => {
                        warn!(
                            kind = error.kind(),
                            "Error getting spot price for {}: {}",
                            position.ticker,
                            error
                        );
                        resolved.insert(&position.ticker, None);
                        outcome.failures.push(AnalysisFailure {
                            stage: FailureStage::MarketData,
                            ticker: position.ticker.clone(),
                            shock: None,
                            error,
                        });
                        continue;
                    }
                },
            };

            for &shock in &request.scenario_range {
                self.price_position(position, &data, shock, deadline, &mut outcome)
                    .await;
            }
        }

        if self.policy == FailedTickerPolicy::Omit {
            for ticker in resolved.failed() {
                if outcome.results.get(ticker).is_some_and(|cells| cells.is_empty()) {
                    outcome.results.remove(ticker);
                }
            }
        }

        info!(
            "Analyzed {} positions over {} shocks: {} pricing calls, {} failures",
            request.positions.len(),
            request.scenario_range.len(),
            outcome.pricing_calls,
            outcome.failures.len()
        );

        outcome
    }

    /// Resolves spot (required), rate and volatility (best effort) for `ticker`.
    ///
    /// A blank ticker has no market data and is reported as not found
    /// without touching the quote source.
    async fn resolve(
        &self,
        ticker: &str,
        volatility_override: f64,
        deadline: Instant,
    ) -> Result<TickerMarketData, UpstreamError> {
        if ticker.trim().is_empty() {
            return Err(UpstreamError::NotFound(ticker.to_string()));
        }

        let spot = within(deadline, self.quotes.spot_price(ticker)).await?;

        let risk_free_rate = match within(deadline, self.quotes.risk_free_rate()).await {
            Ok(rate) => rate,
            Err(error) => {
                warn!(
                    kind = error.kind(),
                    "Risk-free rate unavailable, using fallback: {}",
                    error
                );
                self.defaults.risk_free_rate
            }
        };

        let volatility = if volatility_override != 0.0 {
            volatility_override
        } else {
            match within(deadline, self.quotes.volatility(ticker)).await {
                Ok(vol) => vol,
                Err(error) => {
                    warn!(
                        kind = error.kind(),
                        "Volatility for {} unavailable, using fallback: {}",
                        ticker,
                        error
                    );
                    self.defaults.volatility
                }
            }
        };

        debug!(
            "Resolved {}: spot={} vol={} rate={}",
            ticker, spot, volatility, risk_free_rate
        );

        Ok(TickerMarketData {
            spot,
            volatility,
            risk_free_rate,
        })
    }

    async fn price_position(
        &self,
        position: &Position,
        data: &TickerMarketData,
        shock: f64,
        deadline: Instant,
        outcome: &mut AnalysisOutcome,
    ) {
        let request = scenario_request(position, data, shock);
        outcome.pricing_calls += 1;

        let shock_key = format_shock(shock);
        match within(deadline, self.engine.price_scenario(&request)).await {
            Ok(resp) => {
                let cell = outcome
                    .results
                    .entry(position.ticker.clone())
                    .or_default()
                    .entry(shock_key)
                    .or_default();
                *cell += Metrics {
                    pnl: resp.scenario_pnl,
                    delta: resp.scenario_delta,
                    gamma: resp.scenario_gamma,
                    theta: resp.scenario_theta,
                };
            }
            Err(error) => {
                warn!(
                    kind = error.kind(),
                    "Pricing error for {} scenario {}: {}",
                    position.ticker,
                    shock_key,
                    error
                );
                outcome.failures.push(AnalysisFailure {
                    stage: FailureStage::Pricing,
                    ticker: position.ticker.clone(),
                    shock: Some(shock_key),
                    error,
                });
            }
        }
    }
}

impl std::fmt::Debug for ScenarioAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioAggregator")
            .field("quotes", &self.quotes)
            .field("defaults", &self.defaults)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Builds the pricing request for one position at one shock. Leg quantity
/// comes from the position.
#[must_use]
pub fn scenario_request(position: &Position, data: &TickerMarketData, shock: f64) -> ScenarioRequest {
    ScenarioRequest {
        spot_price: data.spot,
        risk_free_rate: data.risk_free_rate,
        volatility: data.volatility,
        scenario_pct_change: shock,
        beta: position.beta,
        legs: position
            .legs
            .iter()
            .map(|leg| OptionLeg {
                leg_type: leg.option_type.into(),
                strike: leg.strike,
                expiry: leg.expiry.clone(),
                quantity: position.quantity,
            })
            .collect(),
    }
}
