//! Application state management.

use crate::analysis::ScenarioAggregator;
use crate::config::Config;
use crate::error::UpstreamError;
use crate::market::{QuoteCache, QuoteSource};
use crate::pricing::{HttpPricingEngine, PricingEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Scenario aggregator; owns the process-wide quote source.
    pub aggregator: ScenarioAggregator,
    /// Deadline budget for one analysis request.
    pub request_timeout: Duration,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    /// Creates the production state: live quote feed, HTTP pricing engine.
    ///
    /// # Errors
    /// Returns error if an outbound HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, UpstreamError> {
        let cache = Arc::new(QuoteCache::new(config.market.cache_ttl()));
        let quotes = QuoteSource::from_config(&config.market, cache)?;
        let engine: Arc<dyn PricingEngine> = Arc::new(HttpPricingEngine::new(&config.pricing)?);

        info!(
            "Quote cache TTL {:?}, pricing engine at {}",
            config.market.cache_ttl(),
            config.pricing.endpoint
        );

        Ok(Self::with_components(config, quotes, engine))
    }

    /// Creates state around caller-supplied collaborators.
    #[must_use]
    pub fn with_components(
        config: Config,
        quotes: QuoteSource,
        engine: Arc<dyn PricingEngine>,
    ) -> Self {
        let aggregator =
            ScenarioAggregator::from_config(quotes, engine, &config.market, &config.analysis);

        Self {
            aggregator,
            request_timeout: config.analysis.request_timeout(),
            config,
        }
    }
}
