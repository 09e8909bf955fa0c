//! Cached quote source used by the scenario aggregator.

use crate::config::MarketConfig;
use crate::error::UpstreamError;
use crate::market::cache::QuoteCache;
use crate::market::feed::{ChartQuoteFeed, ConstantQuoteFeed, Quantity, QuoteFeed};
use std::sync::Arc;
use tracing::debug;

/// Spot price, risk-free rate and volatility, each cached independently.
///
/// The cache is injected so that several sources (or tests) can decide
/// whether they share it. Lookups never hold the cache lock across the
/// outbound fetch; a fetch that fails or is cancelled leaves the cache
/// untouched.
#[derive(Clone)]
pub struct QuoteSource {
    cache: Arc<QuoteCache>,
    spot: Arc<dyn QuoteFeed>,
    rate: Arc<dyn QuoteFeed>,
    volatility: Arc<dyn QuoteFeed>,
}

impl QuoteSource {
    /// Creates a source from explicit feeds.
    #[must_use]
    pub fn new(
        cache: Arc<QuoteCache>,
        spot: Arc<dyn QuoteFeed>,
        rate: Arc<dyn QuoteFeed>,
        volatility: Arc<dyn QuoteFeed>,
    ) -> Self {
        Self {
            cache,
            spot,
            rate,
            volatility,
        }
    }

    /// Creates the production source: live chart feed for spot prices,
    /// constant fallbacks for rate and volatility.
    ///
    /// # Errors
    /// Returns error if the chart feed cannot be built.
    pub fn from_config(config: &MarketConfig, cache: Arc<QuoteCache>) -> Result<Self, UpstreamError> {
        let spot = ChartQuoteFeed::new(
            &config.quote_base_url,
            &config.user_agent,
            config.http_timeout(),
        )?;

        Ok(Self::new(
            cache,
            Arc::new(spot),
            Arc::new(ConstantQuoteFeed::new(config.risk_free_rate)),
            Arc::new(ConstantQuoteFeed::new(config.default_volatility)),
        ))
    }

    /// The cache backing this source.
    #[must_use]
    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    /// Latest spot price of `ticker`.
    ///
    /// # Errors
    /// Propagates the spot feed's error; nothing is cached on failure.
    pub async fn spot_price(&self, ticker: &str) -> Result<f64, UpstreamError> {
        self.cached(self.spot.as_ref(), Quantity::Spot(ticker)).await
    }

    /// Annualized risk-free rate.
    ///
    /// # Errors
    /// Propagates the rate feed's error.
    pub async fn risk_free_rate(&self) -> Result<f64, UpstreamError> {
        self.cached(self.rate.as_ref(), Quantity::RiskFreeRate).await
    }

    /// Annualized volatility of `ticker`.
    ///
    /// # Errors
    /// Propagates the volatility feed's error.
    pub async fn volatility(&self, ticker: &str) -> Result<f64, UpstreamError> {
        self.cached(self.volatility.as_ref(), Quantity::Volatility(ticker))
            .await
    }

    async fn cached(&self, feed: &dyn QuoteFeed, quantity: Quantity<'_>) -> Result<f64, UpstreamError> {
        let key = quantity.cache_key();
        if let Some(value) = self.cache.get(&key) {
            return Ok(value);
        }

        let value = feed.fetch(quantity).await?;
        debug!("Fetched {}: {}", quantity, value);
        self.cache.set(key, value);
        Ok(value)
    }
}

impl std::fmt::Debug for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteSource")
            .field("cache_entries", &self.cache.len())
            .field("ttl", &self.cache.ttl())
            .finish_non_exhaustive()
    }
}
