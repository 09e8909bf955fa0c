//! Uncached market-data feeds.
//!
//! A [`QuoteFeed`] produces one number for one [`Quantity`]. The live
//! [`ChartQuoteFeed`] calls the upstream chart endpoint; the
//! [`ConstantQuoteFeed`] stands in for quantities that have no real feed yet.

use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Cache key of the risk-free rate.
pub const RISK_FREE_RATE_KEY: &str = "risk_free_rate";

/// A market quantity the gateway needs for pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity<'a> {
    /// Latest regular-market price of a ticker.
    Spot(&'a str),
    /// Annualized volatility of a ticker.
    Volatility(&'a str),
    /// Annualized risk-free rate.
    RiskFreeRate,
}

impl Quantity<'_> {
    /// Cache key; each quantity type has its own namespace.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::Spot(ticker) => format!("spot:{}", ticker),
            Self::Volatility(ticker) => format!("vol:{}", ticker),
            Self::RiskFreeRate => RISK_FREE_RATE_KEY.to_string(),
        }
    }
}

impl std::fmt::Display for Quantity<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spot(ticker) => write!(f, "spot price of {}", ticker),
            Self::Volatility(ticker) => write!(f, "volatility of {}", ticker),
            Self::RiskFreeRate => write!(f, "risk-free rate"),
        }
    }
}

/// Source of raw (uncached) market quantities.
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// Fetches the current value of `quantity`.
    ///
    /// # Errors
    /// Returns an [`UpstreamError`] classifying the failure.
    async fn fetch(&self, quantity: Quantity<'_>) -> Result<f64, UpstreamError>;
}

/// Feed that always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstantQuoteFeed {
    value: f64,
}

impl ConstantQuoteFeed {
    /// Creates a feed returning `value` for every quantity.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self { value }
    }

}

#[async_trait]
impl QuoteFeed for ConstantQuoteFeed {
    async fn fetch(&self, _quantity: Quantity<'_>) -> Result<f64, UpstreamError> {
        Ok(self.value)
    }
}

/// Chart endpoint response envelope.
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

/// Live spot-price feed backed by a chart/quote HTTP endpoint.
#[derive(Debug, Clone)]
pub struct ChartQuoteFeed {
    client: Client,
    base_url: String,
}

impl ChartQuoteFeed {
    /// Creates a feed against `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Chart endpoint; the ticker is appended as a path segment.
    /// * `user_agent` - Client identifier sent with every request.
    /// * `timeout` - Outbound HTTP client timeout.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Transport`] if the URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        Url::parse(base_url).map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the request URL for `ticker`.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Transport`] if the base URL cannot carry path
    /// segments.
    pub fn chart_url(&self, ticker: &str) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| UpstreamError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| UpstreamError::Transport(format!("invalid base URL: {}", self.base_url)))?
            .push(ticker);
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", "1d");
        Ok(url)
    }

    async fn fetch_spot(&self, ticker: &str) -> Result<f64, UpstreamError> {
        let url = self.chart_url(ticker)?;
        debug!("Fetching spot price for {} from {}", ticker, url);

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Transport(format!(
                "quote endpoint returned status {}",
                status
            )));
        }

        let body = resp.bytes().await?;
        parse_chart_price(ticker, &body)
    }
}

#[async_trait]
impl QuoteFeed for ChartQuoteFeed {
    async fn fetch(&self, quantity: Quantity<'_>) -> Result<f64, UpstreamError> {
        match quantity {
            Quantity::Spot(ticker) => self.fetch_spot(ticker).await,
            other => Err(UpstreamError::NotFound(format!(
                "{} is not served by the chart feed",
                other
            ))),
        }
    }
}

/// Extracts the latest regular-market price from a chart response body.
///
/// # Errors
/// [`UpstreamError::Decode`] for malformed bodies, [`UpstreamError::NotFound`]
/// when the result series is absent or empty.
pub fn parse_chart_price(ticker: &str, body: &[u8]) -> Result<f64, UpstreamError> {
    let envelope: ChartEnvelope =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;

    let first = envelope
        .chart
        .result
        .and_then(|series| series.into_iter().next())
        .ok_or_else(|| UpstreamError::NotFound(ticker.to_string()))?;

    first.meta.regular_market_price.ok_or_else(|| {
        UpstreamError::Decode(format!("missing regularMarketPrice for {}", ticker))
    })
}
