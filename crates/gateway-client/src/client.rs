//! HTTP client for the gateway API.

use crate::error::Error;
use crate::types::*;
use reqwest::Client;
use std::time::Duration;
use url::Url;


/// Response header carrying the gateway's partial-failure count.
pub const PARTIAL_FAILURES_HEADER: &str = "x-partial-failures";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:3000").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the Scenario Gateway API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        Url::parse(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Performs a health check.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn health_check(&self) -> Result<HealthResponse, Error> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Portfolio Analysis
    // ========================================================================

    /// Runs a portfolio scenario analysis.
    ///
    /// # Errors
    /// Returns error if the request fails or the gateway rejects it.
    pub async fn analyze_portfolio(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisResponse, Error> {
        let url = format!("{}/api/analyze_portfolio", self.base_url);
        let resp = self.client.post(&url).json(request).send().await?;

        let partial_failures = resp
            .headers()
            .get(PARTIAL_FAILURES_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let results: ResultTable = self.handle_response(resp).await?;
        Ok(AnalysisResponse {
            results,
            partial_failures,
        })
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            let bytes = resp.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Error::from_status(status.as_u16(), body))
        }
    }
}
