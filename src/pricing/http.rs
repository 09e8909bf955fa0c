//! JSON-over-HTTP client for the pricing engine.

use crate::config::PricingConfig;
use crate::error::UpstreamError;
use crate::pricing::{PricingEngine, ScenarioRequest, ScenarioResponse};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Pricing engine reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPricingEngine {
    client: Client,
    endpoint: String,
}

impl HttpPricingEngine {
    /// Creates a client for the engine described by `config`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &PricingConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the scenario pricing method.
    #[must_use]
    pub fn scenario_url(&self) -> String {
        format!("{}/v1/scenario", self.endpoint)
    }
}

#[async_trait]
impl PricingEngine for HttpPricingEngine {
    async fn price_scenario(&self, request: &ScenarioRequest) -> Result<ScenarioResponse, UpstreamError> {
        debug!(
            "Pricing {} legs at shock {}",
            request.legs.len(),
            request.scenario_pct_change
        );

        let resp = self
            .client
            .post(self.scenario_url())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Transport(format!(
                "pricing engine returned status {}: {}",
                status, text
            )));
        }

        Ok(resp.json().await?)
    }
}
