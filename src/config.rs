//! Configuration module for loading and parsing TOML configuration files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Longest accepted quote cache TTL, in seconds.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Longest accepted timeout or deadline, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3_600;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Market data configuration.
    pub market: MarketConfig,
    /// Pricing engine configuration.
    pub pricing: PricingConfig,
    /// Scenario analysis configuration.
    pub analysis: AnalysisConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Market data configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Time-to-live of cached quotes, in seconds.
    pub cache_ttl_secs: u64,
    /// Timeout of the outbound quote HTTP client, in seconds.
    pub http_timeout_secs: u64,
    /// Base URL of the chart endpoint; the ticker is appended as a path segment.
    pub quote_base_url: String,
    /// Client identifier sent as `User-Agent`.
    pub user_agent: String,
    /// Fallback annualized risk-free rate.
    pub risk_free_rate: f64,
    /// Fallback annualized volatility.
    pub default_volatility: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            http_timeout_secs: 10,
            quote_base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            user_agent: concat!("scenario-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
            risk_free_rate: 0.0425,
            default_volatility: 0.30,
        }
    }
}

impl MarketConfig {
    /// Cache TTL as a [`Duration`].
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// HTTP client timeout as a [`Duration`].
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Pricing engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Base address of the pricing engine.
    pub endpoint: String,
    /// Per-call timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://cpp_engine:50051".to_string(),
            timeout_secs: 10,
        }
    }
}

impl PricingConfig {
    /// Per-call timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What to do with a ticker whose market data could not be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedTickerPolicy {
    /// Keep the ticker in the result table with no scenario cells.
    #[default]
    KeepEmpty,
    /// Leave the ticker out of the result table.
    Omit,
}

/// Scenario analysis configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Deadline for a whole analysis request, in seconds.
    pub request_timeout_secs: u64,
    /// Handling of tickers whose market data lookup failed.
    pub failed_ticker_policy: FailedTickerPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            failed_ticker_policy: FailedTickerPolicy::KeepEmpty,
        }
    }
}

impl AnalysisConfig {
    /// Request deadline budget as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_bounded(
            "market.cache_ttl_secs",
            self.market.cache_ttl_secs,
            MAX_CACHE_TTL_SECS,
        )?;
        check_bounded(
            "market.http_timeout_secs",
            self.market.http_timeout_secs,
            MAX_TIMEOUT_SECS,
        )?;
        if self.market.quote_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "market.quote_base_url cannot be empty".to_string(),
            ));
        }
        if !self.market.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidValue(
                "market.risk_free_rate must be finite".to_string(),
            ));
        }
        if !(self.market.default_volatility > 0.0 && self.market.default_volatility.is_finite()) {
            return Err(ConfigError::InvalidValue(
                "market.default_volatility must be positive".to_string(),
            ));
        }
        if self.pricing.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "pricing.endpoint cannot be empty".to_string(),
            ));
        }
        check_bounded(
            "pricing.timeout_secs",
            self.pricing.timeout_secs,
            MAX_TIMEOUT_SECS,
        )?;
        check_bounded(
            "analysis.request_timeout_secs",
            self.analysis.request_timeout_secs,
            MAX_TIMEOUT_SECS,
        )?;

        Ok(())
    }
}

fn check_bounded(field: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be positive",
            field
        )));
    }
    if value > max {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be at most {}",
            field, max
        )));
    }
    Ok(())
}
