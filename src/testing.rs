//! In-process fakes for the outbound collaborators, shared by unit tests.

use crate::error::UpstreamError;
use crate::market::{Quantity, QuoteCache, QuoteFeed, QuoteSource};
use crate::models::Metrics;
use crate::pricing::{PricingEngine, ScenarioRequest, ScenarioResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

/// Spot feed with scripted per-ticker answers and a call counter.
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    answers: HashMap<String, Result<f64, UpstreamError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, ticker: &str, price: f64) -> Self {
        self.answers.insert(ticker.to_string(), Ok(price));
        self
    }

    pub fn with_error(mut self, ticker: &str, error: UpstreamError) -> Self {
        self.answers.insert(ticker.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteFeed for ScriptedFeed {
    async fn fetch(&self, quantity: Quantity<'_>) -> Result<f64, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let ticker = match quantity {
            Quantity::Spot(ticker) | Quantity::Volatility(ticker) => ticker,
            Quantity::RiskFreeRate => "",
        };
        self.answers
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| Err(UpstreamError::NotFound(ticker.to_string())))
    }
}

/// Counts calls and returns a fixed value.
#[derive(Debug)]
pub struct CountingConstant {
    value: f64,
    calls: AtomicUsize,
}

impl CountingConstant {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteFeed for CountingConstant {
    async fn fetch(&self, _quantity: Quantity<'_>) -> Result<f64, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value)
    }
}

/// Always fails with the given error.
#[derive(Debug)]
pub struct FailingFeed(pub UpstreamError);

#[async_trait]
impl QuoteFeed for FailingFeed {
    async fn fetch(&self, _quantity: Quantity<'_>) -> Result<f64, UpstreamError> {
        Err(self.0.clone())
    }
}

/// Builds a source over `spot` with counting constant rate and volatility feeds.
pub fn source_with(
    spot: Arc<ScriptedFeed>,
    ttl: Duration,
) -> (QuoteSource, Arc<CountingConstant>, Arc<CountingConstant>) {
    let rate = Arc::new(CountingConstant::new(0.0425));
    let vol = Arc::new(CountingConstant::new(0.30));
    let source = QuoteSource::new(
        Arc::new(QuoteCache::new(ttl)),
        spot,
        Arc::clone(&rate) as Arc<dyn QuoteFeed>,
        Arc::clone(&vol) as Arc<dyn QuoteFeed>,
    );
    (source, rate, vol)
}

/// Pricing engine that records every request and answers with a function of it.
pub struct RecordingEngine {
    requests: Mutex<Vec<ScenarioRequest>>,
    respond: Box<dyn Fn(&ScenarioRequest) -> Result<ScenarioResponse, UpstreamError> + Send + Sync>,
}

impl RecordingEngine {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&ScenarioRequest) -> Result<ScenarioResponse, UpstreamError> + Send + Sync + 'static,
    {
        Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Engine whose P&L is `quantity * strike * shock` summed over legs, with
    /// delta/gamma/theta derived from the same sum so cells are easy to predict.
    pub fn linear() -> Self {
        Self::new(|req| Ok(linear_response(req)))
    }

    pub fn requests(&self) -> Vec<ScenarioRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

pub fn linear_response(req: &ScenarioRequest) -> ScenarioResponse {
    let notional: f64 = req.legs.iter().map(|leg| leg.quantity * leg.strike).sum();
    ScenarioResponse {
        scenario_pnl: notional * req.scenario_pct_change,
        scenario_delta: notional / 100.0,
        scenario_gamma: notional / 1000.0,
        scenario_theta: -notional / 10_000.0,
    }
}

pub fn metrics_of(resp: &ScenarioResponse) -> Metrics {
    Metrics {
        pnl: resp.scenario_pnl,
        delta: resp.scenario_delta,
        gamma: resp.scenario_gamma,
        theta: resp.scenario_theta,
    }
}

#[async_trait]
impl PricingEngine for RecordingEngine {
    async fn price_scenario(&self, request: &ScenarioRequest) -> Result<ScenarioResponse, UpstreamError> {
        self.requests.lock().push(request.clone());
        (self.respond)(request)
    }
}

/// Serves `app` on an ephemeral loopback port; returns `http://127.0.0.1:<port>`.
pub async fn serve(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
