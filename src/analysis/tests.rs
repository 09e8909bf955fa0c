//! Unit tests for the scenario aggregator.

use super::*;
use crate::models::{Leg, OptionType};
use crate::pricing::{LegType, ScenarioResponse};
use crate::testing::{RecordingEngine, ScriptedFeed, linear_response, metrics_of, source_with};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(60);

fn defaults() -> MarketDefaults {
    MarketDefaults {
        risk_free_rate: 0.0425,
        volatility: 0.30,
    }
}

fn call(strike: f64) -> Leg {
    Leg {
        option_type: OptionType::Call,
        strike,
        expiry: "2025-01-01".to_string(),
    }
}

fn put(strike: f64) -> Leg {
    Leg {
        option_type: OptionType::Put,
        strike,
        expiry: "2025-06-20".to_string(),
    }
}

fn position(ticker: &str, quantity: f64, legs: Vec<Leg>) -> Position {
    Position {
        ticker: ticker.to_string(),
        quantity,
        beta: 1.0,
        legs,
    }
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

struct Harness {
    aggregator: ScenarioAggregator,
    feed: Arc<ScriptedFeed>,
    engine: Arc<RecordingEngine>,
}

fn harness(feed: ScriptedFeed, engine: RecordingEngine, policy: FailedTickerPolicy) -> Harness {
    let feed = Arc::new(feed);
    let engine = Arc::new(engine);
    let (source, _, _) = source_with(Arc::clone(&feed), TTL);
    let aggregator = ScenarioAggregator::new(
        source,
        Arc::clone(&engine) as Arc<dyn PricingEngine>,
        defaults(),
        policy,
    );
    Harness {
        aggregator,
        feed,
        engine,
    }
}

// ============================================================================
// Shock Formatting Tests
// ============================================================================

#[test]
fn test_format_shock() {
    assert_eq!(format_shock(-0.10), "-0.10");
    assert_eq!(format_shock(0.0), "0.00");
    assert_eq!(format_shock(-0.0), "0.00");
    assert_eq!(format_shock(0.05), "0.05");
    assert_eq!(format_shock(0.1), "0.10");
    assert_eq!(format_shock(-0.25), "-0.25");
}

// ============================================================================
// Request Building Tests
// ============================================================================

#[test]
fn test_scenario_request_uses_position_quantity() {
    let pos = Position {
        ticker: "XYZ".to_string(),
        quantity: 25.0,
        beta: 1.4,
        legs: vec![call(100.0), put(90.0)],
    };
    let data = TickerMarketData {
        spot: 101.0,
        volatility: 0.25,
        risk_free_rate: 0.04,
    };

    let req = scenario_request(&pos, &data, -0.05);
    assert_eq!(req.spot_price, 101.0);
    assert_eq!(req.volatility, 0.25);
    assert_eq!(req.risk_free_rate, 0.04);
    assert_eq!(req.scenario_pct_change, -0.05);
    assert_eq!(req.beta, 1.4);
    assert_eq!(req.legs.len(), 2);
    assert_eq!(req.legs[0].leg_type, LegType::Call);
    assert_eq!(req.legs[1].leg_type, LegType::Put);
    assert_eq!(req.legs[1].expiry, "2025-06-20");
    assert!(req.legs.iter().all(|leg| leg.quantity == 25.0));
}

// ============================================================================
// Aggregation Tests
// ============================================================================

#[tokio::test]
async fn test_single_position_two_shocks() {
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![position("XYZ", 10.0, vec![call(100.0)])],
        scenario_range: vec![-0.10, 0.10],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(h.feed.calls(), 1);
    assert_eq!(h.engine.calls(), 2);
    assert_eq!(outcome.pricing_calls, 2);
    assert!(outcome.failures.is_empty());

    let cells = &outcome.results["XYZ"];
    assert_eq!(cells.len(), 2);
    assert!(cells.contains_key("-0.10"));
    assert!(cells.contains_key("0.10"));
    assert_eq!(cells["-0.10"].pnl, -100.0);
    assert_eq!(cells["0.10"].pnl, 100.0);

    // Default volatility and rate flow into every call.
    for req in h.engine.requests() {
        assert_eq!(req.spot_price, 100.0);
        assert_eq!(req.volatility, 0.30);
        assert_eq!(req.risk_free_rate, 0.0425);
    }
}

#[tokio::test]
async fn test_same_ticker_positions_sum_into_one_cell() {
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let first = position("XYZ", 10.0, vec![call(100.0)]);
    let second = position("XYZ", -4.0, vec![put(95.0)]);
    let request = AnalyzeRequest {
        positions: vec![first.clone(), second.clone()],
        scenario_range: vec![-0.10],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    let data = TickerMarketData {
        spot: 100.0,
        volatility: 0.30,
        risk_free_rate: 0.0425,
    };
    let mut expected = metrics_of(&linear_response(&scenario_request(&first, &data, -0.10)));
    expected += metrics_of(&linear_response(&scenario_request(&second, &data, -0.10)));

    assert_eq!(h.feed.calls(), 1);
    assert_eq!(h.engine.calls(), 2);
    assert_eq!(outcome.results["XYZ"]["-0.10"], expected);
}

#[tokio::test]
async fn test_volatility_override_used_when_nonzero() {
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![position("XYZ", 1.0, vec![call(100.0)])],
        scenario_range: vec![0.0],
        volatility: 0.55,
    };

    h.aggregator.analyze(&request, deadline()).await;

    let requests = h.engine.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].volatility, 0.55);
    assert!(h.aggregator.quotes().cache().get("vol:XYZ").is_none());
}

#[tokio::test]
async fn test_market_data_reused_across_requests_via_cache() {
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![position("XYZ", 1.0, vec![call(100.0)])],
        scenario_range: vec![0.0],
        volatility: 0.0,
    };

    h.aggregator.analyze(&request, deadline()).await;
    h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(h.feed.calls(), 1);
    assert_eq!(h.engine.calls(), 2);
}

#[tokio::test]
async fn test_duplicate_shocks_accumulate() {
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![position("XYZ", 1.0, vec![call(100.0)])],
        scenario_range: vec![0.05, 0.05],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(h.engine.calls(), 2);
    assert_eq!(outcome.results["XYZ"].len(), 1);
    assert_eq!(outcome.results["XYZ"]["0.05"].pnl, 10.0);
}

#[tokio::test]
async fn test_empty_portfolio() {
    let h = harness(
        ScriptedFeed::new(),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );

    let outcome = h
        .aggregator
        .analyze(&AnalyzeRequest::default(), deadline())
        .await;

    assert!(outcome.results.is_empty());
    assert_eq!(h.feed.calls(), 0);
    assert_eq!(h.engine.calls(), 0);
}

#[tokio::test]
async fn test_position_without_legs_still_priced() {
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![position("XYZ", 10.0, vec![])],
        scenario_range: vec![-0.05, 0.05],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(h.engine.calls(), 2);
    assert!(h.engine.requests().iter().all(|req| req.legs.is_empty()));
    assert!(outcome.failures.is_empty());

    let cells = &outcome.results["XYZ"];
    assert_eq!(cells.len(), 2);
    assert_eq!(cells["-0.05"].pnl, 0.0);
    assert_eq!(cells["0.05"].pnl, 0.0);
}

// ============================================================================
// Partial Failure Tests
// ============================================================================

#[tokio::test]
async fn test_failed_ticker_does_not_affect_others() {
    let h = harness(
        ScriptedFeed::new()
            .with_price("AAA", 50.0)
            .with_error("BBB", UpstreamError::NotFound("BBB".to_string())),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![
            position("BBB", 5.0, vec![call(10.0)]),
            position("AAA", 2.0, vec![call(50.0)]),
        ],
        scenario_range: vec![-0.10],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.results["BBB"].is_empty());
    assert_eq!(outcome.results["AAA"]["-0.10"].pnl, -10.0);
    assert_eq!(h.engine.calls(), 1);

    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.stage, FailureStage::MarketData);
    assert_eq!(failure.ticker, "BBB");
    assert_eq!(failure.shock, None);
    assert_eq!(failure.error, UpstreamError::NotFound("BBB".to_string()));
}

#[tokio::test]
async fn test_blank_ticker_is_failed_lookup() {
    let h = harness(
        ScriptedFeed::new().with_price("AAA", 50.0),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![
            position("", 1.0, vec![call(10.0)]),
            position("AAA", 2.0, vec![call(50.0)]),
        ],
        scenario_range: vec![0.10],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert!(outcome.results[""].is_empty());
    assert_eq!(outcome.results["AAA"]["0.10"].pnl, 10.0);
    assert_eq!(h.feed.calls(), 1);
    assert_eq!(h.engine.calls(), 1);

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].stage, FailureStage::MarketData);
    assert_eq!(outcome.failures[0].ticker, "");
    assert_eq!(outcome.failures[0].error.kind(), "not_found");
}

#[tokio::test]
async fn test_failed_ticker_not_retried_within_request() {
    let h = harness(
        ScriptedFeed::new().with_error("BBB", UpstreamError::Transport("503".to_string())),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![
            position("BBB", 1.0, vec![call(10.0)]),
            position("BBB", 1.0, vec![put(10.0)]),
        ],
        scenario_range: vec![0.0],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(h.feed.calls(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.results["BBB"].is_empty());
}

#[tokio::test]
async fn test_omit_policy_drops_failed_ticker() {
    let h = harness(
        ScriptedFeed::new()
            .with_price("AAA", 50.0)
            .with_error("BBB", UpstreamError::NotFound("BBB".to_string())),
        RecordingEngine::linear(),
        FailedTickerPolicy::Omit,
    );
    let request = AnalyzeRequest {
        positions: vec![
            position("AAA", 2.0, vec![call(50.0)]),
            position("BBB", 5.0, vec![call(10.0)]),
        ],
        scenario_range: vec![0.10],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(outcome.results.len(), 1);
    assert!(!outcome.results.contains_key("BBB"));
    assert_eq!(outcome.results["AAA"]["0.10"].pnl, 10.0);
}

#[tokio::test]
async fn test_pricing_failure_skips_only_that_cell() {
    let engine = RecordingEngine::new(|req| {
        if req.scenario_pct_change < 0.0 {
            Err(UpstreamError::Transport("engine unavailable".to_string()))
        } else {
            Ok(linear_response(req))
        }
    });
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        engine,
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![position("XYZ", 1.0, vec![call(100.0)])],
        scenario_range: vec![-0.10, 0.10],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(h.engine.calls(), 2);
    let cells = &outcome.results["XYZ"];
    assert!(!cells.contains_key("-0.10"));
    assert_eq!(cells["0.10"].pnl, 10.0);

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].stage, FailureStage::Pricing);
    assert_eq!(outcome.failures[0].shock.as_deref(), Some("-0.10"));
}

#[tokio::test]
async fn test_pricing_failure_on_one_position_keeps_other_contribution() {
    let engine = RecordingEngine::new(|req| {
        if req.legs.iter().any(|leg| leg.leg_type == LegType::Put) {
            Err(UpstreamError::Decode("bad body".to_string()))
        } else {
            Ok(ScenarioResponse {
                scenario_pnl: 3.0,
                scenario_delta: 0.5,
                scenario_gamma: 0.01,
                scenario_theta: -0.2,
            })
        }
    });
    let h = harness(
        ScriptedFeed::new().with_price("XYZ", 100.0),
        engine,
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![
            position("XYZ", 1.0, vec![call(100.0)]),
            position("XYZ", 1.0, vec![put(100.0)]),
        ],
        scenario_range: vec![0.0],
        volatility: 0.0,
    };

    let outcome = h.aggregator.analyze(&request, deadline()).await;

    assert_eq!(
        outcome.results["XYZ"]["0.00"],
        Metrics {
            pnl: 3.0,
            delta: 0.5,
            gamma: 0.01,
            theta: -0.2,
        }
    );
}

// ============================================================================
// Deadline Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_slow_quote_times_out_at_deadline() {
    let h = harness(
        ScriptedFeed::new()
            .with_price("XYZ", 100.0)
            .with_delay(Duration::from_secs(60)),
        RecordingEngine::linear(),
        FailedTickerPolicy::KeepEmpty,
    );
    let request = AnalyzeRequest {
        positions: vec![position("XYZ", 1.0, vec![call(100.0)])],
        scenario_range: vec![0.0],
        volatility: 0.0,
    };

    let outcome = h
        .aggregator
        .analyze(&request, Instant::now() + Duration::from_secs(5))
        .await;

    assert!(outcome.results["XYZ"].is_empty());
    assert_eq!(outcome.failures[0].error, UpstreamError::Timeout);
    assert_eq!(h.engine.calls(), 0);
    assert!(h.aggregator.quotes().cache().get("spot:XYZ").is_none());
}
