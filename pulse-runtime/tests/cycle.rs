//! End-to-end detection-cycle tests: collector fan-out, degraded stages,
//! placeholder cycles and the feedback loop.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use pulse_core::{OpportunitySource, Signal, StageOutcome};
use pulse_engines::MemoryCredibilityStore;
use pulse_probe::ProbeConfig;
use pulse_runtime::{
    CollectorError, DetectionEngine, EngineConfig, SignalCollector, StaticCollector,
};

fn offline_config() -> EngineConfig {
    EngineConfig {
        probe: ProbeConfig {
            enabled: false,
            ..ProbeConfig::default()
        },
        collector_timeout_ms: 300,
        stage_timeout_ms: 2_000,
        cycle_deadline_ms: 5_000,
        ..EngineConfig::default()
    }
}

fn business_signal(platform: &str, source_id: &str, keywords: &[&str], engagement: f64) -> Signal {
    Signal::builder(platform, source_id)
        .content(
            "We built an automation platform for saas customer onboarding. \
             Case study with revenue and pricing benchmarks inside.",
        )
        .keywords(keywords.iter().copied())
        .engagement(engagement)
        .sentiment(0.5)
        .timestamp(Utc::now() - ChronoDuration::minutes(30))
        .build()
        .unwrap()
}

fn good_batch() -> Vec<Signal> {
    vec![
        business_signal("reddit", "r/startups", &["automation", "saas"], 120.0),
        business_signal("hackernews", "hn-feed", &["automation", "ai"], 250.0),
        business_signal("producthunt", "ph-launch", &["automation", "saas"], 60.0),
        business_signal("github", "trending", &["ai", "saas"], 400.0),
    ]
}

/// A collector that sleeps past any reasonable budget
struct SlowCollector;

#[async_trait]
impl SignalCollector for SlowCollector {
    fn name(&self) -> &str {
        "slow-source"
    }

    async fn collect(&self) -> Result<Vec<Signal>, CollectorError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![])
    }
}

/// A collector that always errors
struct BrokenCollector;

#[async_trait]
impl SignalCollector for BrokenCollector {
    fn name(&self) -> &str {
        "broken-source"
    }

    async fn collect(&self) -> Result<Vec<Signal>, CollectorError> {
        Err(CollectorError::Failed {
            name: "broken-source".to_string(),
            reason: "upstream unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn test_full_cycle_produces_ranked_opportunities() {
    let engine = DetectionEngine::new(offline_config())
        .with_collector(Arc::new(StaticCollector::new("batch", good_batch())));

    let result = engine.run_cycle().await;

    assert_eq!(result.report.collected, 4);
    assert!(result.report.accepted > 0, "report: {:?}", result.report);
    assert!(!result.flags.placeholder);
    assert!(!result.opportunities.is_empty());

    // Ranked descending by momentum * confidence
    let scores: Vec<f64> = result.opportunities.iter().map(|o| o.rank_score()).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[tokio::test]
async fn test_empty_cycle_yields_placeholder() {
    // Scenario: zero signals collected
    let engine = DetectionEngine::new(offline_config())
        .with_collector(Arc::new(StaticCollector::new("empty", vec![])));

    let result = engine.run_cycle().await;

    assert!(result.flags.insufficient_data);
    assert!(result.flags.placeholder);
    assert_eq!(result.opportunities.len(), 1);
    assert_eq!(result.opportunities[0].origin, OpportunitySource::Placeholder);
    assert_eq!(result.flags.correlation, StageOutcome::Skipped);
    assert_eq!(result.flags.temporal, StageOutcome::Skipped);
    assert_eq!(result.flags.graph, StageOutcome::Skipped);
}

#[tokio::test]
async fn test_slow_collector_does_not_block_cycle() {
    // Scenario: one collector exceeds its budget; the cycle completes on the
    // remaining sources
    let engine = DetectionEngine::new(offline_config())
        .with_collector(Arc::new(SlowCollector))
        .with_collector(Arc::new(StaticCollector::new("batch", good_batch())));

    let started = std::time::Instant::now();
    let result = engine.run_cycle().await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(result.flags.failed_sources, vec!["slow-source".to_string()]);
    assert_eq!(result.report.collected, 4);
    assert!(!result.opportunities.is_empty());
}

#[tokio::test]
async fn test_broken_collector_recorded_not_fatal() {
    let engine = DetectionEngine::new(offline_config())
        .with_collector(Arc::new(BrokenCollector))
        .with_collector(Arc::new(StaticCollector::new("batch", good_batch())));

    let result = engine.run_cycle().await;

    assert_eq!(result.flags.failed_sources, vec!["broken-source".to_string()]);
    assert!(result.flags.any_degraded());
    assert!(!result.flags.placeholder);
}

#[tokio::test]
async fn test_low_quality_signals_rejected_and_counted() {
    let spam = Signal::builder("twitter", "spam-bot")
        .content("Buy now! Limited time! Click here! 100% free promo code!!!")
        .keywords(["free"])
        .engagement(3.0)
        .timestamp(Utc::now() - ChronoDuration::hours(100))
        .build()
        .unwrap();

    let mut batch = good_batch();
    batch.push(spam);

    let engine = DetectionEngine::new(offline_config())
        .with_collector(Arc::new(StaticCollector::new("mixed", batch)));
    let result = engine.run_cycle().await;

    assert_eq!(result.report.collected, 5);
    assert!(result.report.rejected >= 1);
    assert!(result.report.rejection_rate > 0.0);
    assert_eq!(
        result.report.accepted + result.report.rejected,
        result.report.collected
    );
}

#[tokio::test]
async fn test_feedback_loop_moves_registry_and_store() {
    let store = Arc::new(MemoryCredibilityStore::new());
    let engine = DetectionEngine::new(offline_config()).with_store(store.clone());

    let before = engine.registry().overall("reddit");
    for _ in 0..10 {
        engine.record_feedback("reddit", "r/startups", 1.0).await;
    }

    assert!(engine.registry().overall("reddit") > before);
    assert_eq!(store.verification_count("reddit"), 10);

    // Weight invariant holds after feedback
    let weight = engine.registry().weight("reddit", Some("r/startups"));
    assert!((0.1..=2.0).contains(&weight));
}

#[tokio::test]
async fn test_cycle_result_serializes() {
    let engine = DetectionEngine::new(offline_config())
        .with_collector(Arc::new(StaticCollector::new("batch", good_batch())));
    let result = engine.run_cycle().await;

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("opportunities"));
    assert!(json.contains("rejection_rate"));
}
