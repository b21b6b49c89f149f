//! The detection engine
//!
//! Owns the stateless analytic services and the one stateful collaborator,
//! the credibility registry. A `run_cycle` call is total: collectors may
//! time out, analytics may fail, and the caller still gets a ranked result
//! with the degradation spelled out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use pulse_core::{
    DegradationFlags, EngineError, HeuristicsConfig, QualityReport, QualityTier, Signal,
    StageOutcome, TemporalPattern, TrendCluster, TrendOpportunity, ValidatedSignal,
    VerificationRecord,
};
use pulse_engines::{
    CorrelationEngine, CorrelationResult, CredibilityRegistry, CredibilityStore,
    GraphTrendEngine, OpportunityAggregator, QualityValidator, SemanticOracle,
    TemporalPatternEngine,
};
use pulse_probe::ProbeConfig;

use crate::collector::SignalCollector;

/// Runtime budgets and heuristics for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub heuristics: HeuristicsConfig,
    pub probe: ProbeConfig,
    /// Per-collector timeout budget
    pub collector_timeout_ms: u64,
    /// Per-analytic-stage timeout budget
    pub stage_timeout_ms: u64,
    /// Global per-cycle deadline
    pub cycle_deadline_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heuristics: HeuristicsConfig::default(),
            probe: ProbeConfig::default(),
            collector_timeout_ms: 5_000,
            stage_timeout_ms: 10_000,
            cycle_deadline_ms: 30_000,
        }
    }
}

/// Everything one detection cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    pub opportunities: Vec<TrendOpportunity>,
    pub report: QualityReport,
    pub flags: DegradationFlags,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Orchestrates collectors, validation, analytics and aggregation
pub struct DetectionEngine {
    config: EngineConfig,
    registry: Arc<CredibilityRegistry>,
    validator: QualityValidator,
    aggregator: OpportunityAggregator,
    collectors: Vec<Arc<dyn SignalCollector>>,
    store: Option<Arc<dyn CredibilityStore>>,
}

impl DetectionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let registry = CredibilityRegistry::shared();
        let validator = Self::build_validator(&config, &registry);
        let aggregator = OpportunityAggregator::new(config.heuristics.clone());
        Self {
            config,
            registry,
            validator,
            aggregator,
            collectors: Vec::new(),
            store: None,
        }
    }

    fn build_validator(
        config: &EngineConfig,
        registry: &Arc<CredibilityRegistry>,
    ) -> QualityValidator {
        let lookup = registry.clone();
        QualityValidator::new(
            config.heuristics.clone(),
            config.probe.clone(),
            Arc::new(move |platform, source_id| lookup.weight(platform, Some(source_id))),
        )
    }

    pub fn with_collector(mut self, collector: Arc<dyn SignalCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CredibilityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn SemanticOracle>) -> Self {
        self.validator = Self::build_validator(&self.config, &self.registry).with_oracle(oracle);
        self
    }

    pub fn registry(&self) -> &CredibilityRegistry {
        &self.registry
    }

    /// Seed credibility state from the configured store
    pub async fn load_credibility(&self, platforms: &[&str]) {
        if let Some(store) = &self.store {
            if let Err(e) = self.registry.load_from_store(store.as_ref(), platforms).await {
                warn!("Could not load credibility state: {}", e);
            }
        }
    }

    /// Run one full detection cycle. Total: never returns an error.
    pub async fn run_cycle(&self) -> CycleResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = Duration::from_millis(self.config.cycle_deadline_ms);

        let mut flags = DegradationFlags::default();
        let mut report = QualityReport::default();

        // Phase 1: collector fan-out, each under its own budget
        let collected = self.collect_all(&mut flags).await;
        report.collected = collected.len();

        // Phase 2: validation
        let validation_start = Instant::now();
        let validated = self.validator.validate_batch(collected).await;
        if report.collected > 0 {
            report.mean_validation_latency_ms =
                validation_start.elapsed().as_millis() as f64 / report.collected as f64;
        }

        let mut accepted = Vec::new();
        for v in validated {
            *report
                .tier_counts
                .entry(QualityTier::from_score(v.quality.overall))
                .or_insert(0) += 1;
            if v.is_verified() {
                accepted.push(v);
            } else {
                report.rejected += 1;
            }
        }
        report.accepted = accepted.len();
        report.finalize();

        // Periodic credibility recompute from this cycle's batch
        let mut platforms: Vec<String> =
            accepted.iter().map(|v| v.signal.platform.clone()).collect();
        platforms.sort();
        platforms.dedup();
        for platform in &platforms {
            self.registry.recompute(platform, &accepted);
        }

        // Phase 3: concurrent analytics over the read-only snapshot
        let snapshot: Arc<Vec<ValidatedSignal>> = Arc::new(accepted);
        let (correlation, temporal, graph) = if snapshot.is_empty() {
            flags.correlation = StageOutcome::Skipped;
            flags.temporal = StageOutcome::Skipped;
            flags.graph = StageOutcome::Skipped;
            (None, None, None)
        } else {
            self.run_analytics(&snapshot, &mut flags, start, deadline).await
        };

        // Phase 4: aggregation join
        let opportunities = self.aggregator.aggregate(
            &snapshot,
            correlation.as_ref(),
            temporal.as_deref(),
            graph.as_deref(),
            &mut flags,
        );

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            collected = report.collected,
            accepted = report.accepted,
            opportunities = opportunities.len(),
            degraded = flags.any_degraded(),
            elapsed_ms,
            "detection cycle complete"
        );

        CycleResult {
            opportunities,
            report,
            flags,
            started_at,
            elapsed_ms,
        }
    }

    async fn collect_all(&self, flags: &mut DegradationFlags) -> Vec<Signal> {
        let budget = Duration::from_millis(self.config.collector_timeout_ms);

        let pending = self.collectors.iter().map(|collector| {
            let collector = collector.clone();
            async move {
                let name = collector.name().to_string();
                match timeout(budget, collector.collect()).await {
                    Ok(Ok(batch)) => (name, Ok(batch)),
                    Ok(Err(e)) => {
                        let err = EngineError::SourceError {
                            collector: name.clone(),
                            reason: e.to_string(),
                        };
                        (name, Err(err))
                    }
                    Err(_) => {
                        let err = EngineError::SourceTimeout {
                            collector: name.clone(),
                            budget_ms: budget.as_millis() as u64,
                        };
                        (name, Err(err))
                    }
                }
            }
        });

        let mut signals = Vec::new();
        for (name, outcome) in futures::future::join_all(pending).await {
            match outcome {
                Ok(batch) => {
                    debug!(collector = %name, count = batch.len(), "collector delivered");
                    signals.extend(batch);
                }
                Err(e) => {
                    // Absence of this source's signals is acceptable
                    warn!("Collector dropped for this cycle: {}", e);
                    flags.failed_sources.push(name);
                }
            }
        }
        signals
    }

    async fn run_analytics(
        &self,
        snapshot: &Arc<Vec<ValidatedSignal>>,
        flags: &mut DegradationFlags,
        start: Instant,
        deadline: Duration,
    ) -> (
        Option<CorrelationResult>,
        Option<Vec<TemporalPattern>>,
        Option<Vec<TrendCluster>>,
    ) {
        let stage_budget = Duration::from_millis(self.config.stage_timeout_ms);

        let correlation_task: JoinHandle<CorrelationResult> = tokio::spawn({
            let snapshot = snapshot.clone();
            async move { CorrelationEngine::new().correlate(&snapshot) }
        });
        let temporal_task: JoinHandle<Vec<TemporalPattern>> = tokio::spawn({
            let snapshot = snapshot.clone();
            async move { TemporalPatternEngine::new().analyze_signals(&snapshot) }
        });
        let graph_task: JoinHandle<Vec<TrendCluster>> = tokio::spawn({
            let snapshot = snapshot.clone();
            async move { GraphTrendEngine::new().detect_clusters(&snapshot) }
        });

        let aborts = [
            correlation_task.abort_handle(),
            temporal_task.abort_handle(),
            graph_task.abort_handle(),
        ];

        let remaining = deadline.saturating_sub(start.elapsed());
        let joined = timeout(remaining, async {
            tokio::join!(
                timeout(stage_budget, correlation_task),
                timeout(stage_budget, temporal_task),
                timeout(stage_budget, graph_task),
            )
        })
        .await;

        let stage_budget_ms = self.config.stage_timeout_ms;
        match joined {
            Ok((correlation, temporal, graph)) => {
                let correlation =
                    settle("correlation", correlation, stage_budget_ms, &mut flags.correlation);
                let temporal = settle("temporal", temporal, stage_budget_ms, &mut flags.temporal);
                let graph = settle("graph", graph, stage_budget_ms, &mut flags.graph);
                (correlation, temporal, graph)
            }
            Err(_) => {
                // Global deadline hit: every unfinished stage is degraded
                for abort in aborts {
                    abort.abort();
                }
                warn!("cycle deadline reached before analytics completed");
                flags.correlation = StageOutcome::TimedOut;
                flags.temporal = StageOutcome::TimedOut;
                flags.graph = StageOutcome::TimedOut;
                (None, None, None)
            }
        }
    }

    /// Feed observed accuracy back into the registry and, when configured,
    /// the durable store
    pub async fn record_feedback(&self, platform: &str, source_id: &str, accuracy: f64) {
        self.registry.record_verification(source_id, platform, accuracy);

        if let Some(store) = &self.store {
            let record = VerificationRecord {
                source_id: source_id.to_string(),
                platform: platform.to_string(),
                accuracy,
                recorded_at: Utc::now(),
            };
            if let Err(e) = self.registry.persist_verification(store.as_ref(), record).await {
                warn!("Could not persist verification feedback: {}", e);
            }
        }
    }
}

/// Map one stage's nested timeout/join result onto an outcome flag
fn settle<T>(
    stage: &str,
    result: Result<Result<T, tokio::task::JoinError>, tokio::time::error::Elapsed>,
    budget_ms: u64,
    outcome: &mut StageOutcome,
) -> Option<T> {
    match result {
        Ok(Ok(value)) => {
            *outcome = StageOutcome::Completed;
            Some(value)
        }
        Ok(Err(e)) => {
            let err = EngineError::AnalyticError {
                stage: stage.to_string(),
                reason: e.to_string(),
            };
            error!("{}", err);
            *outcome = StageOutcome::Failed;
            None
        }
        Err(_) => {
            let err = EngineError::AnalyticTimeout {
                stage: stage.to_string(),
                budget_ms,
            };
            warn!("{}", err);
            *outcome = StageOutcome::TimedOut;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets_ordered() {
        let config = EngineConfig::default();
        assert!(config.collector_timeout_ms < config.cycle_deadline_ms);
        assert!(config.stage_timeout_ms < config.cycle_deadline_ms);
    }

    #[tokio::test]
    async fn test_engine_without_collectors_is_total() {
        let engine = DetectionEngine::new(EngineConfig::default());
        let result = engine.run_cycle().await;

        assert!(result.flags.insufficient_data);
        assert!(result.flags.placeholder);
        assert_eq!(result.report.collected, 0);
        assert_eq!(result.flags.correlation, StageOutcome::Skipped);
    }
}
