//! Cycle quality reporting and degradation accounting
//!
//! Degradation is visible data: every stage that timed out, errored or fell
//! back is recorded here, never hidden behind a default value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::QualityTier;

/// Counts and latency stats from the validation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    /// Signals received from collectors before validation
    pub collected: usize,
    /// Signals that survived the quality floor
    pub accepted: usize,
    /// Signals excluded as below the floor
    pub rejected: usize,
    /// Counts by quality tier
    pub tier_counts: BTreeMap<QualityTier, usize>,
    /// rejected / collected, 0 when nothing was collected
    pub rejection_rate: f64,
    /// Mean per-signal validation latency in milliseconds
    pub mean_validation_latency_ms: f64,
}

impl QualityReport {
    pub fn finalize(&mut self) {
        self.rejection_rate = if self.collected == 0 {
            0.0
        } else {
            self.rejected as f64 / self.collected as f64
        };
    }
}

/// How an analytic stage ended the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    #[default]
    Completed,
    TimedOut,
    Failed,
    Skipped,
}

impl StageOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, StageOutcome::Completed)
    }
}

/// Structured indicators of reduced/fallback operation for the cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DegradationFlags {
    pub correlation: StageOutcome,
    pub temporal: StageOutcome,
    pub graph: StageOutcome,
    /// Collectors that timed out or failed this cycle
    pub failed_sources: Vec<String>,
    /// True when zero validated signals forced the placeholder result
    pub insufficient_data: bool,
    /// True when the returned opportunities are the placeholder set
    pub placeholder: bool,
}

impl DegradationFlags {
    /// Whether any part of the cycle ran degraded
    pub fn any_degraded(&self) -> bool {
        self.correlation.is_degraded()
            || self.temporal.is_degraded()
            || self.graph.is_degraded()
            || !self.failed_sources.is_empty()
            || self.insufficient_data
    }
}
