//! Temporal Pattern Engine
//!
//! Detects seasonality, trends, cycles, anomalies and emergence in an
//! hourly-bucketed composite signal-strength series. Each sub-analysis is
//! fault-isolated: a numerical failure in one produces no pattern of that
//! type, never a failure of the whole call.

pub mod series;
mod seasonality;
mod regression;
mod spectrum;
mod anomaly;
mod emergence;

use tracing::{debug, warn};

use pulse_core::{TemporalPattern, ValidatedSignal};

pub use series::TimeSeries;

/// Minimum hourly buckets required for analysis
pub const MIN_BUCKETS: usize = 10;

/// Stateless temporal analysis service
pub struct TemporalPatternEngine;

impl TemporalPatternEngine {
    pub fn new() -> Self {
        Self
    }

    /// Bucket a validated snapshot and analyze the resulting series
    pub fn analyze_signals(&self, signals: &[ValidatedSignal]) -> Vec<TemporalPattern> {
        match TimeSeries::from_signals(signals) {
            Some(series) => self.analyze(&series),
            None => Vec::new(),
        }
    }

    /// Run all five sub-analyses over a series
    pub fn analyze(&self, series: &TimeSeries) -> Vec<TemporalPattern> {
        if series.len() < MIN_BUCKETS {
            debug!(
                "Series too short for temporal analysis: {} < {}",
                series.len(),
                MIN_BUCKETS
            );
            return Vec::new();
        }

        let mut patterns = Vec::new();

        // Sub-analyses are independent; one failing drops only its own output
        match seasonality::detect(series) {
            Ok(found) => patterns.extend(found),
            Err(e) => warn!("Seasonality analysis dropped: {}", e),
        }
        match regression::detect(series) {
            Ok(found) => patterns.extend(found),
            Err(e) => warn!("Trend analysis dropped: {}", e),
        }
        match spectrum::detect(series) {
            Ok(found) => patterns.extend(found),
            Err(e) => warn!("Cyclical analysis dropped: {}", e),
        }
        match anomaly::detect(series) {
            Ok(found) => patterns.extend(found),
            Err(e) => warn!("Anomaly analysis dropped: {}", e),
        }
        match emergence::detect(series) {
            Ok(found) => patterns.extend(found),
            Err(e) => warn!("Emergence analysis dropped: {}", e),
        }

        debug!("Temporal analysis found {} patterns", patterns.len());
        patterns
    }
}

impl Default for TemporalPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Numerical guard shared by the sub-analyses
pub(crate) fn finite_or_err(value: f64, what: &str) -> Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("non-finite {what}"))
    }
}
