//! Temporal patterns detected in signal-strength time series
//!
//! Patterns are a closed sum type so every consumer handles all variants
//! explicitly. Each variant carries the metrics specific to its detection
//! method; `strength` and `confidence` are common to all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of an emerging trend, classified by velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergenceStage {
    Inception,
    Growth,
    Acceleration,
    Maturity,
}

impl EmergenceStage {
    /// Velocity thresholds: <0.2 inception, <0.5 growth, <0.8 acceleration
    pub fn from_velocity(velocity: f64) -> Self {
        if velocity < 0.2 {
            EmergenceStage::Inception
        } else if velocity < 0.5 {
            EmergenceStage::Growth
        } else if velocity < 0.8 {
            EmergenceStage::Acceleration
        } else {
            EmergenceStage::Maturity
        }
    }
}

/// A single forecast point with linearly widening confidence bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Bounded-horizon forecast produced for strong emergence/trend patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub stage: EmergenceStage,
}

/// A pattern detected in an hourly-bucketed signal-strength series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalPattern {
    /// Recurring cadence found by seasonal decomposition
    Seasonal {
        /// Period in hours
        period_hours: usize,
        /// seasonal variance / (seasonal + residual variance), in (0.3, 1]
        strength: f64,
        confidence: f64,
        peaks: Vec<DateTime<Utc>>,
        valleys: Vec<DateTime<Utc>>,
    },

    /// Monotonic or polynomial drift
    Trend {
        /// Positive slope = rising interest
        slope: f64,
        /// Degree of the best fit (1 = linear, 2/3 = polynomial)
        degree: u8,
        /// |r| for linear, R² for polynomial fits
        strength: f64,
        confidence: f64,
        /// Root of the second derivative for cubic fits
        inflection: Option<DateTime<Utc>>,
        /// Present when strength > 0.6
        forecast: Option<Forecast>,
    },

    /// Repeating oscillation found in the magnitude spectrum
    Cyclical {
        /// Dominant period in hours, within [2, 168]
        period_hours: f64,
        /// Normalized peak magnitude
        strength: f64,
        confidence: f64,
    },

    /// Outlier points flagged by z-score
    Anomaly {
        /// Timestamps with |z| > 2.5
        points: Vec<DateTime<Utc>>,
        /// mean flagged |z| / 3, capped at 1
        strength: f64,
        confidence: f64,
    },

    /// Sustained recent acceleration
    Emergence {
        /// Composite emergence score in (0.5, 1]
        strength: f64,
        confidence: f64,
        /// Mean recent first-difference
        velocity: f64,
        /// Mean recent second-difference
        momentum: f64,
        /// positive-velocity fraction * (1 - volatility)
        persistence: f64,
        /// Present when strength > 0.6
        forecast: Option<Forecast>,
    },
}

impl TemporalPattern {
    pub fn strength(&self) -> f64 {
        match self {
            TemporalPattern::Seasonal { strength, .. } => *strength,
            TemporalPattern::Trend { strength, .. } => *strength,
            TemporalPattern::Cyclical { strength, .. } => *strength,
            TemporalPattern::Anomaly { strength, .. } => *strength,
            TemporalPattern::Emergence { strength, .. } => *strength,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            TemporalPattern::Seasonal { confidence, .. } => *confidence,
            TemporalPattern::Trend { confidence, .. } => *confidence,
            TemporalPattern::Cyclical { confidence, .. } => *confidence,
            TemporalPattern::Anomaly { confidence, .. } => *confidence,
            TemporalPattern::Emergence { confidence, .. } => *confidence,
        }
    }

    /// Short tag for logging and reports
    pub fn kind(&self) -> &'static str {
        match self {
            TemporalPattern::Seasonal { .. } => "seasonal",
            TemporalPattern::Trend { .. } => "trend",
            TemporalPattern::Cyclical { .. } => "cyclical",
            TemporalPattern::Anomaly { .. } => "anomaly",
            TemporalPattern::Emergence { .. } => "emergence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_thresholds() {
        assert_eq!(EmergenceStage::from_velocity(0.1), EmergenceStage::Inception);
        assert_eq!(EmergenceStage::from_velocity(0.3), EmergenceStage::Growth);
        assert_eq!(EmergenceStage::from_velocity(0.6), EmergenceStage::Acceleration);
        assert_eq!(EmergenceStage::from_velocity(0.9), EmergenceStage::Maturity);
    }

    #[test]
    fn test_pattern_kind_and_strength() {
        let p = TemporalPattern::Cyclical {
            period_hours: 24.0,
            strength: 0.7,
            confidence: 0.5,
        };
        assert_eq!(p.kind(), "cyclical");
        assert_eq!(p.strength(), 0.7);
    }

    #[test]
    fn test_pattern_serialization_tagged() {
        let p = TemporalPattern::Anomaly {
            points: vec![],
            strength: 0.9,
            confidence: 0.8,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"kind\":\"anomaly\""));
    }
}
