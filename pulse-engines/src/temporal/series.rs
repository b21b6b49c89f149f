//! Hourly-bucketed composite signal-strength series
//!
//! Strength per bucket = 0.5 * engagement + 0.3 * |sentiment| + 0.2 *
//! credibility, each component normalized to [0, 1] over the snapshot.

use chrono::{DateTime, Duration, DurationRound, Utc};

use pulse_core::{ValidatedSignal, MAX_CREDIBILITY_WEIGHT};

/// An hourly time series anchored at its first bucket
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    start: DateTime<Utc>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(start: DateTime<Utc>, values: Vec<f64>) -> Self {
        Self { start, values }
    }

    /// Bucket a validated snapshot into hourly composite strength
    ///
    /// Returns `None` for an empty snapshot or a degenerate time range.
    pub fn from_signals(signals: &[ValidatedSignal]) -> Option<Self> {
        if signals.is_empty() {
            return None;
        }

        let max_engagement = signals
            .iter()
            .map(|v| v.signal.engagement_score)
            .fold(0.0_f64, f64::max)
            .max(1.0);

        let mut min_ts = signals[0].signal.timestamp;
        let mut max_ts = min_ts;
        for v in signals.iter().skip(1) {
            min_ts = min_ts.min(v.signal.timestamp);
            max_ts = max_ts.max(v.signal.timestamp);
        }

        let start = min_ts.duration_trunc(Duration::hours(1)).ok()?;
        let buckets = ((max_ts - start).num_hours() as usize) + 1;
        // Bound the series to a year of hourly buckets
        if buckets > 24 * 366 {
            return None;
        }

        let mut values = vec![0.0; buckets];
        let mut counts = vec![0u32; buckets];

        for v in signals {
            let idx = (v.signal.timestamp - start).num_hours();
            if idx < 0 || idx as usize >= buckets {
                continue;
            }
            let engagement = v.signal.engagement_score / max_engagement;
            let sentiment = v.signal.sentiment_score.abs();
            let credibility = v.signal.credibility_weight / MAX_CREDIBILITY_WEIGHT;

            values[idx as usize] += 0.5 * engagement + 0.3 * sentiment + 0.2 * credibility;
            counts[idx as usize] += 1;
        }

        for (value, count) in values.iter_mut().zip(&counts) {
            if *count > 1 {
                *value /= *count as f64;
            }
        }

        Some(Self { start, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamp of bucket `index`
    pub fn timestamp(&self, index: usize) -> DateTime<Utc> {
        self.start + Duration::hours(index as i64)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }

    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.values.len() as f64
    }
}

pub(crate) fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub(crate) fn variance_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_of(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{signal_at_age, QualityMetrics, RiskTier, VerificationStatus};

    fn validated_at_age(hours_ago: f64, engagement: f64) -> ValidatedSignal {
        let mut signal = signal_at_age("reddit", "src", "content", hours_ago).unwrap();
        signal.engagement_score = engagement;
        ValidatedSignal {
            signal,
            quality: QualityMetrics::fallback(),
            status: VerificationStatus::Verified,
            risk: RiskTier::Low,
            validated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bucketing_spans_range() {
        let signals = vec![
            validated_at_age(10.0, 100.0),
            validated_at_age(5.0, 50.0),
            validated_at_age(0.5, 20.0),
        ];
        let series = TimeSeries::from_signals(&signals).unwrap();
        // 10 hours ago through now: at least 10 buckets
        assert!(series.len() >= 10);
    }

    #[test]
    fn test_strength_bounded() {
        let signals = vec![validated_at_age(1.0, 500.0), validated_at_age(2.0, 10.0)];
        let series = TimeSeries::from_signals(&signals).unwrap();
        for v in series.values() {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn test_empty_returns_none() {
        assert!(TimeSeries::from_signals(&[]).is_none());
    }
}
