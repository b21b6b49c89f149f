//! Seasonal decomposition against fixed candidate cadences

use pulse_core::TemporalPattern;

use super::series::{variance_of, TimeSeries};
use super::finite_or_err;

/// Candidate periods in hourly buckets: day, week, month, year cadences
const CANDIDATE_PERIODS: &[usize] = &[24, 168, 672, 8064];

/// Strength floor below which a candidate is discarded
const STRENGTH_FLOOR: f64 = 0.3;

pub(super) fn detect(series: &TimeSeries) -> Result<Vec<TemporalPattern>, String> {
    let mut patterns = Vec::new();

    for &period in CANDIDATE_PERIODS {
        // Need at least two full cycles to call it seasonal
        if series.len() < period * 2 {
            continue;
        }
        if let Some(pattern) = decompose(series, period)? {
            patterns.push(pattern);
        }
    }

    Ok(patterns)
}

/// Classical mean-by-phase decomposition
///
/// strength = seasonal variance / (seasonal variance + residual variance)
fn decompose(series: &TimeSeries, period: usize) -> Result<Option<TemporalPattern>, String> {
    let values = series.values();
    let grand_mean = series.mean();

    // Phase means
    let mut phase_sums = vec![0.0; period];
    let mut phase_counts = vec![0u32; period];
    for (i, v) in values.iter().enumerate() {
        phase_sums[i % period] += v;
        phase_counts[i % period] += 1;
    }
    let phase_means: Vec<f64> = phase_sums
        .iter()
        .zip(&phase_counts)
        .map(|(sum, count)| if *count == 0 { grand_mean } else { sum / *count as f64 })
        .collect();

    let seasonal: Vec<f64> = phase_means.iter().map(|m| m - grand_mean).collect();
    let residuals: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, v)| v - phase_means[i % period])
        .collect();

    let seasonal_var = variance_of(&seasonal);
    let residual_var = variance_of(&residuals);
    let denom = seasonal_var + residual_var;
    if denom <= f64::EPSILON {
        return Ok(None);
    }

    let strength = finite_or_err(seasonal_var / denom, "seasonal strength")?;
    if strength <= STRENGTH_FLOOR {
        return Ok(None);
    }

    // Peak/valley phases mapped back to their first occurrence
    let peak_phase = argmax(&phase_means);
    let valley_phase = argmin(&phase_means);
    let peaks: Vec<_> = (peak_phase..values.len())
        .step_by(period)
        .map(|i| series.timestamp(i))
        .collect();
    let valleys: Vec<_> = (valley_phase..values.len())
        .step_by(period)
        .map(|i| series.timestamp(i))
        .collect();

    let cycles = values.len() / period;
    let confidence = (cycles as f64 / 4.0).min(1.0) * strength.min(1.0);

    Ok(Some(TemporalPattern::Seasonal {
        period_hours: period,
        strength,
        confidence,
        peaks,
        valleys,
    }))
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Deterministic pseudo-noise without pulling in an RNG
    fn noise(i: usize) -> f64 {
        ((i as f64 * 12.9898).sin() * 43758.5453).fract()
    }

    #[test]
    fn test_weekly_seasonality_detected() {
        // Three weeks of hourly data with a weekly sine, amplitude 5, noise ~1
        let n = 168 * 3;
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let phase = (i % 168) as f64 / 168.0 * std::f64::consts::TAU;
                10.0 + 5.0 * phase.sin() + noise(i)
            })
            .collect();
        let series = TimeSeries::new(Utc::now(), values);

        let patterns = detect(&series).unwrap();
        let weekly = patterns.iter().find_map(|p| match p {
            TemporalPattern::Seasonal {
                period_hours: 168,
                strength,
                ..
            } => Some(*strength),
            _ => None,
        });

        let strength = weekly.expect("weekly pattern not found");
        assert!(strength > 0.3, "strength {}", strength);
    }

    #[test]
    fn test_daily_seasonality_detected() {
        let n = 24 * 5;
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let phase = (i % 24) as f64 / 24.0 * std::f64::consts::TAU;
                5.0 + 3.0 * phase.sin() + 0.3 * noise(i)
            })
            .collect();
        let series = TimeSeries::new(Utc::now(), values);

        let patterns = detect(&series).unwrap();
        assert!(patterns.iter().any(|p| matches!(
            p,
            TemporalPattern::Seasonal {
                period_hours: 24,
                ..
            }
        )));
    }

    #[test]
    fn test_flat_series_no_seasonality() {
        let series = TimeSeries::new(Utc::now(), vec![1.0; 200]);
        let patterns = detect(&series).unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_pure_noise_weak_seasonality() {
        let values: Vec<f64> = (0..200).map(noise).collect();
        let series = TimeSeries::new(Utc::now(), values);
        let patterns = detect(&series).unwrap();
        // Unstructured noise must not produce confident seasonal claims
        for p in patterns {
            assert!(p.confidence() < 0.8);
        }
    }
}
