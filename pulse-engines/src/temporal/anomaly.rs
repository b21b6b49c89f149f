//! Anomaly detection via per-point z-scores

use pulse_core::TemporalPattern;

use super::finite_or_err;
use super::series::TimeSeries;

/// |z| threshold for flagging a point
const Z_THRESHOLD: f64 = 2.5;

pub(super) fn detect(series: &TimeSeries) -> Result<Vec<TemporalPattern>, String> {
    let values = series.values();
    let mean = series.mean();
    let stddev = series.variance().sqrt();

    if stddev <= f64::EPSILON {
        return Ok(Vec::new());
    }

    let mut points = Vec::new();
    let mut flagged_z = Vec::new();

    for (i, v) in values.iter().enumerate() {
        let z = finite_or_err((v - mean) / stddev, "z-score")?;
        if z.abs() > Z_THRESHOLD {
            points.push(series.timestamp(i));
            flagged_z.push(z.abs());
        }
    }

    if points.is_empty() {
        return Ok(Vec::new());
    }

    let strength =
        (flagged_z.iter().sum::<f64>() / flagged_z.len() as f64 / 3.0).min(1.0);
    let confidence = (values.len() as f64 / 30.0).min(1.0);

    Ok(vec![TemporalPattern::Anomaly {
        points,
        strength,
        confidence,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_single_spike_flagged_at_right_timestamp() {
        // Flat baseline with one 5-sigma spike
        let mut values = vec![1.0; 30];
        values[17] = 30.0;
        let series = TimeSeries::new(Utc::now(), values);

        let patterns = detect(&series).unwrap();
        assert_eq!(patterns.len(), 1);
        match &patterns[0] {
            TemporalPattern::Anomaly { points, strength, .. } => {
                assert_eq!(points.len(), 1);
                assert_eq!(points[0], series.timestamp(17));
                assert!(*strength > 0.5);
            }
            other => panic!("expected anomaly, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_series_no_anomalies() {
        let values: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
        let series = TimeSeries::new(Utc::now(), values);
        assert!(detect(&series).unwrap().is_empty());
    }

    #[test]
    fn test_constant_series_no_anomalies() {
        let series = TimeSeries::new(Utc::now(), vec![2.5; 20]);
        assert!(detect(&series).unwrap().is_empty());
    }

    #[test]
    fn test_strength_capped_at_one() {
        let mut values = vec![0.0; 50];
        values[10] = 1000.0;
        let series = TimeSeries::new(Utc::now(), values);

        let patterns = detect(&series).unwrap();
        assert!(patterns[0].strength() <= 1.0);
    }
}
