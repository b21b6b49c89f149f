//! Trend detection via linear and low-degree polynomial regression

use pulse_core::{EmergenceStage, Forecast, ForecastPoint, TemporalPattern};

use super::finite_or_err;
use super::series::{mean_of, TimeSeries};

/// |r| floor for a linear trend
const LINEAR_FLOOR: f64 = 0.3;

/// R² floor for a polynomial fit to replace the linear one
const POLY_FLOOR: f64 = 0.6;

/// Minimum points before attempting polynomial fits
const POLY_MIN_POINTS: usize = 20;

pub(super) fn detect(series: &TimeSeries) -> Result<Vec<TemporalPattern>, String> {
    let values = series.values();
    let n = values.len();

    let (slope, r) = linear_fit(values)?;
    let linear_strength = r.abs();
    let linear_r2 = r * r;

    // Try polynomial fits on longer series, keep the best qualifying one
    let mut best_poly: Option<(Vec<f64>, f64)> = None;
    if n >= POLY_MIN_POINTS {
        for degree in [2usize, 3] {
            if let Some(coeffs) = polyfit(values, degree) {
                let r2 = r_squared(values, &coeffs);
                if r2.is_finite()
                    && r2 > POLY_FLOOR
                    && r2 > linear_r2
                    && best_poly.as_ref().map(|(_, best)| r2 > *best).unwrap_or(true)
                {
                    best_poly = Some((coeffs, r2));
                }
            }
        }
    }

    let pattern = if let Some((coeffs, r2)) = best_poly {
        let degree = (coeffs.len() - 1) as u8;
        // Cubic fits expose an inflection at the root of the 2nd derivative
        let inflection = if degree == 3 && coeffs[3].abs() > f64::EPSILON {
            let x = -coeffs[2] / (3.0 * coeffs[3]);
            (x >= 0.0 && x < n as f64).then(|| series.timestamp(x as usize))
        } else {
            None
        };

        // End-slope of the fitted curve
        let x_end = (n - 1) as f64;
        let end_slope = poly_derivative(&coeffs, x_end);

        let forecast = (r2 > 0.6).then(|| build_forecast(series, end_slope));

        Some(TemporalPattern::Trend {
            slope: end_slope,
            degree,
            strength: r2,
            confidence: r2 * (n as f64 / 100.0).min(1.0),
            inflection,
            forecast,
        })
    } else if linear_strength > LINEAR_FLOOR {
        let forecast = (linear_strength > 0.6).then(|| build_forecast(series, slope));
        Some(TemporalPattern::Trend {
            slope,
            degree: 1,
            strength: linear_strength,
            confidence: linear_strength * (n as f64 / 100.0).min(1.0),
            inflection: None,
            forecast,
        })
    } else {
        None
    };

    Ok(pattern.into_iter().collect())
}

/// Bounded-horizon forecast via decayed-growth extrapolation
///
/// Growth decays by 0.9 per step; confidence bounds widen linearly.
pub(super) fn build_forecast(series: &TimeSeries, slope: f64) -> Forecast {
    const HORIZON: usize = 24;
    const DECAY: f64 = 0.9;

    let values = series.values();
    let n = values.len();
    let last = values[n - 1];
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1e-6);

    // Stage classification uses velocity relative to series scale
    let rel_velocity = (slope.abs() / scale).min(1.0);
    let stage = EmergenceStage::from_velocity(rel_velocity);

    let mut points = Vec::with_capacity(HORIZON);
    let mut value = last;
    let mut step_slope = slope;
    for k in 0..HORIZON {
        value += step_slope;
        step_slope *= DECAY;

        let half_width = scale * (0.05 + 0.02 * k as f64);
        points.push(ForecastPoint {
            timestamp: series.timestamp(n + k),
            value,
            lower: value - half_width,
            upper: value + half_width,
        });
    }

    Forecast { points, stage }
}

/// Least-squares line fit: (slope, pearson r)
fn linear_fit(values: &[f64]) -> Result<(f64, f64), String> {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();

    let mean_x = mean_of(&xs);
    let mean_y = mean_of(values);

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    for (x, y) in xs.iter().zip(values) {
        ss_xy += (x - mean_x) * (y - mean_y);
        ss_xx += (x - mean_x).powi(2);
        ss_yy += (y - mean_y).powi(2);
    }

    if ss_xx <= f64::EPSILON {
        return Err("degenerate x variance".to_string());
    }

    let slope = ss_xy / ss_xx;
    let r = if ss_yy <= f64::EPSILON {
        0.0
    } else {
        ss_xy / (ss_xx * ss_yy).sqrt()
    };

    Ok((
        finite_or_err(slope, "slope")?,
        finite_or_err(r, "pearson r")?,
    ))
}

/// Least-squares polynomial fit via normal equations + Gaussian elimination
///
/// Returns coefficients lowest-degree first, or `None` on a singular system.
fn polyfit(values: &[f64], degree: usize) -> Option<Vec<f64>> {
    let n = values.len();
    let cols = degree + 1;

    // Normal equations: A^T A c = A^T y
    let mut ata = vec![vec![0.0; cols]; cols];
    let mut aty = vec![0.0; cols];

    for (i, y) in values.iter().enumerate() {
        let x = i as f64 / n as f64; // scale x into [0,1) for conditioning
        let mut powers = vec![1.0; cols];
        for p in 1..cols {
            powers[p] = powers[p - 1] * x;
        }
        for row in 0..cols {
            aty[row] += powers[row] * y;
            for col in 0..cols {
                ata[row][col] += powers[row] * powers[col];
            }
        }
    }

    let scaled = gaussian_solve(&mut ata, &mut aty)?;

    // Undo the x scaling: coefficient k divides by n^k
    let mut coeffs = scaled;
    let mut factor = 1.0;
    for c in coeffs.iter_mut() {
        *c *= factor;
        factor /= n as f64;
    }
    Some(coeffs)
}

fn gaussian_solve(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();

    for pivot in 0..n {
        // Partial pivoting
        let mut max_row = pivot;
        for row in (pivot + 1)..n {
            if a[row][pivot].abs() > a[max_row][pivot].abs() {
                max_row = row;
            }
        }
        if a[max_row][pivot].abs() < 1e-12 {
            return None;
        }
        a.swap(pivot, max_row);
        b.swap(pivot, max_row);

        for row in (pivot + 1)..n {
            let factor = a[row][pivot] / a[pivot][pivot];
            for col in pivot..n {
                a[row][col] -= factor * a[pivot][col];
            }
            b[row] -= factor * b[pivot];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in (row + 1)..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
        if !x[row].is_finite() {
            return None;
        }
    }
    Some(x)
}

fn poly_eval(coeffs: &[f64], x: f64) -> f64 {
    coeffs
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * x + c)
}

fn poly_derivative(coeffs: &[f64], x: f64) -> f64 {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| k as f64 * c * x.powi(k as i32 - 1))
        .sum()
}

fn r_squared(values: &[f64], coeffs: &[f64]) -> f64 {
    let mean = mean_of(values);
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, y) in values.iter().enumerate() {
        let fitted = poly_eval(coeffs, i as f64);
        ss_res += (y - fitted).powi(2);
        ss_tot += (y - mean).powi(2);
    }
    if ss_tot <= f64::EPSILON {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_rising_linear_trend() {
        let values: Vec<f64> = (0..15).map(|i| i as f64 * 0.5 + 1.0).collect();
        let series = TimeSeries::new(Utc::now(), values);

        let patterns = detect(&series).unwrap();
        assert_eq!(patterns.len(), 1);
        match &patterns[0] {
            TemporalPattern::Trend { slope, degree, strength, .. } => {
                assert!(*slope > 0.0);
                assert_eq!(*degree, 1);
                assert!(*strength > 0.99);
            }
            other => panic!("expected trend, got {:?}", other),
        }
    }

    #[test]
    fn test_quadratic_beats_linear() {
        let values: Vec<f64> = (0..30).map(|i| (i as f64).powi(2) * 0.1).collect();
        let series = TimeSeries::new(Utc::now(), values);

        let patterns = detect(&series).unwrap();
        assert_eq!(patterns.len(), 1);
        match &patterns[0] {
            TemporalPattern::Trend { degree, strength, .. } => {
                assert!(*degree >= 2);
                assert!(*strength > 0.9);
            }
            other => panic!("expected trend, got {:?}", other),
        }
    }

    #[test]
    fn test_flat_series_no_trend() {
        let series = TimeSeries::new(Utc::now(), vec![2.0; 30]);
        let patterns = detect(&series).unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_strong_trend_carries_forecast() {
        let values: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let series = TimeSeries::new(Utc::now(), values);

        let patterns = detect(&series).unwrap();
        match &patterns[0] {
            TemporalPattern::Trend { forecast, .. } => {
                let forecast = forecast.as_ref().expect("forecast missing");
                assert_eq!(forecast.points.len(), 24);
                // Bounds widen over the horizon
                let first = &forecast.points[0];
                let last = &forecast.points[23];
                assert!((last.upper - last.lower) > (first.upper - first.lower));
            }
            other => panic!("expected trend, got {:?}", other),
        }
    }

    #[test]
    fn test_polyfit_recovers_coefficients() {
        // y = 1 + 2x + 3x²
        let values: Vec<f64> = (0..25)
            .map(|i| {
                let x = i as f64;
                1.0 + 2.0 * x + 3.0 * x * x
            })
            .collect();
        let coeffs = polyfit(&values, 2).unwrap();
        assert!((coeffs[0] - 1.0).abs() < 1e-3, "c0 {}", coeffs[0]);
        assert!((coeffs[1] - 2.0).abs() < 1e-3, "c1 {}", coeffs[1]);
        assert!((coeffs[2] - 3.0).abs() < 1e-3, "c2 {}", coeffs[2]);
    }
}
