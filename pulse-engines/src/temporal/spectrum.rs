//! Cyclical pattern detection via the magnitude spectrum

use pulse_core::TemporalPattern;

use super::finite_or_err;
use super::series::TimeSeries;

/// Peaks below this fraction of the max magnitude are ignored
const PEAK_HEIGHT_RATIO: f64 = 0.1;

/// Valid cycle periods in hours
const MIN_PERIOD: f64 = 2.0;
const MAX_PERIOD: f64 = 168.0;

/// Strength floor for a cyclical pattern
const STRENGTH_FLOOR: f64 = 0.3;

pub(super) fn detect(series: &TimeSeries) -> Result<Vec<TemporalPattern>, String> {
    let values = series.values();
    let n = values.len();

    // Remove the mean so the DC component does not dominate
    let mean = series.mean();
    let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();

    let magnitudes = magnitude_spectrum(&centered);
    if magnitudes.is_empty() {
        return Ok(Vec::new());
    }

    let max_magnitude = magnitudes.iter().fold(0.0_f64, |acc, m| acc.max(*m));
    if max_magnitude <= f64::EPSILON {
        return Ok(Vec::new());
    }

    let mut patterns = Vec::new();

    for (idx, &magnitude) in magnitudes.iter().enumerate() {
        let k = idx + 1; // magnitudes start at frequency bin 1
        if !is_local_peak(&magnitudes, idx) {
            continue;
        }
        if magnitude < PEAK_HEIGHT_RATIO * max_magnitude {
            continue;
        }

        let period_hours = n as f64 / k as f64;
        if !(MIN_PERIOD..=MAX_PERIOD).contains(&period_hours) {
            continue;
        }

        let strength = finite_or_err(magnitude / max_magnitude, "cyclical strength")?;
        if strength <= STRENGTH_FLOOR {
            continue;
        }

        // More observed cycles, more confidence
        let cycles = n as f64 / period_hours;
        let confidence = (cycles / 6.0).min(1.0) * strength;

        patterns.push(TemporalPattern::Cyclical {
            period_hours,
            strength,
            confidence,
        });
    }

    // Strongest first, keep the top few
    patterns.sort_by(|a, b| b.strength().total_cmp(&a.strength()));
    patterns.truncate(3);
    Ok(patterns)
}

/// Naive DFT magnitudes for frequency bins 1..=n/2
///
/// Series are at most a year of hourly buckets, so O(n²) is acceptable and
/// avoids pulling in an FFT dependency.
fn magnitude_spectrum(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 4 {
        return Vec::new();
    }

    let mut magnitudes = Vec::with_capacity(n / 2);
    for k in 1..=(n / 2) {
        let mut real = 0.0;
        let mut imaginary = 0.0;
        for (t, v) in values.iter().enumerate() {
            let angle = -std::f64::consts::TAU * k as f64 * t as f64 / n as f64;
            real += v * angle.cos();
            imaginary += v * angle.sin();
        }
        magnitudes.push((real * real + imaginary * imaginary).sqrt());
    }
    magnitudes
}

fn is_local_peak(magnitudes: &[f64], idx: usize) -> bool {
    let left = if idx == 0 { 0.0 } else { magnitudes[idx - 1] };
    let right = if idx + 1 >= magnitudes.len() {
        0.0
    } else {
        magnitudes[idx + 1]
    };
    magnitudes[idx] >= left && magnitudes[idx] >= right
}
