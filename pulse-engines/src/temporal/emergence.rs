//! Emergence detection: sustained recent acceleration in a series

use pulse_core::TemporalPattern;

use super::finite_or_err;
use super::regression::build_forecast;
use super::series::{mean_of, variance_of, TimeSeries};

/// Composite score floor for emitting an emergence pattern
const SCORE_FLOOR: f64 = 0.5;

/// Strength above which a stage/forecast is derived
const FORECAST_FLOOR: f64 = 0.6;

/// Recent window, in buckets
const RECENT_WINDOW: usize = 6;

pub(super) fn detect(series: &TimeSeries) -> Result<Vec<TemporalPattern>, String> {
    let values = series.values();
    let n = values.len();
    if n < RECENT_WINDOW * 2 {
        return Ok(Vec::new());
    }

    // Normalize against the series scale so the score components are comparable
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1e-6);
    let normalized: Vec<f64> = values.iter().map(|v| v / scale).collect();

    let velocity: Vec<f64> = normalized.windows(2).map(|w| w[1] - w[0]).collect();
    let acceleration: Vec<f64> = velocity.windows(2).map(|w| w[1] - w[0]).collect();

    let recent_velocity = mean_of(&velocity[velocity.len() - RECENT_WINDOW..]);
    let recent_acceleration = mean_of(
        &acceleration[acceleration.len().saturating_sub(RECENT_WINDOW)..],
    );
    let positive_fraction =
        velocity.iter().filter(|v| **v > 0.0).count() as f64 / velocity.len() as f64;

    // Recent level vs earlier level, capped at 2x growth
    let half = n / 2;
    let earlier_mean = mean_of(&normalized[..half]).max(1e-6);
    let recent_mean = mean_of(&normalized[half..]);
    let growth = (recent_mean / earlier_mean / 2.0).min(1.0);

    let score = finite_or_err(
        0.3 * recent_velocity.max(0.0) * 10.0
            + 0.2 * recent_acceleration.max(0.0) * 10.0
            + 0.2 * positive_fraction
            + 0.3 * growth,
        "emergence score",
    )?
    .min(1.0);

    if score <= SCORE_FLOOR {
        return Ok(Vec::new());
    }

    let volatility = variance_of(&velocity).sqrt().min(1.0);
    let persistence = positive_fraction * (1.0 - volatility);
    let confidence = (n as f64 / 48.0).min(1.0) * score;

    // Stage classification happens inside the forecast from the same
    // velocity, relative to series scale
    let forecast =
        (score > FORECAST_FLOOR).then(|| build_forecast(series, recent_velocity * scale));

    Ok(vec![TemporalPattern::Emergence {
        strength: score,
        confidence,
        velocity: recent_velocity,
        momentum: recent_acceleration,
        persistence,
        forecast,
    }])
}
