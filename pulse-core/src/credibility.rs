//! Per-source credibility scores
//!
//! Credibility is the only state that outlives a detection cycle. Scores are
//! seeded from a static per-platform prior table and updated through
//! verification feedback; the derived weight multiplies signal influence and
//! is always clamped to [0.1, 2.0].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MAX_CREDIBILITY_WEIGHT, MIN_CREDIBILITY_WEIGHT};

/// Per-platform credibility record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityScore {
    pub platform: String,
    /// Overall credibility in [0, 1]
    pub overall: f64,
    /// EWMA of recent verification accuracy
    pub reliability: f64,
    /// How current the platform's signals tend to be
    pub freshness: f64,
    /// Reach/engagement of the platform's sources
    pub influence: f64,
    /// Variance-derived consistency of signal quality
    pub consistency: f64,
    /// Fraction of signals that pass verification
    pub verification: f64,
    pub updated_at: DateTime<Utc>,
}

impl CredibilityScore {
    /// Trust weight derived from the overall score, clamped to [0.1, 2.0]
    pub fn weight(&self) -> f64 {
        (self.overall * 2.0).clamp(MIN_CREDIBILITY_WEIGHT, MAX_CREDIBILITY_WEIGHT)
    }

    /// Recompute overall from the sub-scores
    pub fn recompute_overall(&mut self) {
        self.overall = (0.3 * self.reliability
            + 0.15 * self.freshness
            + 0.2 * self.influence
            + 0.15 * self.consistency
            + 0.2 * self.verification)
            .clamp(0.0, 1.0);
    }
}

/// Static prior table entry: (platform, overall prior)
const PLATFORM_PRIORS: &[(&str, f64)] = &[
    ("hackernews", 0.75),
    ("github", 0.8),
    ("producthunt", 0.7),
    ("reddit", 0.6),
    ("twitter", 0.45),
    ("linkedin", 0.55),
    ("youtube", 0.5),
    ("tiktok", 0.35),
];

/// Prior overall credibility for unknown platforms
pub const DEFAULT_PLATFORM_PRIOR: f64 = 0.5;

/// Static prior score for a platform
pub fn platform_prior(platform: &str) -> CredibilityScore {
    let overall = PLATFORM_PRIORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(platform))
        .map(|(_, prior)| *prior)
        .unwrap_or(DEFAULT_PLATFORM_PRIOR);

    CredibilityScore {
        platform: platform.to_lowercase(),
        overall,
        reliability: overall,
        freshness: overall,
        influence: overall,
        consistency: overall,
        verification: overall,
        updated_at: Utc::now(),
    }
}

/// Platforms with a static prior (used for cross-platform reach ratios)
pub fn known_platforms() -> Vec<&'static str> {
    PLATFORM_PRIORS.iter().map(|(name, _)| *name).collect()
}

/// A single verification feedback record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub source_id: String,
    pub platform: String,
    /// Observed accuracy in [0, 1]
    pub accuracy: f64,
    pub recorded_at: DateTime<Utc>,
}
