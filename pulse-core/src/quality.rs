//! Quality metadata attached to signals during validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Signal;

/// Flags raised during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Internal validation failure; conservative fallback scores were used
    ValidationFailed,
    SuspiciousUrl,
    UnreachableUrl,
    StaleContent,
    LowRelevance,
    SpamPattern,
    ContentTooShort,
    ContentTooLong,
    ImplausibleEngagement,
    LowCredibilitySource,
}

/// Risk tier assigned by verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Verification outcome for a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Unverified,
}

/// Coarse quality tier derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityTier {
    /// Map an overall quality score onto a tier
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            QualityTier::Excellent
        } else if score >= 0.6 {
            QualityTier::Good
        } else if score >= 0.4 {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }
}

/// The six validation sub-scores plus the weighted overall score
///
/// All scores live in [0, 1]. The weights are fixed by the validator:
/// authenticity 0.25, source credibility 0.20, content 0.20, relevance 0.15,
/// engagement 0.10, freshness 0.10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub authenticity: f64,
    pub freshness: f64,
    pub relevance: f64,
    pub source_credibility: f64,
    pub content_quality: f64,
    pub engagement_validity: f64,
    /// Weighted sum of the sub-scores
    pub overall: f64,
    /// Flags raised during validation
    pub flags: Vec<QualityFlag>,
    /// Confidence interval around the overall score (low, high)
    pub confidence_interval: (f64, f64),
}

impl QualityMetrics {
    /// Conservative fallback used when validation itself fails
    pub fn fallback() -> Self {
        Self {
            authenticity: 0.5,
            freshness: 0.5,
            relevance: 0.5,
            source_credibility: 0.5,
            content_quality: 0.5,
            engagement_validity: 0.5,
            overall: 0.5,
            flags: vec![QualityFlag::ValidationFailed],
            confidence_interval: (0.3, 0.7),
        }
    }

    pub fn tier(&self) -> QualityTier {
        QualityTier::from_score(self.overall)
    }
}

/// A signal that has passed through the quality validator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedSignal {
    pub signal: Signal,
    pub quality: QualityMetrics,
    pub status: VerificationStatus,
    pub risk: RiskTier,
    /// When validation completed
    pub validated_at: DateTime<Utc>,
}

impl ValidatedSignal {
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(QualityTier::from_score(0.85), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(0.8), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(0.6), QualityTier::Good);
        assert_eq!(QualityTier::from_score(0.45), QualityTier::Fair);
        assert_eq!(QualityTier::from_score(0.1), QualityTier::Poor);
    }

    #[test]
    fn test_fallback_metrics() {
        let m = QualityMetrics::fallback();
        assert_eq!(m.overall, 0.5);
        assert!(m.flags.contains(&QualityFlag::ValidationFailed));
        assert_eq!(m.tier(), QualityTier::Fair);
    }
}
