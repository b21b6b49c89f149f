//! Tunable heuristics configuration
//!
//! The classification word lists and scoring weights below are deterministic,
//! hand-tuned heuristics with no validated ground truth. They are
//! configuration, not business rules: callers may override any of them from a
//! TOML document, and no consumer should infer stronger guarantees than
//! "deterministic and tunable".

use serde::{Deserialize, Serialize};

use crate::DEFAULT_QUALITY_FLOOR;

fn default_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Weights for the six validation sub-scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub authenticity: f64,
    pub source_credibility: f64,
    pub content_quality: f64,
    pub relevance: f64,
    pub engagement_validity: f64,
    pub freshness: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            authenticity: 0.25,
            source_credibility: 0.20,
            content_quality: 0.20,
            relevance: 0.15,
            engagement_validity: 0.10,
            freshness: 0.10,
        }
    }
}

/// All tunable heuristics in one serde-loadable document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// Overall quality score required for a signal to count as verified
    pub quality_floor: f64,

    /// Sub-score weights for overall quality
    pub quality_weights: QualityWeights,

    /// Validation-cache TTL in seconds (idempotent tier within the TTL)
    pub validation_cache_ttl_secs: u64,

    /// Business-relevance vocabulary for the relevance sub-score
    pub business_keywords: Vec<String>,

    /// Patterns that mark promotional/spam content
    pub spam_indicators: Vec<String>,

    /// Phrases that suggest substantive content
    pub high_quality_indicators: Vec<String>,

    /// Phrases that suggest low-effort content
    pub low_quality_indicators: Vec<String>,

    /// Market-timing indicator lists
    pub early_market_indicators: Vec<String>,
    pub hot_market_indicators: Vec<String>,
    pub saturated_market_indicators: Vec<String>,

    /// Competition-density indicator lists
    pub low_competition_indicators: Vec<String>,
    pub high_competition_indicators: Vec<String>,

    /// Market-size indicator lists
    pub large_market_indicators: Vec<String>,
    pub niche_market_indicators: Vec<String>,

    /// Per-platform engagement plausibility caps
    pub engagement_caps: Vec<(String, f64)>,

    /// Per-platform base weights for momentum aggregation
    pub platform_base_weights: Vec<(String, f64)>,

    /// Minimum signals for a fallback keyword group
    pub min_keyword_group: usize,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            quality_floor: DEFAULT_QUALITY_FLOOR,
            quality_weights: QualityWeights::default(),
            validation_cache_ttl_secs: 300,
            business_keywords: default_strings(&[
                "startup", "saas", "revenue", "market", "customer", "product", "launch",
                "automation", "ai", "api", "growth", "pricing", "b2b", "niche", "demand",
                "monetize", "subscription", "tool", "platform", "workflow",
            ]),
            spam_indicators: default_strings(&[
                "buy now", "limited time", "click here", "dm me", "100% free",
                "get rich", "guaranteed", "act fast", "promo code",
            ]),
            high_quality_indicators: default_strings(&[
                "case study", "we built", "lessons learned", "benchmark", "open source",
                "analysis", "deep dive", "postmortem",
            ]),
            low_quality_indicators: default_strings(&[
                "thoughts?", "am i the only one", "unpopular opinion", "hot take",
            ]),
            early_market_indicators: default_strings(&[
                "prototype", "beta", "early access", "proof of concept", "side project",
                "just launched", "waitlist",
            ]),
            hot_market_indicators: default_strings(&[
                "everyone is", "blowing up", "exploding", "viral", "funding round",
                "acquired", "race to",
            ]),
            saturated_market_indicators: default_strings(&[
                "crowded", "commoditized", "too many", "yet another", "saturated",
                "me too product",
            ]),
            low_competition_indicators: default_strings(&[
                "no good solution", "nothing exists", "underserved", "wish there was",
                "gap in the market",
            ]),
            high_competition_indicators: default_strings(&[
                "alternatives", "competitors", "vs", "comparison", "incumbent",
                "market leader",
            ]),
            large_market_indicators: default_strings(&[
                "enterprise", "billion", "every company", "global", "industry wide",
            ]),
            niche_market_indicators: default_strings(&[
                "hobbyist", "indie", "small teams", "specific", "vertical",
            ]),
            engagement_caps: vec![
                ("reddit".to_string(), 100_000.0),
                ("hackernews".to_string(), 5_000.0),
                ("producthunt".to_string(), 10_000.0),
                ("github".to_string(), 50_000.0),
                ("twitter".to_string(), 1_000_000.0),
                ("linkedin".to_string(), 50_000.0),
                ("youtube".to_string(), 10_000_000.0),
                ("tiktok".to_string(), 10_000_000.0),
            ],
            platform_base_weights: vec![
                ("hackernews".to_string(), 1.3),
                ("github".to_string(), 1.2),
                ("producthunt".to_string(), 1.1),
                ("reddit".to_string(), 1.0),
                ("linkedin".to_string(), 0.9),
                ("twitter".to_string(), 0.8),
                ("youtube".to_string(), 0.8),
                ("tiktok".to_string(), 0.6),
            ],
            min_keyword_group: 3,
        }
    }
}

impl HeuristicsConfig {
    /// Engagement plausibility cap for a platform (generous default for unknowns)
    pub fn engagement_cap(&self, platform: &str) -> f64 {
        self.engagement_caps
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(platform))
            .map(|(_, cap)| *cap)
            .unwrap_or(1_000_000.0)
    }

    /// Momentum base weight for a platform
    pub fn platform_base_weight(&self, platform: &str) -> f64 {
        self.platform_base_weights
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(platform))
            .map(|(_, w)| *w)
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = QualityWeights::default();
        let sum = w.authenticity
            + w.source_credibility
            + w.content_quality
            + w.relevance
            + w.engagement_validity
            + w.freshness;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_platform_lookups() {
        let cfg = HeuristicsConfig::default();
        assert_eq!(cfg.platform_base_weight("HackerNews"), 1.3);
        assert_eq!(cfg.platform_base_weight("unknown"), 1.0);
        assert_eq!(cfg.engagement_cap("hackernews"), 5_000.0);
    }

    #[test]
    fn test_config_roundtrip_json() {
        let cfg = HeuristicsConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: HeuristicsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
