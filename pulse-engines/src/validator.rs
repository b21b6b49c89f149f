//! Quality Validator
//!
//! Scores and gates every incoming signal. `validate` is a total function:
//! any internal failure produces the conservative fallback bundle (overall
//! 0.5, `ValidationFailed` flag, high risk) instead of an error.
//!
//! Batched validation caps concurrent network probes so one slow probe can
//! never stall a batch; a failed probe degrades the authenticity sub-score of
//! that one signal.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use pulse_core::{
    EngineError, HeuristicsConfig, QualityFlag, QualityMetrics, QualityTier, RiskTier, Signal,
    ValidatedSignal, VerificationStatus,
};
use pulse_probe::{probe_batch, url_plausibility, ProbeConfig, ProbeOutcome};

use crate::{SemanticOracle, SemanticScores};

struct CacheEntry {
    quality: QualityMetrics,
    status: VerificationStatus,
    risk: RiskTier,
    cached_at: Instant,
}

/// Validates signal quality against the configured heuristics
pub struct QualityValidator {
    config: HeuristicsConfig,
    probe_config: ProbeConfig,
    oracle: Option<Arc<dyn SemanticOracle>>,
    /// Fingerprint-keyed cache; content re-validated within the TTL reuses
    /// the probe- and content-derived sub-scores. Freshness depends on the
    /// incoming signal's own age and is recomputed on every hit.
    cache: DashMap<String, CacheEntry>,
    /// Source-credibility lookup, injected by the runtime
    credibility: Arc<dyn Fn(&str, &str) -> f64 + Send + Sync>,
}

impl QualityValidator {
    /// `credibility` maps (platform, source_id) to a weight in [0.1, 2.0]
    pub fn new(
        config: HeuristicsConfig,
        probe_config: ProbeConfig,
        credibility: Arc<dyn Fn(&str, &str) -> f64 + Send + Sync>,
    ) -> Self {
        Self {
            config,
            probe_config,
            oracle: None,
            cache: DashMap::new(),
            credibility,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn SemanticOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Validate a batch with bounded-concurrency probes
    pub async fn validate_batch(&self, signals: Vec<Signal>) -> Vec<ValidatedSignal> {
        // Probe only URLs worth probing; everything else scores statically
        let urls: Vec<String> = signals
            .iter()
            .filter_map(|s| s.url.clone())
            .filter(|u| url_plausibility(u, "") > 0.3)
            .collect();

        let probes = probe_batch(&urls, &self.probe_config).await;

        let mut validated = Vec::with_capacity(signals.len());
        for signal in signals {
            let outcome = signal
                .url
                .as_ref()
                .and_then(|u| probes.get(u).copied())
                .unwrap_or(ProbeOutcome::Skipped);

            let semantic = self.oracle_scores(&signal).await;
            validated.push(self.validate_with_probe(signal, outcome, &semantic));
        }
        validated
    }

    /// Validate a single signal without network probes
    pub fn validate(&self, signal: Signal) -> ValidatedSignal {
        self.validate_with_probe(signal, ProbeOutcome::Skipped, &SemanticScores::neutral())
    }

    /// Validate with a pre-resolved probe outcome. Never fails.
    pub fn validate_with_probe(
        &self,
        signal: Signal,
        probe: ProbeOutcome,
        semantic: &SemanticScores,
    ) -> ValidatedSignal {
        if let Some(entry) = self.cache.get(&signal.fingerprint) {
            if entry.cached_at.elapsed().as_secs() < self.config.validation_cache_ttl_secs {
                debug!("Validation cache hit for {}", signal.fingerprint);
                let (quality, status, risk) = self.refresh_cached(&entry, &signal);
                return ValidatedSignal {
                    quality,
                    status,
                    risk,
                    validated_at: Utc::now(),
                    signal,
                };
            }
        }

        let (quality, status, risk) = match self.compute_metrics(&signal, probe, semantic) {
            Ok(quality) => {
                let status = if quality.overall >= self.config.quality_floor {
                    VerificationStatus::Verified
                } else {
                    VerificationStatus::Unverified
                };
                let risk = Self::risk_tier(&quality);
                (quality, status, risk)
            }
            Err(e) => {
                warn!("Validation failed for signal {}: {}", signal.id, e);
                (
                    QualityMetrics::fallback(),
                    VerificationStatus::Unverified,
                    RiskTier::High,
                )
            }
        };

        self.cache.insert(
            signal.fingerprint.clone(),
            CacheEntry {
                quality: quality.clone(),
                status,
                risk,
                cached_at: Instant::now(),
            },
        );

        ValidatedSignal {
            signal,
            quality,
            status,
            risk,
            validated_at: Utc::now(),
        }
    }

    /// Rebuild a cached bundle around the incoming signal's own age
    ///
    /// Fallback bundles pass through untouched; everything else gets its
    /// freshness, overall, status and risk re-derived.
    fn refresh_cached(
        &self,
        cached: &CacheEntry,
        signal: &Signal,
    ) -> (QualityMetrics, VerificationStatus, RiskTier) {
        if cached.quality.flags.contains(&QualityFlag::ValidationFailed) {
            return (cached.quality.clone(), cached.status, cached.risk);
        }

        let mut flags: Vec<QualityFlag> = cached
            .quality
            .flags
            .iter()
            .copied()
            .filter(|f| *f != QualityFlag::StaleContent)
            .collect();
        let freshness = Self::freshness_score(signal, &mut flags);

        let quality = self.assemble(
            cached.quality.authenticity,
            freshness,
            cached.quality.relevance,
            cached.quality.source_credibility,
            cached.quality.content_quality,
            cached.quality.engagement_validity,
            flags,
        );
        let status = if quality.overall >= self.config.quality_floor {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Unverified
        };
        let risk = Self::risk_tier(&quality);
        (quality, status, risk)
    }

    /// Quality tier a signal would get right now (cache-aware)
    pub fn tier_for(&self, signal: &Signal) -> Option<QualityTier> {
        self.cache
            .get(&signal.fingerprint)
            .filter(|e| e.cached_at.elapsed().as_secs() < self.config.validation_cache_ttl_secs)
            .map(|e| e.quality.tier())
    }

    async fn oracle_scores(&self, signal: &Signal) -> SemanticScores {
        match &self.oracle {
            Some(oracle) => match oracle.analyze(&signal.content).await {
                Ok(scores) => scores,
                Err(e) => {
                    debug!("Oracle unavailable, using neutral scores: {}", e);
                    SemanticScores::neutral()
                }
            },
            None => SemanticScores::neutral(),
        }
    }

    fn compute_metrics(
        &self,
        signal: &Signal,
        probe: ProbeOutcome,
        semantic: &SemanticScores,
    ) -> Result<QualityMetrics, EngineError> {
        let mut flags = Vec::new();

        let authenticity = self.authenticity_score(signal, probe, &mut flags);
        let freshness = Self::freshness_score(signal, &mut flags);
        let relevance = self.relevance_score(signal, semantic, &mut flags);
        let source_credibility = self.credibility_score(signal, &mut flags)?;
        let content_quality = self.content_score(signal, &mut flags);
        let engagement_validity = self.engagement_score(signal, &mut flags);

        Ok(self.assemble(
            authenticity,
            freshness,
            relevance,
            source_credibility,
            content_quality,
            engagement_validity,
            flags,
        ))
    }

    /// Weighted overall score and confidence interval from the six sub-scores
    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        authenticity: f64,
        freshness: f64,
        relevance: f64,
        source_credibility: f64,
        content_quality: f64,
        engagement_validity: f64,
        flags: Vec<QualityFlag>,
    ) -> QualityMetrics {
        let w = &self.config.quality_weights;
        let overall = (w.authenticity * authenticity
            + w.source_credibility * source_credibility
            + w.content_quality * content_quality
            + w.relevance * relevance
            + w.engagement_validity * engagement_validity
            + w.freshness * freshness)
            .clamp(0.0, 1.0);

        // Wider interval when the sub-scores disagree
        let scores = [
            authenticity,
            freshness,
            relevance,
            source_credibility,
            content_quality,
            engagement_validity,
        ];
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let stddev = (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>()
            / scores.len() as f64)
            .sqrt();
        let half_width = (0.05 + stddev / 2.0).min(0.25);

        QualityMetrics {
            authenticity,
            freshness,
            relevance,
            source_credibility,
            content_quality,
            engagement_validity,
            overall,
            flags,
            confidence_interval: (
                (overall - half_width).max(0.0),
                (overall + half_width).min(1.0),
            ),
        }
    }

    fn authenticity_score(
        &self,
        signal: &Signal,
        probe: ProbeOutcome,
        flags: &mut Vec<QualityFlag>,
    ) -> f64 {
        let plausibility = match &signal.url {
            Some(url) => {
                let p = url_plausibility(url, &signal.platform);
                if p < 0.3 {
                    flags.push(QualityFlag::SuspiciousUrl);
                }
                p
            }
            // No URL is common for platform-native text posts
            None => 0.5,
        };

        if probe == ProbeOutcome::Unreachable {
            flags.push(QualityFlag::UnreachableUrl);
        }

        let content = signal.content.to_lowercase();
        let spam_hits = self
            .config
            .spam_indicators
            .iter()
            .filter(|p| content.contains(p.as_str()))
            .count();
        let pattern_score = if spam_hits > 0 { 0.2 } else { 0.9 };

        // Metadata/temporal consistency: observed after it happened,
        // not absurdly old
        let age = signal.age_hours(Utc::now());
        let temporal_score = if age < 0.0 {
            0.2
        } else if age > 24.0 * 365.0 {
            0.3
        } else {
            1.0
        };

        0.4 * plausibility + 0.3 * probe.score() + 0.2 * pattern_score + 0.1 * temporal_score
    }

    /// Step decay by age: 1.0 <=1h, 0.9 <=6h, 0.7 <=24h, 0.5 <=72h,
    /// 0.3 <=168h, else 0.1
    fn freshness_score(signal: &Signal, flags: &mut Vec<QualityFlag>) -> f64 {
        let age = signal.age_hours(Utc::now()).max(0.0);
        let score = if age <= 1.0 {
            1.0
        } else if age <= 6.0 {
            0.9
        } else if age <= 24.0 {
            0.7
        } else if age <= 72.0 {
            0.5
        } else if age <= 168.0 {
            0.3
        } else {
            0.1
        };

        if score <= 0.3 {
            flags.push(QualityFlag::StaleContent);
        }
        score
    }

    fn relevance_score(
        &self,
        signal: &Signal,
        semantic: &SemanticScores,
        flags: &mut Vec<QualityFlag>,
    ) -> f64 {
        let content = signal.content.to_lowercase();
        let keyword_set = signal.keyword_set();

        let hits = self
            .config
            .business_keywords
            .iter()
            .filter(|k| content.contains(k.as_str()) || keyword_set.contains(k.as_str()))
            .count();

        let density = (hits as f64 / 4.0).min(1.0);

        // Oracle enrichment merges additively, neutral when absent
        let score = 0.7 * density + 0.3 * semantic.context_relevance;

        if score < 0.2 {
            flags.push(QualityFlag::LowRelevance);
        }
        score
    }

    fn credibility_score(
        &self,
        signal: &Signal,
        flags: &mut Vec<QualityFlag>,
    ) -> Result<f64, EngineError> {
        let weight = (self.credibility)(&signal.platform, &signal.source_id);
        if !(0.1..=2.0).contains(&weight) {
            return Err(EngineError::ValidationFailure {
                signal_id: signal.id.to_string(),
                reason: format!("credibility weight {} out of range", weight),
            });
        }

        // Map the [0.1, 2.0] weight back onto [0, 1]
        let score = (weight / 2.0).clamp(0.0, 1.0);
        if score < 0.25 {
            flags.push(QualityFlag::LowCredibilitySource);
        }
        Ok(score)
    }

    fn content_score(&self, signal: &Signal, flags: &mut Vec<QualityFlag>) -> f64 {
        let content = signal.content.to_lowercase();
        let len = signal.content.chars().count();

        let mut score: f64 = 0.6;

        if len < 20 {
            flags.push(QualityFlag::ContentTooShort);
            score -= 0.3;
        } else if len > 10_000 {
            flags.push(QualityFlag::ContentTooLong);
            score -= 0.2;
        } else if (100..=5_000).contains(&len) {
            score += 0.1;
        }

        if self
            .config
            .high_quality_indicators
            .iter()
            .any(|p| content.contains(p.as_str()))
        {
            score += 0.3;
        }

        if self
            .config
            .low_quality_indicators
            .iter()
            .any(|p| content.contains(p.as_str()))
        {
            score -= 0.2;
        }

        if self
            .config
            .spam_indicators
            .iter()
            .any(|p| content.contains(p.as_str()))
        {
            flags.push(QualityFlag::SpamPattern);
            score -= 0.4;
        }

        score.clamp(0.0, 1.0)
    }

    fn engagement_score(&self, signal: &Signal, flags: &mut Vec<QualityFlag>) -> f64 {
        let cap = self.config.engagement_cap(&signal.platform);
        let e = signal.engagement_score;

        if e > cap {
            flags.push(QualityFlag::ImplausibleEngagement);
            0.1
        } else if e == 0.0 {
            // Zero engagement is plausible but uninformative
            0.6
        } else {
            1.0
        }
    }

    fn risk_tier(quality: &QualityMetrics) -> RiskTier {
        if quality.flags.contains(&QualityFlag::SpamPattern)
            || quality.flags.contains(&QualityFlag::SuspiciousUrl)
        {
            return RiskTier::High;
        }
        if quality.overall >= 0.75 {
            RiskTier::Low
        } else if quality.overall >= 0.5 {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }
}

/// Group validated signals by platform, preserving input order
pub fn by_platform(signals: &[ValidatedSignal]) -> HashMap<String, Vec<&ValidatedSignal>> {
    let mut groups: HashMap<String, Vec<&ValidatedSignal>> = HashMap::new();
    for v in signals {
        groups
            .entry(v.signal.platform.to_lowercase())
            .or_default()
            .push(v);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::signal_at_age;

    fn validator() -> QualityValidator {
        QualityValidator::new(
            HeuristicsConfig::default(),
            ProbeConfig {
                enabled: false,
                ..Default::default()
            },
            Arc::new(|_platform: &str, _source: &str| 1.2),
        )
    }

    fn good_signal() -> Signal {
        Signal::builder("hackernews", "feed")
            .content(
                "We built an open source automation platform for SaaS customer onboarding. \
                 Case study with revenue numbers and a benchmark against incumbents inside.",
            )
            .engagement(250.0)
            .sentiment(0.4)
            .keywords(["automation", "saas"])
            .url("https://news.ycombinator.com/item?id=1234")
            .build()
            .unwrap()
    }

    #[test]
    fn test_overall_in_unit_range() {
        let v = validator();
        let result = v.validate(good_signal());
        assert!(result.quality.overall >= 0.0 && result.quality.overall <= 1.0);
        for s in [
            result.quality.authenticity,
            result.quality.freshness,
            result.quality.relevance,
            result.quality.source_credibility,
            result.quality.content_quality,
            result.quality.engagement_validity,
        ] {
            assert!((0.0..=1.0).contains(&s), "sub-score {} out of range", s);
        }
    }

    #[test]
    fn test_good_signal_verified() {
        let v = validator();
        let result = v.validate(good_signal());
        assert!(result.quality.overall >= 0.6, "overall: {}", result.quality.overall);
        assert_eq!(result.status, VerificationStatus::Verified);
    }

    #[test]
    fn test_spam_signal_flagged_high_risk() {
        let v = validator();
        let spam = Signal::builder("twitter", "spambot")
            .content("Buy now!! Limited time offer, click here for 100% free crypto gains")
            .engagement(3.0)
            .build()
            .unwrap();

        let result = v.validate(spam);
        assert!(result.quality.flags.contains(&QualityFlag::SpamPattern));
        assert_eq!(result.risk, RiskTier::High);
        assert_eq!(result.status, VerificationStatus::Unverified);
    }

    #[test]
    fn test_freshness_step_decay() {
        let v = validator();
        let ages_and_scores = [
            (0.5, 1.0),
            (3.0, 0.9),
            (12.0, 0.7),
            (48.0, 0.5),
            (100.0, 0.3),
            (200.0, 0.1),
        ];
        for (age, expected) in ages_and_scores {
            let signal = signal_at_age("reddit", "src", "some content here for length", age).unwrap();
            let result = v.validate(signal);
            assert_eq!(result.quality.freshness, expected, "age {}h", age);
        }
    }

    #[test]
    fn test_implausible_engagement_flagged() {
        let v = validator();
        let signal = Signal::builder("hackernews", "feed")
            .content("A long enough piece of content about a product launch and market")
            .engagement(1_000_000.0) // way over the hackernews cap
            .build()
            .unwrap();

        let result = v.validate(signal);
        assert!(result
            .quality
            .flags
            .contains(&QualityFlag::ImplausibleEngagement));
        assert_eq!(result.quality.engagement_validity, 0.1);
    }

    #[test]
    fn test_cache_idempotent_for_identical_signals() {
        let v = validator();
        let signal = good_signal();

        let first = v.validate(signal.clone());
        let second = v.validate(signal);

        assert_eq!(first.quality.overall, second.quality.overall);
        assert_eq!(first.quality.tier(), second.quality.tier());
        assert_eq!(first.status, second.status);
    }

    #[test]
    fn test_cache_hit_recomputes_freshness() {
        let v = validator();
        let content = "startup growth content with some length to it";
        let fresh = signal_at_age("reddit", "feed", content, 0.5).unwrap();
        // Same fingerprint, observed later
        let later = signal_at_age("reddit", "feed", content, 3.0).unwrap();

        let first = v.validate(fresh);
        let second = v.validate(later);

        assert_eq!(first.quality.freshness, 1.0);
        assert_eq!(second.quality.freshness, 0.9);
        // Probe- and content-derived sub-scores come from the cache
        assert_eq!(first.quality.authenticity, second.quality.authenticity);
        assert!(second.quality.overall < first.quality.overall);
    }

    #[test]
    fn test_out_of_range_credibility_falls_back() {
        let v = QualityValidator::new(
            HeuristicsConfig::default(),
            ProbeConfig {
                enabled: false,
                ..Default::default()
            },
            // Broken credibility source: weight out of contract range
            Arc::new(|_: &str, _: &str| 17.0),
        );

        let result = v.validate(good_signal());
        assert_eq!(result.quality.overall, 0.5);
        assert!(result.quality.flags.contains(&QualityFlag::ValidationFailed));
        assert_eq!(result.risk, RiskTier::High);
    }

    #[tokio::test]
    async fn test_validate_batch_without_probes() {
        let v = validator();
        let signals = vec![good_signal(), good_signal()];
        let validated = v.validate_batch(signals).await;
        assert_eq!(validated.len(), 2);
        assert!(validated.iter().all(|r| r.quality.overall > 0.0));
    }

    #[test]
    fn test_by_platform_grouping() {
        let v = validator();
        let validated = vec![
            v.validate(good_signal()),
            v.validate(
                Signal::builder("reddit", "r/x")
                    .content("startup growth content with some length to it")
                    .build()
                    .unwrap(),
            ),
        ];
        let groups = by_platform(&validated);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["hackernews"].len(), 1);
        assert_eq!(groups["reddit"].len(), 1);
    }
}
