//! Credibility Registry
//!
//! The only stateful shared collaborator in the engine. Explicitly injected,
//! never a process-wide global. Concurrency model:
//! - the platform map is a sharded `DashMap`, so reads never block on
//!   writes to other platforms
//! - per-platform state sits behind its own `RwLock`; verification feedback
//!   and recomputes serialize per platform key, reads stay concurrent

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

use pulse_core::{
    platform_prior, CredibilityScore, ValidatedSignal, VerificationRecord,
    MAX_CREDIBILITY_WEIGHT, MIN_CREDIBILITY_WEIGHT,
};

use crate::{CollaboratorError, CredibilityStore};

/// EWMA decay per verification update
const RELIABILITY_ALPHA: f64 = 0.1;

/// Bounded recent-verification window per platform
const HISTORY_WINDOW: usize = 100;

/// Blend ratio between platform weight and per-source accuracy
const SOURCE_BLEND: f64 = 0.3;

#[derive(Debug)]
struct SourceAccuracy {
    sum: f64,
    count: u32,
}

impl SourceAccuracy {
    fn rate(&self) -> f64 {
        if self.count == 0 {
            0.5
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug)]
struct PlatformState {
    score: CredibilityScore,
    /// Recent verification accuracies, bounded to HISTORY_WINDOW
    recent: VecDeque<f64>,
    /// Per-source accuracy tallies
    sources: HashMap<String, SourceAccuracy>,
}

impl PlatformState {
    fn seeded(platform: &str) -> Self {
        Self {
            score: platform_prior(platform),
            recent: VecDeque::new(),
            sources: HashMap::new(),
        }
    }
}

/// Dynamic per-source trust registry
pub struct CredibilityRegistry {
    platforms: DashMap<String, Arc<RwLock<PlatformState>>>,
}

impl CredibilityRegistry {
    pub fn new() -> Self {
        Self {
            platforms: DashMap::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn entry(&self, platform: &str) -> Arc<RwLock<PlatformState>> {
        let key = platform.to_lowercase();
        // Fast path holds only the shard read lock; first sight of a
        // platform pays for the insert
        if let Some(state) = self.platforms.get(&key) {
            return state.clone();
        }
        self.platforms
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(PlatformState::seeded(&key))))
            .clone()
    }

    /// Trust weight for a platform, optionally blended with a specific
    /// source's own accuracy rate. Always in [0.1, 2.0].
    pub fn weight(&self, platform: &str, source_id: Option<&str>) -> f64 {
        let entry = self.entry(platform);
        let state = entry.read();

        let platform_weight = state.score.weight();

        let weight = match source_id.and_then(|id| state.sources.get(id)) {
            Some(acc) => {
                let source_weight = (acc.rate() * 2.0)
                    .clamp(MIN_CREDIBILITY_WEIGHT, MAX_CREDIBILITY_WEIGHT);
                (1.0 - SOURCE_BLEND) * platform_weight + SOURCE_BLEND * source_weight
            }
            None => platform_weight,
        };

        weight.clamp(MIN_CREDIBILITY_WEIGHT, MAX_CREDIBILITY_WEIGHT)
    }

    /// Current overall credibility for a platform, [0, 1]
    pub fn overall(&self, platform: &str) -> f64 {
        self.entry(platform).read().score.overall
    }

    /// Record verification feedback for a source
    ///
    /// Reliability is an EWMA of accuracy with decay 0.1 per update over a
    /// bounded recent-history window.
    pub fn record_verification(&self, source_id: &str, platform: &str, accuracy: f64) {
        let accuracy = accuracy.clamp(0.0, 1.0);
        let entry = self.entry(platform);
        let mut state = entry.write();

        state.score.reliability =
            (1.0 - RELIABILITY_ALPHA) * state.score.reliability + RELIABILITY_ALPHA * accuracy;

        state.recent.push_back(accuracy);
        while state.recent.len() > HISTORY_WINDOW {
            state.recent.pop_front();
        }

        let tally = state
            .sources
            .entry(source_id.to_string())
            .or_insert(SourceAccuracy { sum: 0.0, count: 0 });
        tally.sum += accuracy;
        tally.count += 1;

        state.score.recompute_overall();
        state.score.updated_at = Utc::now();

        debug!(
            "Verification for {}/{}: accuracy {:.2}, reliability now {:.3}",
            platform, source_id, accuracy, state.score.reliability
        );
    }

    /// Recompute a platform's sub-scores from a recent validated batch
    ///
    /// Falls back to what the prior/EWMA already holds when the batch carries
    /// no signals for the platform.
    pub fn recompute(&self, platform: &str, recent: &[ValidatedSignal]) -> CredibilityScore {
        let entry = self.entry(platform);
        let mut state = entry.write();

        let batch: Vec<&ValidatedSignal> = recent
            .iter()
            .filter(|v| v.signal.platform.eq_ignore_ascii_case(platform))
            .collect();

        if !batch.is_empty() {
            let now = Utc::now();

            // Freshness: decayed mean age over 48h
            let mean_age: f64 = batch
                .iter()
                .map(|v| v.signal.age_hours(now).max(0.0))
                .sum::<f64>()
                / batch.len() as f64;
            state.score.freshness = (1.0 - mean_age / 48.0).clamp(0.0, 1.0);

            // Influence: log-scaled mean engagement
            let mean_engagement: f64 = batch
                .iter()
                .map(|v| v.signal.engagement_score)
                .sum::<f64>()
                / batch.len() as f64;
            state.score.influence = ((mean_engagement + 1.0).ln() / 10.0).clamp(0.0, 1.0);

            // Consistency: inverse variance of overall quality
            let mean_quality: f64 =
                batch.iter().map(|v| v.quality.overall).sum::<f64>() / batch.len() as f64;
            let variance: f64 = batch
                .iter()
                .map(|v| (v.quality.overall - mean_quality).powi(2))
                .sum::<f64>()
                / batch.len() as f64;
            state.score.consistency = (1.0 - variance.sqrt() * 2.0).clamp(0.0, 1.0);

            // Verification: fraction of the batch that passed the floor
            let verified = batch.iter().filter(|v| v.is_verified()).count();
            state.score.verification = verified as f64 / batch.len() as f64;
        }

        state.score.recompute_overall();
        state.score.updated_at = Utc::now();
        state.score.clone()
    }

    /// Seed registry state from a persisted store
    pub async fn load_from_store(
        &self,
        store: &dyn CredibilityStore,
        platforms: &[&str],
    ) -> Result<(), CollaboratorError> {
        for platform in platforms {
            if let Some(score) = store.get_score(platform).await? {
                let entry = self.entry(platform);
                entry.write().score = score;
            }
        }
        Ok(())
    }

    /// Persist current scores and a verification record to the store
    pub async fn persist_verification(
        &self,
        store: &dyn CredibilityStore,
        record: VerificationRecord,
    ) -> Result<(), CollaboratorError> {
        let score = self.entry(&record.platform).read().score.clone();
        store.put_score(score).await?;
        store.append_verification(record).await
    }

    /// Platforms currently tracked
    pub fn tracked_platforms(&self) -> Vec<String> {
        let mut platforms: Vec<String> =
            self.platforms.iter().map(|e| e.key().clone()).collect();
        platforms.sort();
        platforms
    }
}

impl Default for CredibilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{QualityMetrics, RiskTier, Signal, VerificationStatus};

    fn validated(platform: &str, engagement: f64, overall: f64) -> ValidatedSignal {
        let signal = Signal::builder(platform, "src-1")
            .content("test content")
            .engagement(engagement)
            .build()
            .unwrap();
        let mut quality = QualityMetrics::fallback();
        quality.flags.clear();
        quality.overall = overall;
        ValidatedSignal {
            signal,
            quality,
            status: if overall >= 0.6 {
                VerificationStatus::Verified
            } else {
                VerificationStatus::Unverified
            },
            risk: RiskTier::Low,
            validated_at: Utc::now(),
        }
    }

    #[test]
    fn test_weight_in_range_for_all_platforms() {
        let registry = CredibilityRegistry::new();
        for platform in ["reddit", "github", "tiktok", "never-heard-of-it"] {
            let w = registry.weight(platform, None);
            assert!((MIN_CREDIBILITY_WEIGHT..=MAX_CREDIBILITY_WEIGHT).contains(&w));
        }
    }

    #[test]
    fn test_verification_moves_reliability() {
        let registry = CredibilityRegistry::new();
        let before = registry.overall("reddit");

        for _ in 0..20 {
            registry.record_verification("src-1", "reddit", 1.0);
        }
        assert!(registry.overall("reddit") > before);

        for _ in 0..50 {
            registry.record_verification("src-1", "reddit", 0.0);
        }
        assert!(registry.overall("reddit") < before);
    }

    #[test]
    fn test_repeated_reads_keep_accumulated_state() {
        let registry = CredibilityRegistry::new();
        registry.record_verification("src-1", "reddit", 1.0);
        let first = registry.weight("reddit", Some("src-1"));

        // Read path must return the existing state, never a reseeded one
        for _ in 0..100 {
            assert_eq!(registry.weight("reddit", Some("src-1")), first);
        }
        assert_eq!(registry.tracked_platforms().len(), 1);
    }

    #[test]
    fn test_source_blending() {
        let registry = CredibilityRegistry::new();
        registry.record_verification("good-src", "reddit", 1.0);

        let blended = registry.weight("reddit", Some("good-src"));
        let plain = registry.weight("reddit", Some("unknown-src"));
        assert!(blended > plain);
    }

    #[test]
    fn test_recompute_from_batch() {
        let registry = CredibilityRegistry::new();
        let batch = vec![
            validated("github", 500.0, 0.8),
            validated("github", 300.0, 0.75),
            validated("reddit", 50.0, 0.4),
        ];

        let score = registry.recompute("github", &batch);
        assert_eq!(score.verification, 1.0);
        assert!(score.freshness > 0.9); // signals are brand new
        assert!(score.overall > 0.0 && score.overall <= 1.0);
    }

    #[test]
    fn test_recompute_empty_batch_keeps_prior() {
        let registry = CredibilityRegistry::new();
        let prior = registry.overall("producthunt");
        let score = registry.recompute("producthunt", &[]);
        assert!((score.overall - prior).abs() < 0.15);
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let registry = CredibilityRegistry::new();
        let store = crate::MemoryCredibilityStore::new();

        registry.record_verification("src", "reddit", 0.9);
        registry
            .persist_verification(
                &store,
                VerificationRecord {
                    source_id: "src".to_string(),
                    platform: "reddit".to_string(),
                    accuracy: 0.9,
                    recorded_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.verification_count("reddit"), 1);

        let fresh = CredibilityRegistry::new();
        fresh.load_from_store(&store, &["reddit"]).await.unwrap();
        assert!((fresh.overall("reddit") - registry.overall("reddit")).abs() < 1e-9);
    }
}
