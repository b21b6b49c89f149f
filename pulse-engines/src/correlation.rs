//! Correlation Engine
//!
//! Cross-source correlation over the validated-signal snapshot:
//! - pairwise platform correlation (keywords, timing, sentiment, engagement)
//! - universal-trend synthesis for keywords corroborated across >= 3 platforms
//!
//! Pairs are computed independently; a failure on one pair skips that pair
//! and never aborts the rest.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

use pulse_core::{known_platforms, ValidatedSignal};

use crate::by_platform;

/// Classification of a platform-pair correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationClass {
    /// score >= 0.9
    Identical,
    /// score >= 0.7
    Similar,
    /// score >= 0.5
    Related,
    Divergent,
}

impl CorrelationClass {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            CorrelationClass::Identical
        } else if score >= 0.7 {
            CorrelationClass::Similar
        } else if score >= 0.5 {
            CorrelationClass::Related
        } else {
            CorrelationClass::Divergent
        }
    }

    /// Related or better
    pub fn is_correlated(&self) -> bool {
        !matches!(self, CorrelationClass::Divergent)
    }
}

/// Correlation between the signal sets of two platforms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub platform_a: String,
    pub platform_b: String,
    /// Keyword Jaccard similarity (weight 0.4)
    pub keyword_similarity: f64,
    /// Temporal-window overlap ratio (weight 0.3)
    pub temporal_overlap: f64,
    /// 1 - |mean sentiment delta| (weight 0.2)
    pub sentiment_alignment: f64,
    /// min/max mean engagement (weight 0.1)
    pub engagement_ratio: f64,
    /// Weighted combination
    pub score: f64,
    pub class: CorrelationClass,
    /// min(1, (n_a + n_b) / 20)
    pub confidence: f64,
    /// Keywords appearing on both platforms
    pub shared_keywords: BTreeSet<String>,
}

/// A keyword-driven pattern corroborated across >= 3 platforms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniversalTrend {
    pub keyword: String,
    pub platforms: BTreeSet<String>,
    /// distinct platforms / total known platforms
    pub universality: f64,
    /// Mean engagement across contributing signals, capped at 10
    pub momentum: f64,
    /// Platform with the earliest contributing signal
    pub origin_platform: String,
    /// Earliest contributing timestamp per platform
    pub propagation: BTreeMap<String, DateTime<Utc>>,
    /// Number of correlated pairs the keyword appeared in
    pub pair_count: usize,
    pub signal_ids: Vec<Uuid>,
}

/// Output of a correlation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub pairs: Vec<PairCorrelation>,
    pub universal_trends: Vec<UniversalTrend>,
}

/// Stateless cross-source correlation service
pub struct CorrelationEngine;

impl CorrelationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Correlate a validated-signal snapshot across platforms
    pub fn correlate(&self, signals: &[ValidatedSignal]) -> CorrelationResult {
        let groups = by_platform(signals);
        let mut platforms: Vec<&String> = groups.keys().collect();
        platforms.sort();

        let mut pairs = Vec::new();
        for i in 0..platforms.len() {
            for j in (i + 1)..platforms.len() {
                let (a, b) = (platforms[i], platforms[j]);
                match Self::correlate_pair(a, &groups[a], b, &groups[b]) {
                    Some(pair) => pairs.push(pair),
                    None => {
                        warn!("Skipping degenerate pair {} / {}", a, b);
                    }
                }
            }
        }

        let universal_trends = Self::universal_trends(&pairs, signals);
        debug!(
            "Correlation: {} pairs, {} universal trends",
            pairs.len(),
            universal_trends.len()
        );

        CorrelationResult {
            pairs,
            universal_trends,
        }
    }

    fn correlate_pair(
        platform_a: &str,
        signals_a: &[&ValidatedSignal],
        platform_b: &str,
        signals_b: &[&ValidatedSignal],
    ) -> Option<PairCorrelation> {
        if signals_a.is_empty() || signals_b.is_empty() {
            return None;
        }

        let keywords_a = keyword_union(signals_a);
        let keywords_b = keyword_union(signals_b);
        let keyword_similarity = jaccard(&keywords_a, &keywords_b);
        let shared_keywords: BTreeSet<String> =
            keywords_a.intersection(&keywords_b).cloned().collect();

        let temporal_overlap = window_overlap(signals_a, signals_b);

        let mean_sentiment_a = mean(signals_a.iter().map(|v| v.signal.sentiment_score));
        let mean_sentiment_b = mean(signals_b.iter().map(|v| v.signal.sentiment_score));
        let sentiment_alignment = (1.0 - (mean_sentiment_a - mean_sentiment_b).abs()).max(0.0);

        let mean_engagement_a = mean(signals_a.iter().map(|v| v.signal.engagement_score));
        let mean_engagement_b = mean(signals_b.iter().map(|v| v.signal.engagement_score));
        let engagement_ratio = if mean_engagement_a.max(mean_engagement_b) <= 0.0 {
            1.0
        } else {
            mean_engagement_a.min(mean_engagement_b) / mean_engagement_a.max(mean_engagement_b)
        };

        let score = 0.4 * keyword_similarity
            + 0.3 * temporal_overlap
            + 0.2 * sentiment_alignment
            + 0.1 * engagement_ratio;

        if !score.is_finite() {
            return None;
        }

        let confidence = ((signals_a.len() + signals_b.len()) as f64 / 20.0).min(1.0);

        Some(PairCorrelation {
            platform_a: platform_a.to_string(),
            platform_b: platform_b.to_string(),
            keyword_similarity,
            temporal_overlap,
            sentiment_alignment,
            engagement_ratio,
            score,
            class: CorrelationClass::from_score(score),
            confidence,
            shared_keywords,
        })
    }

    /// Keywords shared by >= 2 correlated pairs spanning >= 3 platforms
    fn universal_trends(
        pairs: &[PairCorrelation],
        signals: &[ValidatedSignal],
    ) -> Vec<UniversalTrend> {
        let mut keyword_pairs: HashMap<&str, Vec<&PairCorrelation>> = HashMap::new();
        for pair in pairs.iter().filter(|p| p.class.is_correlated()) {
            for keyword in &pair.shared_keywords {
                keyword_pairs.entry(keyword).or_default().push(pair);
            }
        }

        let total_platforms = known_platforms().len().max(1);
        let mut trends = Vec::new();

        let mut keywords: Vec<&&str> = keyword_pairs.keys().collect();
        keywords.sort();

        for keyword in keywords {
            let pairs_for_keyword = &keyword_pairs[*keyword];
            if pairs_for_keyword.len() < 2 {
                continue;
            }

            let platforms: BTreeSet<String> = pairs_for_keyword
                .iter()
                .flat_map(|p| [p.platform_a.clone(), p.platform_b.clone()])
                .collect();
            if platforms.len() < 3 {
                continue;
            }

            // Contributing signals: any carrying the keyword on a spanning platform
            let contributors: Vec<&ValidatedSignal> = signals
                .iter()
                .filter(|v| {
                    platforms.contains(&v.signal.platform.to_lowercase())
                        && v.signal.keyword_set().contains(*keyword)
                })
                .collect();
            if contributors.is_empty() {
                continue;
            }

            let momentum =
                mean(contributors.iter().map(|v| v.signal.engagement_score)).min(10.0);

            let mut propagation: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
            for v in &contributors {
                let platform = v.signal.platform.to_lowercase();
                propagation
                    .entry(platform)
                    .and_modify(|ts| {
                        if v.signal.timestamp < *ts {
                            *ts = v.signal.timestamp;
                        }
                    })
                    .or_insert(v.signal.timestamp);
            }

            let origin_platform = propagation
                .iter()
                .min_by_key(|(_, ts)| **ts)
                .map(|(p, _)| p.clone())
                .unwrap_or_default();

            trends.push(UniversalTrend {
                keyword: keyword.to_string(),
                universality: platforms.len() as f64 / total_platforms as f64,
                momentum,
                origin_platform,
                propagation,
                pair_count: pairs_for_keyword.len(),
                signal_ids: contributors.iter().map(|v| v.signal.id).collect(),
                platforms,
            });
        }

        trends
    }
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        0.0
    } else {
        collected.iter().sum::<f64>() / collected.len() as f64
    }
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn keyword_union(signals: &[&ValidatedSignal]) -> HashSet<String> {
    signals
        .iter()
        .flat_map(|v| v.signal.keyword_set())
        .collect()
}

/// Overlap ratio between the two platforms' observation windows
///
/// Windows are padded to at least one hour so single-signal platforms still
/// overlap meaningfully with concurrent activity.
fn window_overlap(a: &[&ValidatedSignal], b: &[&ValidatedSignal]) -> f64 {
    let (start_a, end_a) = padded_window(a);
    let (start_b, end_b) = padded_window(b);

    let overlap_start = start_a.max(start_b);
    let overlap_end = end_a.min(end_b);
    if overlap_end <= overlap_start {
        return 0.0;
    }

    let overlap = (overlap_end - overlap_start).num_seconds() as f64;
    let shorter = ((end_a - start_a).num_seconds().min((end_b - start_b).num_seconds())) as f64;
    if shorter <= 0.0 {
        0.0
    } else {
        (overlap / shorter).min(1.0)
    }
}

fn padded_window(signals: &[&ValidatedSignal]) -> (DateTime<Utc>, DateTime<Utc>) {
    let mut start = signals[0].signal.timestamp;
    let mut end = start;
    for v in signals.iter().skip(1) {
        start = start.min(v.signal.timestamp);
        end = end.max(v.signal.timestamp);
    }
    if end - start < Duration::hours(1) {
        end = start + Duration::hours(1);
    }
    (start, end)
}
