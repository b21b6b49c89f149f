//! Opportunity Aggregator
//!
//! The single join point of a detection cycle. Merges whatever the
//! correlation, temporal and graph engines delivered into a ranked
//! opportunity list, falling back to plain keyword grouping when the richer
//! analytics ran degraded. Zero validated signals yield a deterministic,
//! explicitly flagged placeholder instead of an empty result.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

use pulse_core::{
    rank_opportunities, CompetitionDensity, DegradationFlags, EmergenceStage, EngineError,
    HeuristicsConfig, MarketSize, MarketTiming, NodeKind, OpportunitySource, TemporalPattern,
    TrendCluster, TrendOpportunity, ValidatedSignal,
};

use crate::correlation::{CorrelationResult, UniversalTrend};

/// Momentum is capped at this ceiling
const MOMENTUM_CAP: f64 = 10.0;

/// Signal count at which confidence saturates
const CONFIDENCE_SATURATION: f64 = 10.0;

/// Keywords shown in generated titles
const TITLE_KEYWORDS: usize = 3;

/// Merges analytic outputs into ranked opportunities
pub struct OpportunityAggregator {
    config: HeuristicsConfig,
}

impl OpportunityAggregator {
    pub fn new(config: HeuristicsConfig) -> Self {
        Self { config }
    }

    /// Aggregate a cycle
    ///
    /// `None` for an analytic input means that stage ran degraded; the
    /// corresponding stage outcome is expected to already be set on `flags`.
    pub fn aggregate(
        &self,
        validated: &[ValidatedSignal],
        correlation: Option<&CorrelationResult>,
        temporal: Option<&[TemporalPattern]>,
        graph: Option<&[TrendCluster]>,
        flags: &mut DegradationFlags,
    ) -> Vec<TrendOpportunity> {
        self.aggregate_at(validated, correlation, temporal, graph, flags, Utc::now())
    }

    /// Clock-injected variant so tests can pin "now"
    pub fn aggregate_at(
        &self,
        validated: &[ValidatedSignal],
        correlation: Option<&CorrelationResult>,
        temporal: Option<&[TemporalPattern]>,
        graph: Option<&[TrendCluster]>,
        flags: &mut DegradationFlags,
        now: DateTime<Utc>,
    ) -> Vec<TrendOpportunity> {
        if validated.is_empty() {
            warn!(
                "{}",
                EngineError::InsufficientData("no validated signals this cycle".to_string())
            );
            flags.insufficient_data = true;
            flags.placeholder = true;
            return placeholder_set(now);
        }

        let timing_hint = temporal.and_then(timing_hint);
        let mut opportunities = Vec::new();
        let mut claimed_keywords: Vec<String> = Vec::new();

        if let Some(clusters) = graph {
            for cluster in clusters {
                if let Some(opp) =
                    self.from_cluster(cluster, validated, timing_hint, now)
                {
                    claimed_keywords.extend(opp.keywords.iter().cloned());
                    opportunities.push(opp);
                }
            }
        }

        if let Some(result) = correlation {
            for trend in &result.universal_trends {
                if claimed_keywords.contains(&trend.keyword) {
                    continue;
                }
                if let Some(opp) = self.from_universal_trend(trend, validated, timing_hint, now) {
                    claimed_keywords.push(trend.keyword.clone());
                    opportunities.push(opp);
                }
            }
        }

        // Plain keyword grouping when the richer analytics gave nothing
        if opportunities.is_empty() {
            opportunities = self.keyword_fallback(validated, timing_hint, now);
        }

        rank_opportunities(&mut opportunities);
        debug!(
            opportunities = opportunities.len(),
            degraded = flags.any_degraded(),
            "aggregation complete"
        );
        opportunities
    }

    fn from_cluster(
        &self,
        cluster: &TrendCluster,
        validated: &[ValidatedSignal],
        timing_hint: Option<MarketTiming>,
        now: DateTime<Utc>,
    ) -> Option<TrendOpportunity> {
        let keywords: Vec<String> = cluster
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Keyword)
            .map(|n| n.label.clone())
            .collect();

        let contributing: Vec<&ValidatedSignal> = validated
            .iter()
            .filter(|v| {
                let set = v.signal.keyword_set();
                keywords.iter().any(|k| set.contains(k.as_str()))
            })
            .collect();
        if contributing.is_empty() {
            return None;
        }

        let lead = cluster.top_keywords(TITLE_KEYWORDS);
        let title = format!("Trend cluster: {}", lead.join(" + "));
        let description = format!(
            "{} related nodes across {} platforms, cluster score {:.2}, cascade depth {}",
            cluster.nodes.len(),
            cluster.platforms().len(),
            cluster.score,
            cluster.cascade_depth,
        );

        Some(self.assemble(
            title,
            description,
            keywords,
            &contributing,
            OpportunitySource::GraphCluster {
                cluster_score: cluster.score,
                cascade_depth: cluster.cascade_depth,
            },
            timing_hint,
            now,
        ))
    }

    fn from_universal_trend(
        &self,
        trend: &UniversalTrend,
        validated: &[ValidatedSignal],
        timing_hint: Option<MarketTiming>,
        now: DateTime<Utc>,
    ) -> Option<TrendOpportunity> {
        let contributing: Vec<&ValidatedSignal> = validated
            .iter()
            .filter(|v| v.signal.keyword_set().contains(&trend.keyword))
            .collect();
        if contributing.is_empty() {
            return None;
        }

        let title = format!("Universal trend: {}", trend.keyword);
        let description = format!(
            "\"{}\" corroborated on {} platforms, first seen on {}",
            trend.keyword,
            trend.platforms.len(),
            trend.origin_platform,
        );

        Some(self.assemble(
            title,
            description,
            vec![trend.keyword.clone()],
            &contributing,
            OpportunitySource::UniversalTrend {
                universality: trend.universality,
                origin_platform: trend.origin_platform.clone(),
            },
            timing_hint,
            now,
        ))
    }

    fn keyword_fallback(
        &self,
        validated: &[ValidatedSignal],
        timing_hint: Option<MarketTiming>,
        now: DateTime<Utc>,
    ) -> Vec<TrendOpportunity> {
        // BTreeMap keeps group iteration deterministic
        let mut groups: BTreeMap<String, Vec<&ValidatedSignal>> = BTreeMap::new();
        for v in validated {
            for keyword in v.signal.keyword_set() {
                groups.entry(keyword).or_default().push(v);
            }
        }

        groups
            .into_iter()
            .filter(|(_, members)| members.len() >= self.config.min_keyword_group)
            .map(|(keyword, members)| {
                let title = format!("Keyword group: {keyword}");
                let description =
                    format!("{} signals mentioning \"{keyword}\"", members.len());
                self.assemble(
                    title,
                    description,
                    vec![keyword.clone()],
                    &members,
                    OpportunitySource::KeywordGroup { keyword },
                    timing_hint,
                    now,
                )
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        title: String,
        description: String,
        keywords: Vec<String>,
        contributing: &[&ValidatedSignal],
        origin: OpportunitySource,
        timing_hint: Option<MarketTiming>,
        now: DateTime<Utc>,
    ) -> TrendOpportunity {
        let momentum = self.momentum_of(contributing, now);
        let confidence = confidence_of(contributing.len());

        let mut platforms: Vec<String> = contributing
            .iter()
            .map(|v| v.signal.platform.clone())
            .collect();
        platforms.sort();
        platforms.dedup();

        let content: String = contributing
            .iter()
            .map(|v| v.signal.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let avg_credibility = contributing
            .iter()
            .map(|v| v.signal.credibility_weight)
            .sum::<f64>()
            / contributing.len() as f64;
        let latest_signal_at = contributing
            .iter()
            .map(|v| v.signal.timestamp)
            .max()
            .unwrap_or(now);

        TrendOpportunity {
            id: Uuid::new_v4(),
            title,
            description,
            momentum,
            confidence,
            timing: self.classify_timing(&content, timing_hint),
            competition: self.classify_competition(&content),
            market_size: self.classify_market_size(&content),
            origin,
            platforms,
            signal_ids: contributing.iter().map(|v| v.signal.id).collect(),
            keywords,
            avg_credibility,
            latest_signal_at,
            discovered_at: now,
        }
    }

    /// Time-decayed, platform- and credibility-weighted mean engagement
    ///
    /// weight = max(0.1, 1 - hoursAgo/24) * platformBaseWeight * credibility;
    /// momentum = sum(weight * engagement) / sum(weight), capped at 10.
    pub fn momentum_of(&self, contributing: &[&ValidatedSignal], now: DateTime<Utc>) -> f64 {
        let mut weighted_engagement = 0.0;
        let mut total_weight = 0.0;

        for v in contributing {
            let signal = &v.signal;
            let decay = (1.0 - signal.age_hours(now) / 24.0).max(0.1);
            let weight = decay
                * self.config.platform_base_weight(&signal.platform)
                * signal.credibility_weight;
            weighted_engagement += weight * signal.engagement_score;
            total_weight += weight;
        }

        if total_weight <= f64::EPSILON {
            return 0.0;
        }
        (weighted_engagement / total_weight).min(MOMENTUM_CAP)
    }

    fn classify_timing(&self, content: &str, hint: Option<MarketTiming>) -> MarketTiming {
        let early = count_hits(content, &self.config.early_market_indicators);
        let hot = count_hits(content, &self.config.hot_market_indicators);
        let saturated = count_hits(content, &self.config.saturated_market_indicators);

        if early == 0 && hot == 0 && saturated == 0 {
            return hint.unwrap_or(MarketTiming::Emerging);
        }
        if saturated >= hot && saturated >= early {
            MarketTiming::Saturated
        } else if hot >= early {
            MarketTiming::Hot
        } else {
            MarketTiming::Early
        }
    }

    fn classify_competition(&self, content: &str) -> CompetitionDensity {
        let low = count_hits(content, &self.config.low_competition_indicators);
        let high = count_hits(content, &self.config.high_competition_indicators);
        if high > low {
            CompetitionDensity::High
        } else if low > high {
            CompetitionDensity::Low
        } else {
            CompetitionDensity::Medium
        }
    }

    fn classify_market_size(&self, content: &str) -> MarketSize {
        let large = count_hits(content, &self.config.large_market_indicators);
        let niche = count_hits(content, &self.config.niche_market_indicators);
        if large > niche {
            if large >= 3 {
                MarketSize::Massive
            } else {
                MarketSize::Large
            }
        } else if niche > large {
            MarketSize::Niche
        } else {
            MarketSize::Moderate
        }
    }
}

/// min(1, signalCount / 10)
pub fn confidence_of(signal_count: usize) -> f64 {
    (signal_count as f64 / CONFIDENCE_SATURATION).min(1.0)
}

/// Strongest emergence-family pattern maps its stage onto market timing
fn timing_hint(patterns: &[TemporalPattern]) -> Option<MarketTiming> {
    patterns
        .iter()
        .filter_map(|p| match p {
            TemporalPattern::Emergence {
                strength,
                forecast: Some(forecast),
                ..
            }
            | TemporalPattern::Trend {
                strength,
                forecast: Some(forecast),
                ..
            } => Some((*strength, forecast.stage)),
            _ => None,
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, stage)| match stage {
            EmergenceStage::Inception => MarketTiming::Early,
            EmergenceStage::Growth => MarketTiming::Emerging,
            EmergenceStage::Acceleration => MarketTiming::Hot,
            EmergenceStage::Maturity => MarketTiming::Saturated,
        })
}

fn count_hits(content: &str, indicators: &[String]) -> usize {
    indicators
        .iter()
        .filter(|needle| content.contains(needle.as_str()))
        .count()
}

/// The deterministic result for a cycle that observed nothing
///
/// Distinguishes "no signal observed" from "system failure": the entry is
/// explicit, stable across runs and flagged via `OpportunitySource::Placeholder`.
fn placeholder_set(now: DateTime<Utc>) -> Vec<TrendOpportunity> {
    vec![TrendOpportunity {
        id: Uuid::nil(),
        title: "No signals observed".to_string(),
        description: "No validated signals were available this cycle; collectors may be \
                      degraded or the observation window was empty."
            .to_string(),
        momentum: 0.0,
        confidence: 0.0,
        timing: MarketTiming::Emerging,
        competition: CompetitionDensity::Medium,
        market_size: MarketSize::Moderate,
        origin: OpportunitySource::Placeholder,
        platforms: Vec::new(),
        signal_ids: Vec::new(),
        keywords: Vec::new(),
        avg_credibility: 0.0,
        latest_signal_at: now,
        discovered_at: now,
    }]
}
