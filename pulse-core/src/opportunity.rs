//! Trend opportunities - the terminal artifact of a detection cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How far along the market is for an opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTiming {
    Early,
    Emerging,
    Hot,
    Saturated,
}

/// How crowded the space looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionDensity {
    Low,
    Medium,
    High,
}

/// Qualitative market-size estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSize {
    Niche,
    Moderate,
    Large,
    Massive,
}

/// Which analytic path produced an opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum OpportunitySource {
    /// Fallback keyword grouping over validated signals
    KeywordGroup { keyword: String },
    /// Topological trend cluster from the graph engine
    GraphCluster { cluster_score: f64, cascade_depth: usize },
    /// Cross-platform universal trend from the correlation engine
    UniversalTrend {
        universality: f64,
        origin_platform: String,
    },
    /// Deterministic placeholder emitted when no signals were observed
    Placeholder,
}

/// A ranked, explainable trend opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendOpportunity {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Time-decayed, credibility-weighted engagement, in [0, 10]
    pub momentum: f64,
    /// min(1, contributing signals / 10)
    pub confidence: f64,
    pub timing: MarketTiming,
    pub competition: CompetitionDensity,
    pub market_size: MarketSize,
    pub origin: OpportunitySource,
    /// Platforms the contributing signals came from
    pub platforms: Vec<String>,
    /// IDs of contributing signals
    pub signal_ids: Vec<Uuid>,
    pub keywords: Vec<String>,
    /// Mean credibility weight across contributing signals
    pub avg_credibility: f64,
    /// Most recent contributing signal timestamp (ranking tie-break)
    pub latest_signal_at: DateTime<Utc>,
    pub discovered_at: DateTime<Utc>,
}

impl TrendOpportunity {
    /// Ranking key: momentum * confidence
    pub fn rank_score(&self) -> f64 {
        self.momentum * self.confidence
    }
}

/// Sort opportunities by rank score descending, tie-break by most recent
/// contributing signal, then title for full determinism.
pub fn rank_opportunities(opportunities: &mut [TrendOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.rank_score()
            .total_cmp(&a.rank_score())
            .then_with(|| b.latest_signal_at.cmp(&a.latest_signal_at))
            .then_with(|| a.title.cmp(&b.title))
    });
}
