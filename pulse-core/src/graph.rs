//! Trend graph model
//!
//! One ephemeral multi-relational graph is built per detection cycle from the
//! validated-signal snapshot. Nodes are keywords, sources and authors; edges
//! capture mention, co-occurrence and lexical-similarity relationships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Node categories in the trend graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Keyword,
    Source,
    Author,
}

/// A node in the per-cycle trend graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable identifier, e.g. "keyword:automation" or "source:reddit"
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// Aggregate mention frequency (keywords) or signal count (sources)
    pub frequency: u32,
    /// Summed engagement across contributing signals
    pub engagement_sum: f64,
    /// Platforms this node was observed on
    pub platforms: HashSet<String>,
    /// Most recent contributing signal timestamp
    pub last_seen: DateTime<Utc>,
}

/// Edge categories in the trend graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// keyword -> source
    MentionedIn,
    /// author -> keyword
    Mentions,
    /// keyword <-> keyword co-occurrence
    CoOccurs,
    /// keyword <-> keyword lexical similarity
    SimilarTo,
}

/// A weighted, timestamped edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

/// Component scores of a trend cluster, each in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterScores {
    pub emergence_velocity: f64,
    pub network_density: f64,
    pub influence_propagation: f64,
    pub temporal_coherence: f64,
    pub cross_platform_reach: f64,
}

impl ClusterScores {
    /// Weighted combination: 0.25 / 0.20 / 0.25 / 0.15 / 0.15
    pub fn combined(&self) -> f64 {
        0.25 * self.emergence_velocity
            + 0.20 * self.network_density
            + 0.25 * self.influence_propagation
            + 0.15 * self.temporal_coherence
            + 0.15 * self.cross_platform_reach
    }
}

/// A community of related nodes scored as a candidate trend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendCluster {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub scores: ClusterScores,
    /// Combined cluster score
    pub score: f64,
    /// Maximum cascade depth reached from any node in the cluster
    pub cascade_depth: usize,
}

impl TrendCluster {
    /// Keyword labels in the cluster, sorted by frequency descending
    pub fn top_keywords(&self, limit: usize) -> Vec<String> {
        let mut keywords: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Keyword)
            .collect();
        keywords.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.label.cmp(&b.label)));
        keywords.into_iter().take(limit).map(|n| n.label.clone()).collect()
    }

    /// Distinct platforms touched by the cluster
    pub fn platforms(&self) -> HashSet<String> {
        self.nodes
            .iter()
            .flat_map(|n| n.platforms.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: NodeKind, frequency: u32) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind,
            label: id.split(':').nth(1).unwrap_or(id).to_string(),
            frequency,
            engagement_sum: 0.0,
            platforms: HashSet::new(),
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn test_combined_score_weights() {
        let scores = ClusterScores {
            emergence_velocity: 1.0,
            network_density: 1.0,
            influence_propagation: 1.0,
            temporal_coherence: 1.0,
            cross_platform_reach: 1.0,
        };
        assert!((scores.combined() - 1.0).abs() < 1e-9);

        let scores = ClusterScores {
            emergence_velocity: 1.0,
            ..Default::default()
        };
        assert!((scores.combined() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_top_keywords_ordering() {
        let cluster = TrendCluster {
            nodes: vec![
                node("keyword:ai", NodeKind::Keyword, 3),
                node("keyword:automation", NodeKind::Keyword, 7),
                node("source:reddit", NodeKind::Source, 10),
            ],
            edges: vec![],
            scores: ClusterScores::default(),
            score: 0.0,
            cascade_depth: 0,
        };

        let top = cluster.top_keywords(2);
        assert_eq!(top, vec!["automation".to_string(), "ai".to_string()]);
    }
}
