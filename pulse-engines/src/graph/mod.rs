//! Graph trend engine
//!
//! Builds one ephemeral multi-relational graph per detection cycle from the
//! validated-signal snapshot, partitions it into communities and scores each
//! emerging community as a trend cluster:
//! - keyword, source and author nodes; mention, co-occurrence and
//!   lexical-similarity edges
//! - spectral embedding + centrality features feed community detection
//! - PageRank drives influence propagation, BFS over mention edges gives
//!   cascade depth
//!
//! Any numerical failure drops only the affected metric, never the cluster.

mod build;
mod community;
mod metrics;

use chrono::{DateTime, Duration, Utc};
use petgraph::graph::NodeIndex;
use pulse_core::{known_platforms, ClusterScores, GraphEdge, TrendCluster};
use pulse_core::ValidatedSignal;
use tracing::{debug, warn};

use build::TrendGraph;
use metrics::Centrality;

/// Minimum community size for a candidate cluster
const MIN_CLUSTER_SIZE: usize = 3;

/// A cluster must contain a node seen within this window
const ACTIVE_WINDOW_HOURS: i64 = 24;

/// Window for the emergence-velocity component
const RECENT_WINDOW_HOURS: i64 = 6;

/// Detects emerging trend clusters in the validated-signal snapshot
///
/// Stateless; the graph lives only for one `detect_clusters` call.
#[derive(Debug, Default)]
pub struct GraphTrendEngine;

impl GraphTrendEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn detect_clusters(&self, signals: &[ValidatedSignal]) -> Vec<TrendCluster> {
        self.detect_clusters_at(signals, Utc::now())
    }

    /// Clock-injected variant so tests can pin "now"
    pub fn detect_clusters_at(
        &self,
        signals: &[ValidatedSignal],
        now: DateTime<Utc>,
    ) -> Vec<TrendCluster> {
        let trend_graph = TrendGraph::from_signals(signals);
        let n = trend_graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let neighbors = trend_graph.undirected_neighbors();

        // Embedding failures degrade tie-breaking only
        let embedding = match metrics::spectral_embedding(&neighbors) {
            Ok(rows) => rows,
            Err(reason) => {
                warn!(%reason, "spectral embedding dropped for this cycle");
                vec![Vec::new(); n]
            }
        };
        let centrality = match metrics::centralities(&neighbors) {
            Ok(values) => values,
            Err(reason) => {
                warn!(%reason, "centrality computation dropped for this cycle");
                vec![Centrality::default(); n]
            }
        };

        let features: Vec<Vec<f64>> = embedding
            .iter()
            .zip(&centrality)
            .map(|(row, c)| {
                let mut feature = row.clone();
                feature.extend(c.as_vec());
                feature
            })
            .collect();

        let labels = community::detect_communities(&neighbors, &features);
        let influence = metrics::page_rank(&trend_graph);
        let max_influence = influence.iter().fold(0.0_f64, |acc, v| acc.max(*v));

        let community_count = labels.iter().max().map(|m| m + 1).unwrap_or(0);
        let mut members: Vec<Vec<NodeIndex>> = vec![Vec::new(); community_count];
        for (node, &label) in labels.iter().enumerate() {
            members[label].push(NodeIndex::new(node));
        }

        let active_floor = now - Duration::hours(ACTIVE_WINDOW_HOURS);
        let mut clusters = Vec::new();

        for community in members {
            if community.len() < MIN_CLUSTER_SIZE {
                continue;
            }
            let is_emerging = community
                .iter()
                .any(|&ix| trend_graph.graph[ix].last_seen >= active_floor);
            if !is_emerging {
                continue;
            }

            clusters.push(score_cluster(
                &trend_graph,
                &community,
                &influence,
                max_influence,
                now,
            ));
        }

        // Stable ranking: score, then lead keyword
        clusters.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| {
                let a_key = a.top_keywords(1).into_iter().next().unwrap_or_default();
                let b_key = b.top_keywords(1).into_iter().next().unwrap_or_default();
                a_key.cmp(&b_key)
            })
        });

        debug!(
            nodes = n,
            communities = community_count,
            clusters = clusters.len(),
            "graph cycle complete"
        );
        clusters
    }
}

fn score_cluster(
    trend_graph: &TrendGraph,
    members: &[NodeIndex],
    influence: &[f64],
    max_influence: f64,
    now: DateTime<Utc>,
) -> TrendCluster {
    let graph = &trend_graph.graph;
    let size = members.len();
    let member_set: std::collections::HashSet<NodeIndex> = members.iter().copied().collect();

    let nodes: Vec<_> = members.iter().map(|&ix| graph[ix].clone()).collect();

    let mut edges = Vec::new();
    for edge in graph.edge_indices() {
        if let Some((from, to)) = graph.edge_endpoints(edge) {
            if member_set.contains(&from) && member_set.contains(&to) {
                let attrs = &graph[edge];
                edges.push(GraphEdge {
                    from: graph[from].id.clone(),
                    to: graph[to].id.clone(),
                    kind: attrs.kind,
                    weight: attrs.weight,
                    timestamp: attrs.timestamp,
                });
            }
        }
    }

    let recent_floor = now - Duration::hours(RECENT_WINDOW_HOURS);
    let recent = nodes.iter().filter(|n| n.last_seen >= recent_floor).count();
    let emergence_velocity = recent as f64 / size as f64;

    let max_edges = (size * (size - 1)) / 2;
    let network_density = if max_edges > 0 {
        (edges.len() as f64 / max_edges as f64).min(1.0)
    } else {
        0.0
    };

    let influence_propagation = if max_influence > f64::EPSILON {
        let mean: f64 =
            members.iter().map(|&ix| influence[ix.index()]).sum::<f64>() / size as f64;
        (mean / max_influence).min(1.0)
    } else {
        0.0
    };

    // Tight clusters in time cohere; spread beyond 24h decays to zero
    let oldest = nodes.iter().map(|n| n.last_seen).min();
    let newest = nodes.iter().map(|n| n.last_seen).max();
    let temporal_coherence = match (oldest, newest) {
        (Some(oldest), Some(newest)) => {
            let span_hours = (newest - oldest).num_milliseconds() as f64 / 3_600_000.0;
            (1.0 - span_hours / ACTIVE_WINDOW_HOURS as f64).max(0.0)
        }
        _ => 0.0,
    };

    let platforms: std::collections::HashSet<&String> =
        nodes.iter().flat_map(|n| n.platforms.iter()).collect();
    let cross_platform_reach =
        (platforms.len() as f64 / known_platforms().len() as f64).min(1.0);

    let cascade_depth = members
        .iter()
        .map(|&ix| metrics::cascade_depth(trend_graph, ix))
        .max()
        .unwrap_or(0);

    let scores = ClusterScores {
        emergence_velocity,
        network_density,
        influence_propagation,
        temporal_coherence,
        cross_platform_reach,
    };
    let score = scores.combined();

    TrendCluster {
        nodes,
        edges,
        scores,
        score,
        cascade_depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{NodeKind, QualityMetrics, RiskTier, Signal, VerificationStatus};

    fn validated(
        platform: &str,
        source_id: &str,
        keywords: &[&str],
        engagement: f64,
        hours_ago: i64,
    ) -> ValidatedSignal {
        let signal = Signal::builder(platform, source_id)
            .content("signal content")
            .keywords(keywords.iter().copied())
            .engagement(engagement)
            .sentiment(0.4)
            .timestamp(Utc::now() - Duration::hours(hours_ago))
            .extension("author", serde_json::json!(format!("{source_id}-author")))
            .build()
            .unwrap();
        ValidatedSignal {
            signal,
            quality: QualityMetrics::fallback(),
            status: VerificationStatus::Verified,
            risk: RiskTier::Low,
            validated_at: Utc::now(),
        }
    }

    fn fresh_snapshot() -> Vec<ValidatedSignal> {
        vec![
            validated("reddit", "r/startups", &["ai", "automation", "agents"], 120.0, 1),
            validated("hackernews", "hn-feed", &["ai", "automation"], 300.0, 2),
            validated("producthunt", "ph-launch", &["automation", "agents"], 80.0, 3),
        ]
    }

    #[test]
    fn test_emerging_cluster_detected() {
        let clusters = GraphTrendEngine::new().detect_clusters(&fresh_snapshot());
        assert!(!clusters.is_empty());

        let top = &clusters[0];
        assert!(top.nodes.len() >= MIN_CLUSTER_SIZE);
        assert!(top.score > 0.0 && top.score <= 1.0);
        assert!(top.scores.network_density > 0.0);
        assert!(top.scores.cross_platform_reach > 0.0);
        assert!(top.top_keywords(3).contains(&"automation".to_string()));
    }

    #[test]
    fn test_cascade_depth_spans_mention_chain() {
        // author -> keyword -> source is a depth-2 cascade
        let clusters = GraphTrendEngine::new().detect_clusters(&fresh_snapshot());
        assert!(clusters.iter().any(|c| c.cascade_depth >= 2));
    }

    #[test]
    fn test_stale_cluster_filtered() {
        let stale: Vec<_> = fresh_snapshot()
            .into_iter()
            .map(|mut v| {
                v.signal.timestamp = Utc::now() - Duration::hours(72);
                v
            })
            .collect();
        let now = Utc::now();
        let clusters = GraphTrendEngine::new().detect_clusters_at(&stale, now);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_empty_snapshot_yields_no_clusters() {
        assert!(GraphTrendEngine::new().detect_clusters(&[]).is_empty());
    }

    #[test]
    fn test_small_communities_filtered() {
        // A lone keyword on one platform: keyword + source + author = 3 nodes,
        // but two unrelated keywords form communities under the minimum
        let signals = vec![validated("reddit", "solo", &["niche"], 5.0, 1)];
        let clusters = GraphTrendEngine::new().detect_clusters(&signals);
        for cluster in &clusters {
            assert!(cluster.nodes.len() >= MIN_CLUSTER_SIZE);
        }
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let snapshot = fresh_snapshot();
        let engine = GraphTrendEngine::new();
        let now = Utc::now();

        let first = engine.detect_clusters_at(&snapshot, now);
        let second = engine.detect_clusters_at(&snapshot, now);

        let order = |clusters: &[TrendCluster]| -> Vec<Vec<String>> {
            clusters.iter().map(|c| c.top_keywords(5)).collect()
        };
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn test_cluster_keeps_internal_edges_only() {
        let clusters = GraphTrendEngine::new().detect_clusters(&fresh_snapshot());
        for cluster in &clusters {
            let ids: std::collections::HashSet<_> =
                cluster.nodes.iter().map(|n| n.id.as_str()).collect();
            for edge in &cluster.edges {
                assert!(ids.contains(edge.from.as_str()));
                assert!(ids.contains(edge.to.as_str()));
            }
        }
    }

    #[test]
    fn test_source_nodes_present_in_cluster() {
        let clusters = GraphTrendEngine::new().detect_clusters(&fresh_snapshot());
        let top = &clusters[0];
        assert!(top.nodes.iter().any(|n| n.kind == NodeKind::Source));
    }
}
