//! Per-cycle trend graph construction

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use pulse_core::{EdgeKind, GraphNode, NodeKind, ValidatedSignal};
use std::collections::{HashMap, HashSet};

/// Lexical Jaccard floor for a `similar_to` edge between keywords
const SIMILARITY_FLOOR: f64 = 0.3;

/// Attributes carried on every graph edge
#[derive(Debug, Clone)]
pub(crate) struct EdgeAttrs {
    pub kind: EdgeKind,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

/// The ephemeral multi-relational graph built from one validated snapshot
pub(crate) struct TrendGraph {
    pub graph: DiGraph<GraphNode, EdgeAttrs>,
}

impl TrendGraph {
    pub fn from_signals(signals: &[ValidatedSignal]) -> Self {
        let mut builder = Self {
            graph: DiGraph::new(),
        };
        let mut index: HashMap<String, NodeIndex> = HashMap::new();

        for validated in signals {
            let signal = &validated.signal;
            let ts = signal.timestamp;
            let engagement = signal.engagement_score;

            let source_ix = builder.upsert_node(
                &mut index,
                format!("source:{}", signal.platform),
                NodeKind::Source,
                signal.platform.clone(),
                engagement,
                &signal.platform,
                ts,
            );

            let author_ix = signal
                .extensions
                .map
                .get("author")
                .and_then(|v| v.as_str())
                .map(|author| {
                    builder.upsert_node(
                        &mut index,
                        format!("author:{author}"),
                        NodeKind::Author,
                        author.to_string(),
                        engagement,
                        &signal.platform,
                        ts,
                    )
                });

            // Deduplicated, sorted keywords make edge directions deterministic
            let mut keywords: Vec<String> = signal.keyword_set().into_iter().collect();
            keywords.sort();

            let mut keyword_indices = Vec::with_capacity(keywords.len());
            for keyword in &keywords {
                let kw_ix = builder.upsert_node(
                    &mut index,
                    format!("keyword:{keyword}"),
                    NodeKind::Keyword,
                    keyword.clone(),
                    engagement,
                    &signal.platform,
                    ts,
                );
                keyword_indices.push(kw_ix);

                builder.accumulate_edge(kw_ix, source_ix, EdgeKind::MentionedIn, 1.0, ts);
                if let Some(author_ix) = author_ix {
                    builder.accumulate_edge(
                        author_ix,
                        kw_ix,
                        EdgeKind::Mentions,
                        engagement / 100.0,
                        ts,
                    );
                }
            }

            // Keyword co-occurrence within one signal, one edge per ordered pair
            for (i, &a) in keyword_indices.iter().enumerate() {
                for &b in &keyword_indices[i + 1..] {
                    builder.accumulate_edge(a, b, EdgeKind::CoOccurs, 1.0, ts);
                }
            }
        }

        builder.link_similar_keywords();
        builder
    }

    fn upsert_node(
        &mut self,
        index: &mut HashMap<String, NodeIndex>,
        id: String,
        kind: NodeKind,
        label: String,
        engagement: f64,
        platform: &str,
        ts: DateTime<Utc>,
    ) -> NodeIndex {
        if let Some(&ix) = index.get(&id) {
            let node = &mut self.graph[ix];
            node.frequency += 1;
            node.engagement_sum += engagement;
            node.platforms.insert(platform.to_string());
            if ts > node.last_seen {
                node.last_seen = ts;
            }
            return ix;
        }

        let ix = self.graph.add_node(GraphNode {
            id: id.clone(),
            kind,
            label,
            frequency: 1,
            engagement_sum: engagement,
            platforms: HashSet::from([platform.to_string()]),
            last_seen: ts,
        });
        index.insert(id, ix);
        ix
    }

    fn accumulate_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        kind: EdgeKind,
        weight: f64,
        ts: DateTime<Utc>,
    ) {
        if let Some(edge) = self.graph.find_edge(from, to) {
            let attrs = &mut self.graph[edge];
            if attrs.kind == kind {
                attrs.weight += weight;
                if ts > attrs.timestamp {
                    attrs.timestamp = ts;
                }
                return;
            }
        }
        self.graph.add_edge(from, to, EdgeAttrs { kind, weight, timestamp: ts });
    }

    /// Connect lexically similar keywords that never co-occurred
    fn link_similar_keywords(&mut self) {
        let keyword_nodes: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&ix| self.graph[ix].kind == NodeKind::Keyword)
            .collect();

        let mut to_add = Vec::new();
        for (i, &a) in keyword_nodes.iter().enumerate() {
            for &b in &keyword_nodes[i + 1..] {
                if self.graph.find_edge(a, b).is_some() || self.graph.find_edge(b, a).is_some() {
                    continue;
                }
                let similarity = bigram_jaccard(&self.graph[a].label, &self.graph[b].label);
                if similarity > SIMILARITY_FLOOR {
                    let ts = self.graph[a].last_seen.max(self.graph[b].last_seen);
                    to_add.push((a, b, similarity, ts));
                }
            }
        }
        for (a, b, similarity, ts) in to_add {
            self.graph
                .add_edge(a, b, EdgeAttrs { kind: EdgeKind::SimilarTo, weight: similarity, timestamp: ts });
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Undirected weighted neighbor lists, for centrality and clustering
    pub fn undirected_neighbors(&self) -> Vec<Vec<(usize, f64)>> {
        let mut neighbors = vec![Vec::new(); self.graph.node_count()];
        for edge in self.graph.edge_indices() {
            if let Some((a, b)) = self.graph.edge_endpoints(edge) {
                let weight = self.graph[edge].weight.max(f64::EPSILON);
                neighbors[a.index()].push((b.index(), weight));
                neighbors[b.index()].push((a.index(), weight));
            }
        }
        neighbors
    }
}

/// Jaccard similarity over character bigrams
fn bigram_jaccard(a: &str, b: &str) -> f64 {
    let bigrams = |s: &str| -> HashSet<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let set_a = bigrams(a);
    let set_b = bigrams(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pulse_core::{QualityMetrics, RiskTier, Signal, VerificationStatus};

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
            .timestamp(Utc::now() - Duration::hours(hours_ago))
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

    #[test]
    fn test_nodes_and_mention_edges_built() {
        let signals = vec![
            validated("reddit", "r/startups", &["ai", "automation"], 100.0, 1),
            validated("hackernews", "hn-feed", &["ai"], 50.0, 2),
        ];
        let trend_graph = TrendGraph::from_signals(&signals);

        // keywords: ai, automation; sources: reddit, hackernews
        assert_eq!(trend_graph.node_count(), 4);

        let ai = trend_graph
            .graph
            .node_indices()
            .find(|&ix| trend_graph.graph[ix].id == "keyword:ai")
            .unwrap();
        assert_eq!(trend_graph.graph[ai].frequency, 2);
        assert_eq!(trend_graph.graph[ai].platforms.len(), 2);
    }

    #[test]
    fn test_co_occurrence_accumulates() {
        let signals = vec![
            validated("reddit", "a", &["ai", "automation"], 10.0, 1),
            validated("reddit", "b", &["ai", "automation"], 10.0, 1),
        ];
        let trend_graph = TrendGraph::from_signals(&signals);

        let co_occurs = trend_graph
            .graph
            .edge_indices()
            .find(|&e| trend_graph.graph[e].kind == EdgeKind::CoOccurs)
            .expect("co_occurs edge missing");
        assert_eq!(trend_graph.graph[co_occurs].weight, 2.0);
    }

    #[test]
    fn test_similar_keywords_linked() {
        let signals = vec![
            validated("reddit", "a", &["automation"], 10.0, 1),
            validated("hackernews", "b", &["automations"], 10.0, 1),
        ];
        let trend_graph = TrendGraph::from_signals(&signals);

        assert!(trend_graph
            .graph
            .edge_indices()
            .any(|e| trend_graph.graph[e].kind == EdgeKind::SimilarTo));
    }

    #[test]
    fn test_bigram_jaccard_bounds() {
        assert_eq!(bigram_jaccard("ai", "ai"), 1.0);
        assert_eq!(bigram_jaccard("ai", "xz"), 0.0);
        let partial = bigram_jaccard("automation", "automations");
        assert!(partial > 0.3 && partial < 1.0);
    }
}
