//! Community detection over the trend graph
//!
//! Weighted label propagation with a deterministic sweep order. Ties between
//! candidate labels are broken by embedding similarity, then by smallest
//! label. If propagation fails to stabilize, connected components are used
//! instead so a cycle always gets some partition.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;
use tracing::warn;

const MAX_SWEEPS: usize = 20;

/// Assign a community label to every node
///
/// `features` are per-node embedding-plus-centrality vectors; they only
/// influence tie-breaking and may be empty.
pub(crate) fn detect_communities(
    neighbors: &[Vec<(usize, f64)>],
    features: &[Vec<f64>],
) -> Vec<usize> {
    let n = neighbors.len();
    let mut labels: Vec<usize> = (0..n).collect();

    for _ in 0..MAX_SWEEPS {
        let mut changed = false;

        for node in 0..n {
            if neighbors[node].is_empty() {
                continue;
            }

            // Summed edge weight per neighboring label
            let mut support: HashMap<usize, f64> = HashMap::new();
            for &(neighbor, weight) in &neighbors[node] {
                *support.entry(labels[neighbor]).or_insert(0.0) += weight;
            }

            let best_weight = support.values().fold(0.0_f64, |acc, w| acc.max(*w));
            let mut candidates: Vec<usize> = support
                .iter()
                .filter(|(_, w)| (*w - best_weight).abs() < 1e-9)
                .map(|(label, _)| *label)
                .collect();
            candidates.sort_unstable();

            let new_label = if candidates.len() == 1 {
                candidates[0]
            } else {
                break_tie(node, &candidates, neighbors, features, &labels)
            };

            if new_label != labels[node] {
                labels[node] = new_label;
                changed = true;
            }
        }

        if !changed {
            return compact(labels);
        }
    }

    warn!(sweeps = MAX_SWEEPS, "label propagation did not stabilize, using connected components");
    connected_components(neighbors)
}

/// Among tied labels, prefer the one whose supporting neighbor is most
/// similar to this node in feature space
fn break_tie(
    node: usize,
    candidates: &[usize],
    neighbors: &[Vec<(usize, f64)>],
    features: &[Vec<f64>],
    labels: &[usize],
) -> usize {
    let mut best = candidates[0];
    let mut best_similarity = f64::NEG_INFINITY;

    for &candidate in candidates {
        let similarity = neighbors[node]
            .iter()
            .filter(|(neighbor, _)| labels[*neighbor] == candidate)
            .map(|(neighbor, _)| cosine(&features[node], &features[*neighbor]))
            .fold(f64::NEG_INFINITY, f64::max);
        if similarity > best_similarity + 1e-12 {
            best_similarity = similarity;
            best = candidate;
        }
    }
    best
}

pub(crate) fn connected_components(neighbors: &[Vec<(usize, f64)>]) -> Vec<usize> {
    let n = neighbors.len();
    let mut union_find = UnionFind::<usize>::new(n);
    for (node, adjacent) in neighbors.iter().enumerate() {
        for &(neighbor, _) in adjacent {
            union_find.union(node, neighbor);
        }
    }
    compact((0..n).map(|i| union_find.find(i)).collect())
}

/// Renumber labels densely in first-appearance order
fn compact(labels: Vec<usize>) -> Vec<usize> {
    let mut mapping = HashMap::new();
    labels
        .into_iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(label).or_insert(next)
        })
        .collect()
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles joined by nothing
    fn two_triangles() -> Vec<Vec<(usize, f64)>> {
        vec![
            vec![(1, 1.0), (2, 1.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(0, 1.0), (1, 1.0)],
            vec![(4, 1.0), (5, 1.0)],
            vec![(3, 1.0), (5, 1.0)],
            vec![(3, 1.0), (4, 1.0)],
        ]
    }

    #[test]
    fn test_separates_disconnected_cliques() {
        let neighbors = two_triangles();
        let features = vec![Vec::new(); neighbors.len()];
        let labels = detect_communities(&neighbors, &features);

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let neighbors = two_triangles();
        let features = vec![Vec::new(); neighbors.len()];
        let first = detect_communities(&neighbors, &features);
        let second = detect_communities(&neighbors, &features);
        assert_eq!(first, second);
    }

    #[test]
    fn test_isolated_nodes_keep_own_label() {
        let neighbors: Vec<Vec<(usize, f64)>> = vec![Vec::new(), Vec::new()];
        let labels = detect_communities(&neighbors, &[Vec::new(), Vec::new()]);
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_connected_components_fallback() {
        let labels = connected_components(&two_triangles());
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }
}
