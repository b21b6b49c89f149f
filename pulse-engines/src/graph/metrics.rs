//! Topological metrics over the trend graph
//!
//! Spectral embedding and eigenvector centrality use deterministic power
//! iteration; a non-converging or non-finite computation is reported as an
//! error so the caller can drop that metric alone.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use pulse_core::EdgeKind;

use super::build::TrendGraph;

const POWER_ITERATIONS: usize = 100;
const CONVERGENCE_TOL: f64 = 1e-6;
const PAGERANK_DAMPING: f64 = 0.85;
const PAGERANK_ITERATIONS: usize = 50;

/// Per-node centrality components, each normalized to [0, 1]
#[derive(Debug, Clone, Default)]
pub(crate) struct Centrality {
    pub degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
    pub eigenvector: f64,
}

impl Centrality {
    pub fn as_vec(&self) -> [f64; 4] {
        [self.degree, self.betweenness, self.closeness, self.eigenvector]
    }
}

/// Top-k eigenvectors of the (undirected) adjacency matrix
///
/// Power iteration with Hotelling deflation, k = min(10, n-1). Rows are
/// per-node embedding coordinates.
pub(crate) fn spectral_embedding(
    neighbors: &[Vec<(usize, f64)>],
) -> Result<Vec<Vec<f64>>, String> {
    let n = neighbors.len();
    if n < 2 {
        return Ok(vec![Vec::new(); n]);
    }
    let k = 10.min(n - 1);

    let mut eigenvectors: Vec<Vec<f64>> = Vec::with_capacity(k);
    let mut eigenvalues: Vec<f64> = Vec::with_capacity(k);

    for component in 0..k {
        // Deterministic start: uniform plus a small index-dependent ramp
        let mut vector: Vec<f64> =
            (0..n).map(|i| 1.0 + i as f64 / n as f64 + component as f64).collect();
        normalize(&mut vector).map_err(|_| "zero start vector".to_string())?;

        let mut eigenvalue = 0.0;
        let mut converged = false;

        for _ in 0..POWER_ITERATIONS {
            let mut next = multiply(neighbors, &vector);

            // Deflate previously found components
            for (ev, prev) in eigenvalues.iter().zip(&eigenvectors) {
                let projection: f64 = dot(prev, &vector) * ev;
                for (value, basis) in next.iter_mut().zip(prev) {
                    *value -= projection * basis;
                }
            }

            let next_eigenvalue = dot(&next, &vector);
            if normalize(&mut next).is_err() {
                // Adjacency annihilated the vector; spectrum is exhausted
                return Ok(finish_embedding(eigenvectors, n, k));
            }

            if (next_eigenvalue - eigenvalue).abs() < CONVERGENCE_TOL {
                vector = next;
                eigenvalue = next_eigenvalue;
                converged = true;
                break;
            }
            vector = next;
            eigenvalue = next_eigenvalue;
        }

        if !converged {
            return Err(format!("eigenvector {component} did not converge"));
        }
        if !eigenvalue.is_finite() {
            return Err(format!("non-finite eigenvalue at component {component}"));
        }

        eigenvalues.push(eigenvalue);
        eigenvectors.push(vector);
    }

    Ok(finish_embedding(eigenvectors, n, k))
}

/// Transpose column eigenvectors into per-node rows, zero-padded to k
fn finish_embedding(eigenvectors: Vec<Vec<f64>>, n: usize, k: usize) -> Vec<Vec<f64>> {
    let mut rows = vec![vec![0.0; k]; n];
    for (col, vector) in eigenvectors.iter().enumerate() {
        for (row, value) in vector.iter().enumerate() {
            rows[row][col] = *value;
        }
    }
    rows
}

/// Degree, betweenness, closeness and eigenvector centrality per node
pub(crate) fn centralities(
    neighbors: &[Vec<(usize, f64)>],
) -> Result<Vec<Centrality>, String> {
    let n = neighbors.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if n == 1 {
        return Ok(vec![Centrality::default()]);
    }

    let mut result = vec![Centrality::default(); n];

    for (i, adjacent) in neighbors.iter().enumerate() {
        result[i].degree = adjacent.len() as f64 / (n - 1) as f64;
    }

    let betweenness = brandes_betweenness(neighbors);
    let scale = ((n - 1) * (n - 2)) as f64;
    for (i, b) in betweenness.iter().enumerate() {
        result[i].betweenness = if scale > 0.0 { (b / scale).min(1.0) } else { 0.0 };
    }

    for i in 0..n {
        result[i].closeness = closeness_of(neighbors, i);
    }

    let eigen = eigenvector_centrality(neighbors)?;
    for (i, e) in eigen.iter().enumerate() {
        result[i].eigenvector = *e;
    }

    Ok(result)
}

/// Brandes' algorithm over unweighted hops
fn brandes_betweenness(neighbors: &[Vec<(usize, f64)>]) -> Vec<f64> {
    let n = neighbors.len();
    let mut betweenness = vec![0.0; n];

    for source in 0..n {
        let mut stack = Vec::new();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut distance = vec![-1_i64; n];
        sigma[source] = 1.0;
        distance[source] = 0;

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &(w, _) in &neighbors[v] {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                betweenness[w] += delta[w];
            }
        }
    }

    // Undirected: every pair was counted twice
    for b in betweenness.iter_mut() {
        *b /= 2.0;
    }
    betweenness
}

/// Closeness over hop distances, scaled by reachable fraction
fn closeness_of(neighbors: &[Vec<(usize, f64)>], source: usize) -> f64 {
    let n = neighbors.len();
    let mut distance = vec![-1_i64; n];
    distance[source] = 0;

    let mut queue = VecDeque::from([source]);
    let mut total = 0_i64;
    let mut reachable = 0_usize;

    while let Some(v) = queue.pop_front() {
        for &(w, _) in &neighbors[v] {
            if distance[w] < 0 {
                distance[w] = distance[v] + 1;
                total += distance[w];
                reachable += 1;
                queue.push_back(w);
            }
        }
    }

    if total == 0 {
        return 0.0;
    }
    let fraction = reachable as f64 / (n - 1) as f64;
    (reachable as f64 / total as f64) * fraction
}

/// Eigenvector centrality: principal eigenvector, scaled so max = 1
fn eigenvector_centrality(neighbors: &[Vec<(usize, f64)>]) -> Result<Vec<f64>, String> {
    let n = neighbors.len();
    let mut vector = vec![1.0 / n as f64; n];

    for _ in 0..POWER_ITERATIONS {
        let mut next = multiply(neighbors, &vector);
        if normalize(&mut next).is_err() {
            // No edges at all
            return Ok(vec![0.0; n]);
        }
        let shift: f64 = next
            .iter()
            .zip(&vector)
            .map(|(a, b)| (a - b).abs())
            .sum();
        vector = next;
        if shift < CONVERGENCE_TOL {
            break;
        }
    }

    let max = vector.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if !max.is_finite() {
        return Err("non-finite eigenvector centrality".to_string());
    }
    if max <= f64::EPSILON {
        return Ok(vec![0.0; n]);
    }
    Ok(vector.iter().map(|v| v.abs() / max).collect())
}

/// PageRank over directed edges, uniform teleport, dangling mass spread evenly
pub(crate) fn page_rank(trend_graph: &TrendGraph) -> Vec<f64> {
    let graph = &trend_graph.graph;
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let mut rank = vec![1.0 / n as f64; n];
    let out_weight: Vec<f64> = graph
        .node_indices()
        .map(|ix| {
            graph
                .edges_directed(ix, Direction::Outgoing)
                .map(|e| e.weight().weight.max(f64::EPSILON))
                .sum()
        })
        .collect();

    for _ in 0..PAGERANK_ITERATIONS {
        let mut next = vec![(1.0 - PAGERANK_DAMPING) / n as f64; n];

        let dangling: f64 = rank
            .iter()
            .enumerate()
            .filter(|(i, _)| out_weight[*i] <= f64::EPSILON)
            .map(|(_, r)| r)
            .sum();
        let dangling_share = PAGERANK_DAMPING * dangling / n as f64;
        for value in next.iter_mut() {
            *value += dangling_share;
        }

        for edge in graph.edge_references() {
            let from = edge.source().index();
            let to = edge.target().index();
            let share = edge.weight().weight.max(f64::EPSILON) / out_weight[from];
            next[to] += PAGERANK_DAMPING * rank[from] * share;
        }

        rank = next;
    }

    rank
}

/// Longest cascade reachable from `start` over directed mention edges
pub(crate) fn cascade_depth(trend_graph: &TrendGraph, start: NodeIndex) -> usize {
    let graph = &trend_graph.graph;
    let mut depth = vec![usize::MAX; graph.node_count()];
    depth[start.index()] = 0;

    let mut max_depth = 0;
    let mut queue = VecDeque::from([start]);
    while let Some(v) = queue.pop_front() {
        for edge in graph.edges_directed(v, Direction::Outgoing) {
            let kind = edge.weight().kind;
            if kind != EdgeKind::MentionedIn && kind != EdgeKind::Mentions {
                continue;
            }
            let w = edge.target();
            if depth[w.index()] == usize::MAX {
                depth[w.index()] = depth[v.index()] + 1;
                max_depth = max_depth.max(depth[w.index()]);
                queue.push_back(w);
            }
        }
    }
    max_depth
}

fn multiply(neighbors: &[Vec<(usize, f64)>], vector: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0; vector.len()];
    for (i, adjacent) in neighbors.iter().enumerate() {
        for &(j, weight) in adjacent {
            result[i] += weight * vector[j];
        }
    }
    result
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(vector: &mut [f64]) -> Result<(), ()> {
    let norm = dot(vector, vector).sqrt();
    if !norm.is_finite() || norm <= f64::EPSILON {
        return Err(());
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Path graph 0 - 1 - 2
    fn path3() -> Vec<Vec<(usize, f64)>> {
        vec![
            vec![(1, 1.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(1, 1.0)],
        ]
    }

    #[test]
    fn test_degree_and_betweenness_on_path() {
        let centrality = centralities(&path3()).unwrap();
        assert!((centrality[1].degree - 1.0).abs() < 1e-9);
        assert!((centrality[0].degree - 0.5).abs() < 1e-9);
        // Middle node sits on the only 0-2 path
        assert!(centrality[1].betweenness > centrality[0].betweenness);
    }

    #[test]
    fn test_closeness_favors_center() {
        let centrality = centralities(&path3()).unwrap();
        assert!(centrality[1].closeness > centrality[0].closeness);
    }

    #[test]
    fn test_eigenvector_centrality_star() {
        // Star with hub 0
        let star = vec![
            vec![(1, 1.0), (2, 1.0), (3, 1.0)],
            vec![(0, 1.0)],
            vec![(0, 1.0)],
            vec![(0, 1.0)],
        ];
        let centrality = centralities(&star).unwrap();
        assert!((centrality[0].eigenvector - 1.0).abs() < 1e-6);
        for leaf in &centrality[1..] {
            assert!(leaf.eigenvector < 1.0);
        }
    }

    #[test]
    fn test_spectral_embedding_shape() {
        let rows = spectral_embedding(&path3()).unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), 2); // k = min(10, n-1)
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_spectral_embedding_trivial_graphs() {
        assert!(spectral_embedding(&[]).unwrap().is_empty());
        assert_eq!(spectral_embedding(&[vec![]]).unwrap(), vec![Vec::<f64>::new()]);
    }
}
