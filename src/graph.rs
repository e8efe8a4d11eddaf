//! Weighted directed mutation graph.
//!
//! Nodes are mutation labels interned in first-seen order, so node ids are `0..n` and stable
//! for a given edge sequence. Every edge carries:
//! - `weight`: the observed transition count (strictly positive, finite)
//! - `inv_weight`: the traversal cost `INV_WEIGHT_SCALE / weight`
//!
//! The graph is read-only once built; samplers borrow it for the duration of a run.

use crate::{Error, Result};
use std::collections::HashMap;

/// Scale constant `C` of the cost transform `inv_weight = C / weight`.
///
/// 5040 = 7! divides evenly by every count from 1 to 10, so small counts map to exact costs.
pub const INV_WEIGHT_SCALE: f64 = 5040.0;

/// Traversal cost of an edge with the given observed weight.
pub fn inv_weight(weight: f64) -> f64 {
    INV_WEIGHT_SCALE / weight
}

/// A weighted graph view that returns **borrowed** neighbor + weight slices.
///
/// Requirements:
/// - `neighbors.len() == weights.len()`
/// - weights are non-negative; a weight is the relative likelihood of taking that edge
///   under weight-proportional sampling.
pub trait WeightedGraphRef {
    fn node_count(&self) -> usize;

    /// Return `(neighbors, weights)` for the out-edges of `node`.
    fn neighbors_and_weights_ref(&self, node: usize) -> (&[usize], &[f64]);

    fn out_degree(&self, node: usize) -> usize {
        self.neighbors_and_weights_ref(node).0.len()
    }
}

/// One parsed directed edge, before interning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }
}

/// Both numeric attributes of an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeWeights {
    pub weight: f64,
    pub inv_weight: f64,
}

/// Adjacency-list mutation graph with per-node contiguous neighbor and weight lists.
#[derive(Debug, Clone, Default)]
pub struct MutationGraph {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    neighbors: Vec<Vec<usize>>,
    weights: Vec<Vec<f64>>,
    inv_weights: Vec<Vec<f64>>,
    edge_count: usize,
}

impl MutationGraph {
    /// Build a graph from directed edges.
    ///
    /// A repeated `(source, target)` row replaces the earlier weight; the last row wins.
    /// Any non-positive or non-finite weight is rejected.
    pub fn from_edges<I>(edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = EdgeRecord>,
    {
        let mut graph = Self::default();
        for edge in edges {
            graph.insert_edge(edge)?;
        }
        Ok(graph)
    }

    /// Like [`MutationGraph::from_edges`], but registers `labels` first so that nodes without
    /// any edge are still part of the graph.
    pub fn with_nodes<L, S, I>(labels: L, edges: I) -> Result<Self>
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
        I: IntoIterator<Item = EdgeRecord>,
    {
        let mut graph = Self::default();
        for label in labels {
            graph.intern(label.into());
        }
        for edge in edges {
            graph.insert_edge(edge)?;
        }
        Ok(graph)
    }

    fn intern(&mut self, label: String) -> usize {
        if let Some(&id) = self.index.get(&label) {
            return id;
        }
        let id = self.labels.len();
        self.index.insert(label.clone(), id);
        self.labels.push(label);
        self.neighbors.push(Vec::new());
        self.weights.push(Vec::new());
        self.inv_weights.push(Vec::new());
        id
    }

    fn insert_edge(&mut self, edge: EdgeRecord) -> Result<()> {
        if !edge.weight.is_finite() || edge.weight <= 0.0 {
            return Err(Error::InvalidWeight {
                source_label: edge.source,
                target_label: edge.target,
                weight: edge.weight,
            });
        }
        let u = self.intern(edge.source);
        let v = self.intern(edge.target);

        match self.neighbors[u].iter().position(|&x| x == v) {
            Some(i) => {
                self.weights[u][i] = edge.weight;
                self.inv_weights[u][i] = inv_weight(edge.weight);
            }
            None => {
                self.neighbors[u].push(v);
                self.weights[u].push(edge.weight);
                self.inv_weights[u].push(inv_weight(edge.weight));
                self.edge_count += 1;
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, node: usize) -> Option<&str> {
        self.labels.get(node).map(String::as_str)
    }

    pub fn node_id(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// All labels, indexed by node id.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Traversal costs of the out-edges of `node`, aligned with its neighbor slice.
    pub fn inv_weights_ref(&self, node: usize) -> &[f64] {
        self.inv_weights.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Attributes of the edge `source -> target`, if present.
    pub fn edge(&self, source: usize, target: usize) -> Option<EdgeWeights> {
        let nbrs = self.neighbors.get(source)?;
        let i = nbrs.iter().position(|&x| x == target)?;
        Some(EdgeWeights {
            weight: self.weights[source][i],
            inv_weight: self.inv_weights[source][i],
        })
    }

    /// Iterate all edges as `(source, target, attributes)`, grouped by source id.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, EdgeWeights)> + '_ {
        self.neighbors.iter().enumerate().flat_map(move |(u, nbrs)| {
            nbrs.iter().enumerate().map(move |(i, &v)| {
                (
                    u,
                    v,
                    EdgeWeights {
                        weight: self.weights[u][i],
                        inv_weight: self.inv_weights[u][i],
                    },
                )
            })
        })
    }

    /// Export to a `petgraph` directed graph; node indices match node ids.
    #[cfg(feature = "petgraph")]
    pub fn to_petgraph(&self) -> petgraph::graph::DiGraph<String, EdgeWeights> {
        let mut g = petgraph::graph::DiGraph::with_capacity(self.node_count(), self.edge_count);
        let idx: Vec<_> = self.labels.iter().map(|l| g.add_node(l.clone())).collect();
        for (u, v, w) in self.edges() {
            g.add_edge(idx[u], idx[v], w);
        }
        g
    }
}

/// Sampling weights are the observed counts, i.e. proportional to `1 / inv_weight`.
impl WeightedGraphRef for MutationGraph {
    fn node_count(&self) -> usize {
        self.labels.len()
    }

    fn neighbors_and_weights_ref(&self, node: usize) -> (&[usize], &[f64]) {
        let nbrs = self.neighbors.get(node).map(Vec::as_slice).unwrap_or(&[]);
        let wts = self.weights.get(node).map(Vec::as_slice).unwrap_or(&[]);
        (nbrs, wts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> MutationGraph {
        MutationGraph::from_edges(vec![
            EdgeRecord::new("A", "B", 4.0),
            EdgeRecord::new("B", "C", 1.0),
            EdgeRecord::new("A", "C", 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn ids_follow_first_seen_order() {
        let g = abc();
        assert_eq!(g.labels(), &["A", "B", "C"]);
        assert_eq!(g.node_id("C"), Some(2));
        assert_eq!(g.label(1), Some("B"));
        assert_eq!(g.label(3), None);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn inv_weight_is_scaled_reciprocal() {
        let g = abc();
        let ab = g.edge(0, 1).unwrap();
        let ac = g.edge(0, 2).unwrap();
        assert_eq!(ab.inv_weight, 1260.0);
        assert_eq!(ac.inv_weight, 5040.0);
        // Heavier edge is cheaper.
        assert!(ab.inv_weight < ac.inv_weight);
        assert_eq!(g.inv_weights_ref(0), &[1260.0, 5040.0]);
        assert!(g.edge(1, 0).is_none());
    }

    #[test]
    fn rejects_non_positive_and_non_finite_weights() {
        for w in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = MutationGraph::from_edges(vec![EdgeRecord::new("A", "B", w)]).unwrap_err();
            assert!(
                matches!(err, Error::InvalidWeight { .. }),
                "weight {w} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn duplicate_edges_keep_the_last_weight() {
        let g = MutationGraph::from_edges(vec![
            EdgeRecord::new("A", "B", 2.0),
            EdgeRecord::new("A", "C", 1.0),
            EdgeRecord::new("A", "B", 3.0),
        ])
        .unwrap();
        assert_eq!(g.edge_count(), 2);
        let e = g.edge(0, 1).unwrap();
        assert_eq!(e.weight, 3.0);
        assert_eq!(e.inv_weight, INV_WEIGHT_SCALE / 3.0);
        // Neighbor order stays at first insertion.
        assert_eq!(g.neighbors_and_weights_ref(0), (&[1usize, 2][..], &[3.0, 1.0][..]));
    }

    #[test]
    fn with_nodes_keeps_isolated_nodes() {
        let g = MutationGraph::with_nodes(["X", "Y"], vec![EdgeRecord::new("A", "B", 1.0)]).unwrap();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.out_degree(g.node_id("X").unwrap()), 0);
        assert_eq!(g.out_degree(g.node_id("A").unwrap()), 1);
    }

    #[test]
    fn edges_iterates_every_edge_once() {
        let g = abc();
        let mut got: Vec<(usize, usize, f64)> = g.edges().map(|(u, v, w)| (u, v, w.weight)).collect();
        got.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        assert_eq!(got, vec![(0, 1, 4.0), (0, 2, 1.0), (1, 2, 1.0)]);
    }

    #[cfg(feature = "petgraph")]
    #[test]
    fn petgraph_export_preserves_ids_and_weights() {
        use petgraph::visit::EdgeRef;

        let g = abc();
        let pg = g.to_petgraph();
        assert_eq!(pg.node_count(), 3);
        assert_eq!(pg.edge_count(), 3);
        for e in pg.edge_references() {
            let w = g.edge(e.source().index(), e.target().index()).unwrap();
            assert_eq!(*e.weight(), w);
        }
    }
}
