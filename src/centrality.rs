//! Aggregation of sampled walks into k-path centralities.
//!
//! Public invariants:
//! - every walk lands in exactly one path bucket, so path counts sum to the number of walks
//! - a node is counted at most once per walk (self-revisits do not inflate its score)
//! - walks of different lengths are different keys, even when one is a prefix of the other
//! - merging aggregators sums counts, so the result does not depend on merge order

use crate::graph::MutationGraph;
use crate::topk;
use std::collections::{BTreeMap, HashMap};

/// How path probabilities are estimated from the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbEstimator {
    /// Empirical frequency: path count divided by the number of walks.
    #[default]
    Frequency,
    /// Exact draw probability of each sampled path under the sampling distribution.
    TransitionProduct,
}

/// The three k-path tables of one estimator run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KPathCentrality {
    /// Number of walks aggregated.
    pub sample_count: usize,
    /// Fraction of walks that visit each appearing node.
    pub node: BTreeMap<usize, f64>,
    /// Occurrence count of each distinct walk.
    pub path: BTreeMap<Vec<usize>, u64>,
    /// Probability estimate of each distinct walk.
    pub prob_path: BTreeMap<Vec<usize>, f64>,
}

impl KPathCentrality {
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Dense node scores indexed by node id; nodes never visited score 0.
    pub fn node_scores(&self, node_count: usize) -> Vec<f64> {
        let mut scores = vec![0.0; node_count];
        for (&v, &s) in &self.node {
            if let Some(slot) = scores.get_mut(v) {
                *slot = s;
            }
        }
        scores
    }

    /// Node centralities keyed by mutation label, in node id order.
    pub fn labelled_nodes<'g>(&self, graph: &'g MutationGraph) -> Vec<(&'g str, f64)> {
        self.node
            .iter()
            .filter_map(|(&v, &s)| graph.label(v).map(|l| (l, s)))
            .collect()
    }

    /// The `k` most central nodes, highest score first.
    pub fn top_nodes(&self, k: usize) -> Vec<(usize, f64)> {
        topk::top_k(&self.node, k)
    }

    /// The `k` most frequent paths, highest count first.
    pub fn top_paths(&self, k: usize) -> Vec<(&[usize], u64)> {
        topk::top_paths(&self.path, k)
    }
}

/// Incremental walk aggregator.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    walks: usize,
    node_hits: Vec<u64>,
    paths: HashMap<Vec<usize>, u64>,
    // Visited stamps so each node counts once per walk without clearing a set.
    seen: Vec<u32>,
    stamp: u32,
}

impl Aggregator {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_hits: vec![0; node_count],
            seen: vec![0; node_count],
            ..Self::default()
        }
    }

    pub fn walks(&self) -> usize {
        self.walks
    }

    pub fn distinct_paths(&self) -> usize {
        self.paths.len()
    }

    /// Record one walk. Empty walks are ignored.
    pub fn push(&mut self, walk: &[usize]) {
        if walk.is_empty() {
            return;
        }
        self.walks += 1;

        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.seen.fill(0);
            self.stamp = 1;
        }
        for &v in walk {
            if v >= self.node_hits.len() {
                self.node_hits.resize(v + 1, 0);
                self.seen.resize(v + 1, 0);
            }
            if self.seen[v] != self.stamp {
                self.seen[v] = self.stamp;
                self.node_hits[v] += 1;
            }
        }

        match self.paths.get_mut(walk) {
            Some(count) => *count += 1,
            None => {
                self.paths.insert(walk.to_vec(), 1);
            }
        }
    }

    /// Fold another aggregator's counts into this one.
    pub fn merge(&mut self, other: Aggregator) {
        self.walks += other.walks;
        if other.node_hits.len() > self.node_hits.len() {
            self.node_hits.resize(other.node_hits.len(), 0);
            self.seen.resize(other.node_hits.len(), 0);
        }
        for (v, hits) in other.node_hits.into_iter().enumerate() {
            self.node_hits[v] += hits;
        }
        for (path, count) in other.paths {
            *self.paths.entry(path).or_insert(0) += count;
        }
    }

    /// Finish with frequency-based path probabilities.
    pub fn finish(self) -> KPathCentrality {
        let k = self.walks as f64;
        self.finish_with(|_, count| count as f64 / k)
    }

    /// Finish with a custom path probability `prob(path, count)`.
    pub fn finish_with<F>(self, mut prob: F) -> KPathCentrality
    where
        F: FnMut(&[usize], u64) -> f64,
    {
        if self.walks == 0 {
            return KPathCentrality::default();
        }
        let k = self.walks as f64;
        let node = self
            .node_hits
            .iter()
            .enumerate()
            .filter(|(_, &hits)| hits > 0)
            .map(|(v, &hits)| (v, hits as f64 / k))
            .collect();
        let path: BTreeMap<Vec<usize>, u64> = self.paths.into_iter().collect();
        let prob_path = path.iter().map(|(p, &c)| (p.clone(), prob(p.as_slice(), c))).collect();
        KPathCentrality {
            sample_count: self.walks,
            node,
            path,
            prob_path,
        }
    }
}

/// Aggregate a finished sample with the frequency estimator.
pub fn aggregate<W: AsRef<[usize]>>(walks: &[W], node_count: usize) -> KPathCentrality {
    let mut agg = Aggregator::new(node_count);
    for w in walks {
        agg.push(w.as_ref());
    }
    agg.finish()
}
