//! Biased random-walk sampling for k-path centrality.
//!
//! Each trial draws a start node, then extends the walk one out-edge at a time until it holds
//! `path_len` nodes or reaches a node without out-edges. The next-step distribution blends
//! weight-proportional and uniform choice:
//!
//! \[
//!   P(u \to v) = (1 - \beta) \frac{w(u,v)}{\sum_x w(u,x)} + \beta \frac{1}{\deg^+(u)}
//! \]
//!
//! where \(\beta\) is `bias`. All randomness derives from `seed`.

use crate::centrality::ProbEstimator;
use crate::graph::WeightedGraphRef;
use crate::{Error, Result};
use log::{debug, warn};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// How the first node of each walk is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StartPolicy {
    /// Uniform over nodes with at least one out-edge.
    #[default]
    Uniform,
    /// Proportional to out-degree.
    OutDegree,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KPathConfig {
    /// Target walk length, in nodes.
    pub path_len: usize,
    /// Number of walks; `None` uses [`default_sample_count`].
    pub samples: Option<usize>,
    /// 0 = weight-proportional steps, 1 = uniform steps.
    pub bias: f64,
    pub seed: u64,
    pub start: StartPolicy,
    pub estimator: ProbEstimator,
}

impl Default for KPathConfig {
    fn default() -> Self {
        Self {
            path_len: 3,
            samples: None,
            bias: 0.0,
            seed: 12345,
            start: StartPolicy::Uniform,
            estimator: ProbEstimator::Frequency,
        }
    }
}

impl KPathConfig {
    /// Node-property run: purely weight-proportional steps.
    pub fn node_properties(path_len: usize) -> Self {
        Self { path_len, bias: 0.0, ..Self::default() }
    }

    /// Path-betweenness run: a little uniform mass so rare transitions are still explored.
    pub fn path_betweenness(path_len: usize) -> Self {
        Self { path_len, bias: 0.1, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path_len == 0 {
            return Err(Error::InvalidParameter("path_len must be at least 1".into()));
        }
        if self.samples == Some(0) {
            return Err(Error::InvalidParameter("samples must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.bias) {
            return Err(Error::InvalidParameter(format!(
                "bias must lie in [0, 1], got {}",
                self.bias
            )));
        }
        Ok(())
    }

    /// Number of walks this config draws on a graph with `node_count` nodes.
    pub fn sample_count(&self, node_count: usize) -> usize {
        self.samples
            .unwrap_or_else(|| default_sample_count(node_count, self.path_len))
    }
}

/// Default number of walks: \(\lceil 2 L^2 n \ln n \rceil\), at least 1.
///
/// This is the k-path sampling bound \(2k^2 n^{1-2\alpha} \ln n\) of Alahakoon et al. at
/// \(\alpha = 0\), with \(k\) the walk length `path_len`.
pub fn default_sample_count(node_count: usize, path_len: usize) -> usize {
    // Squared in f64: huge walk lengths saturate instead of overflowing.
    let l = path_len as f64;
    let l2 = l * l;
    if node_count < 2 {
        return (l2 as usize).max(1);
    }
    let n = node_count as f64;
    (2.0 * l2 * n * n.ln()).ceil().max(1.0) as usize
}

/// Distribution of walk start nodes under a [`StartPolicy`].
#[derive(Debug, Clone)]
pub struct StartDistribution {
    nodes: Vec<usize>,
    weights: Vec<f64>,
    probs: Vec<f64>,
}

impl StartDistribution {
    pub fn new<G: WeightedGraphRef>(graph: &G, policy: StartPolicy) -> Self {
        let n = graph.node_count();
        let mut nodes = Vec::new();
        let mut weights = Vec::new();
        for v in 0..n {
            let deg = graph.out_degree(v);
            if deg == 0 {
                continue;
            }
            nodes.push(v);
            weights.push(match policy {
                StartPolicy::Uniform => 1.0,
                StartPolicy::OutDegree => deg as f64,
            });
        }
        if nodes.is_empty() && n > 0 {
            warn!("Graph has no edges; every walk will be a single node");
            nodes = (0..n).collect();
            weights = vec![1.0; n];
        }

        let total: f64 = weights.iter().sum();
        let mut probs = vec![0.0; n];
        for (&v, &w) in nodes.iter().zip(&weights) {
            probs[v] = w / total;
        }
        Self { nodes, weights, probs }
    }

    /// Candidate start nodes, in id order.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Probability that a walk starts at `node`.
    pub fn probability(&self, node: usize) -> f64 {
        self.probs.get(node).copied().unwrap_or(0.0)
    }

    pub(crate) fn draw<R: Rng>(&self, rng: &mut R) -> usize {
        sample_cdf(rng, &self.nodes, &self.weights)
    }
}

/// Fill `out` with the next-step probabilities for each out-edge of `node`.
///
/// `out` is aligned with the node's neighbor slice and sums to 1 (empty for dead ends).
pub fn transition_probs<G: WeightedGraphRef>(graph: &G, node: usize, bias: f64, out: &mut Vec<f64>) {
    out.clear();
    let (nbrs, wts) = graph.neighbors_and_weights_ref(node);
    if nbrs.is_empty() {
        return;
    }
    debug_assert_eq!(nbrs.len(), wts.len());

    let uniform = 1.0 / nbrs.len() as f64;
    let total: f64 = wts.iter().sum();
    out.extend(wts.iter().map(|&w| {
        let weighted = if total > 0.0 { w / total } else { uniform };
        (1.0 - bias) * weighted + bias * uniform
    }));
}

/// Probability of drawing exactly `path` under `starts` and the biased step distribution.
///
/// Returns 0 when a consecutive pair is not an edge. A path ending before `path_len` at a
/// dead end needs no extra termination factor: stopping there is certain.
pub fn path_probability<G: WeightedGraphRef>(
    graph: &G,
    starts: &StartDistribution,
    bias: f64,
    path: &[usize],
) -> f64 {
    let Some(&first) = path.first() else {
        return 0.0;
    };
    let mut p = starts.probability(first);
    let mut probs = Vec::new();
    for win in path.windows(2) {
        let (nbrs, _) = graph.neighbors_and_weights_ref(win[0]);
        transition_probs(graph, win[0], bias, &mut probs);
        match nbrs.iter().position(|&x| x == win[1]) {
            Some(i) => p *= probs[i],
            None => return 0.0,
        }
    }
    p
}

/// Draw the configured number of walks and collect them.
pub fn sample_walks<G: WeightedGraphRef>(graph: &G, config: KPathConfig) -> Result<Vec<Vec<usize>>> {
    let mut walks = Vec::with_capacity(config.sample_count(graph.node_count()).min(1 << 16));
    sample_walks_streaming(graph, config, |w| walks.push(w.to_vec()))?;
    Ok(walks)
}

/// Streaming variant: `on_walk` sees each walk in a reused buffer.
///
/// Returns the number of walks drawn. Produces exactly the sequence of [`sample_walks`].
pub fn sample_walks_streaming<G, F>(graph: &G, config: KPathConfig, mut on_walk: F) -> Result<usize>
where
    G: WeightedGraphRef,
    F: FnMut(&[usize]),
{
    config.validate()?;
    if graph.node_count() == 0 {
        return Err(Error::EmptyGraph);
    }
    let samples = config.sample_count(graph.node_count());
    let starts = StartDistribution::new(graph, config.start);
    debug!(
        "Sampling {} walks of up to {} nodes (bias {}, seed {}, {} start candidates)",
        samples,
        config.path_len,
        config.bias,
        config.seed,
        starts.nodes().len()
    );

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut walk = Vec::with_capacity(config.path_len);
    let mut probs = Vec::new();
    for _ in 0..samples {
        let start = starts.draw(&mut rng);
        kpath_walk(graph, start, config, &mut walk, &mut probs, &mut rng);
        on_walk(&walk);
    }
    Ok(samples)
}

/// Parallel sampling with one RNG per walk, seeded from `(seed, walk index)`.
///
/// Invariant: output is stable for a fixed `seed`, independent of Rayon thread count. It is
/// a different stream than [`sample_walks`].
#[cfg(feature = "parallel")]
pub fn sample_walks_parallel<G>(graph: &G, config: KPathConfig) -> Result<Vec<Vec<usize>>>
where
    G: WeightedGraphRef + Sync,
{
    use rayon::prelude::*;

    config.validate()?;
    if graph.node_count() == 0 {
        return Err(Error::EmptyGraph);
    }
    let samples = config.sample_count(graph.node_count());
    let starts = StartDistribution::new(graph, config.start);
    debug!("Sampling {} walks in parallel", samples);

    Ok((0..samples)
        .into_par_iter()
        .map_init(Vec::new, |probs, i| {
            let mut rng = walk_rng(config.seed, i);
            let start = starts.draw(&mut rng);
            let mut walk = Vec::with_capacity(config.path_len);
            kpath_walk(graph, start, config, &mut walk, probs, &mut rng);
            walk
        })
        .collect())
}

/// Per-walk RNG for parallel sampling.
#[cfg(feature = "parallel")]
pub(crate) fn walk_rng(seed: u64, index: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(mix64(seed ^ mix64(index as u64)))
}

#[cfg(feature = "parallel")]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

/// Draw one walk from `start` into `walk`.
pub(crate) fn kpath_walk<G: WeightedGraphRef, R: Rng>(
    graph: &G,
    start: usize,
    config: KPathConfig,
    walk: &mut Vec<usize>,
    probs: &mut Vec<f64>,
    rng: &mut R,
) {
    walk.clear();
    walk.push(start);
    let mut curr = start;
    for _ in 1..config.path_len {
        let (nbrs, _) = graph.neighbors_and_weights_ref(curr);
        if nbrs.is_empty() {
            break;
        }
        transition_probs(graph, curr, config.bias, probs);
        curr = sample_cdf(rng, nbrs, probs);
        walk.push(curr);
    }
}

/// Draw from `items` with probability proportional to `weights`.
///
/// Callers guarantee `items` is non-empty.
fn sample_cdf<R: Rng>(rng: &mut R, items: &[usize], weights: &[f64]) -> usize {
    debug_assert_eq!(items.len(), weights.len());
    if items.len() == 1 {
        return items[0];
    }

    let sum = weights.iter().copied().sum::<f64>();
    if !(sum > 0.0) {
        return items[rng.random_range(0..items.len())];
    }

    let mut r = rng.random::<f64>() * sum;
    for (i, &w) in weights.iter().enumerate() {
        if r < w {
            return items[i];
        }
        r -= w;
    }
    items[items.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeRecord, MutationGraph};

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "expected |{a} - {b}| <= {eps}");
    }

    fn fan() -> MutationGraph {
        // 0 -> {1, 2, 3} with weights 6, 3, 1
        MutationGraph::from_edges(vec![
            EdgeRecord::new("hub", "a", 6.0),
            EdgeRecord::new("hub", "b", 3.0),
            EdgeRecord::new("hub", "c", 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn transition_probs_interpolate_between_weighted_and_uniform() {
        let g = fan();
        let mut p = Vec::new();

        transition_probs(&g, 0, 0.0, &mut p);
        assert_close(p[0], 0.6, 1e-12);
        assert_close(p[1], 0.3, 1e-12);
        assert_close(p[2], 0.1, 1e-12);

        transition_probs(&g, 0, 1.0, &mut p);
        for &x in &p {
            assert_close(x, 1.0 / 3.0, 1e-12);
        }

        transition_probs(&g, 0, 0.5, &mut p);
        assert_close(p.iter().sum::<f64>(), 1.0, 1e-12);
        assert_close(p[2], 0.5 * 0.1 + 0.5 / 3.0, 1e-12);

        transition_probs(&g, 1, 0.5, &mut p);
        assert!(p.is_empty(), "dead ends have no transitions");
    }

    #[test]
    fn lightest_edge_gains_mass_as_bias_grows() {
        let g = fan();
        let mut p = Vec::new();
        let mut last = 0.0;
        for step in 0..=10 {
            transition_probs(&g, 0, step as f64 / 10.0, &mut p);
            assert!(p[2] > last, "bias {step}/10: {} <= {last}", p[2]);
            last = p[2];
        }
    }

    #[test]
    fn default_sample_count_grows_with_graph_and_length() {
        assert_eq!(default_sample_count(1, 3), 9);
        assert_eq!(default_sample_count(0, 1), 1);
        // 2 * 9 * 2 * ln 2 = 24.95
        assert_eq!(default_sample_count(2, 3), 25);
        assert!(default_sample_count(100, 3) > default_sample_count(50, 3));
        assert!(default_sample_count(100, 4) > default_sample_count(100, 3));
    }

    #[test]
    fn default_sample_count_saturates_for_huge_lengths() {
        assert_eq!(default_sample_count(1, usize::MAX), usize::MAX);
        assert_eq!(default_sample_count(10, usize::MAX), usize::MAX);
        assert_eq!(default_sample_count(10, 1 << 40), usize::MAX);
    }

    #[test]
    fn config_validation() {
        assert!(KPathConfig::default().validate().is_ok());
        assert!(KPathConfig::path_betweenness(3).validate().is_ok());
        let bad = [
            KPathConfig { path_len: 0, ..KPathConfig::default() },
            KPathConfig { samples: Some(0), ..KPathConfig::default() },
            KPathConfig { bias: -0.1, ..KPathConfig::default() },
            KPathConfig { bias: 1.5, ..KPathConfig::default() },
            KPathConfig { bias: f64::NAN, ..KPathConfig::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(Error::InvalidParameter(_))), "{cfg:?}");
        }
    }

    #[test]
    fn uniform_start_skips_dead_ends() {
        let g = fan();
        let starts = StartDistribution::new(&g, StartPolicy::Uniform);
        assert_eq!(starts.nodes(), &[0]);
        assert_eq!(starts.probability(0), 1.0);
        assert_eq!(starts.probability(1), 0.0);
    }

    #[test]
    fn out_degree_start_weights_by_degree() {
        let g = MutationGraph::from_edges(vec![
            EdgeRecord::new("a", "b", 1.0),
            EdgeRecord::new("a", "c", 1.0),
            EdgeRecord::new("a", "d", 1.0),
            EdgeRecord::new("b", "c", 1.0),
        ])
        .unwrap();
        let starts = StartDistribution::new(&g, StartPolicy::OutDegree);
        assert_close(starts.probability(0), 0.75, 1e-12);
        assert_close(starts.probability(1), 0.25, 1e-12);
        assert_eq!(starts.probability(2), 0.0);
    }

    #[test]
    fn edgeless_graph_falls_back_to_all_nodes() {
        let g = MutationGraph::with_nodes(["x", "y"], Vec::new()).unwrap();
        let starts = StartDistribution::new(&g, StartPolicy::OutDegree);
        assert_eq!(starts.nodes(), &[0, 1]);
        assert_close(starts.probability(1), 0.5, 1e-12);
    }

    #[test]
    fn path_probability_multiplies_start_and_steps() {
        let g = MutationGraph::from_edges(vec![
            EdgeRecord::new("A", "B", 4.0),
            EdgeRecord::new("B", "C", 1.0),
            EdgeRecord::new("A", "C", 1.0),
        ])
        .unwrap();
        let starts = StartDistribution::new(&g, StartPolicy::Uniform);
        // A and B can start: 1/2 each.
        assert_close(path_probability(&g, &starts, 0.0, &[0, 1]), 0.5 * 0.8, 1e-12);
        assert_close(path_probability(&g, &starts, 0.0, &[0, 2]), 0.5 * 0.2, 1e-12);
        assert_close(path_probability(&g, &starts, 0.0, &[0, 1, 2]), 0.5 * 0.8, 1e-12);
        assert_eq!(path_probability(&g, &starts, 0.0, &[2, 0]), 0.0);
        assert_eq!(path_probability(&g, &starts, 0.0, &[]), 0.0);
    }

    #[test]
    fn sample_cdf_never_picks_zero_weight_items() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..1_000 {
            let x = sample_cdf(&mut rng, &[7, 8, 9], &[0.0, 1.0, 0.0]);
            assert_eq!(x, 8);
        }
    }

    #[test]
    fn streaming_matches_collected() {
        let g = fan();
        let cfg = KPathConfig { samples: Some(50), path_len: 2, ..KPathConfig::default() };
        let collected = sample_walks(&g, cfg).unwrap();
        let mut streamed = Vec::new();
        let n = sample_walks_streaming(&g, cfg, |w| streamed.push(w.to_vec())).unwrap();
        assert_eq!(n, 50);
        assert_eq!(collected, streamed);
    }

    #[test]
    fn empty_graph_is_an_error() {
        let g = MutationGraph::default();
        let err = sample_walks(&g, KPathConfig::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyGraph));
    }
}
