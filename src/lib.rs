//! `kpath`: Monte-Carlo k-path centrality for weighted directed mutation graphs.
//!
//! Edge weights count how often one mutation is followed by another. Instead of exact
//! betweenness, node and path importance are estimated from many short biased random walks:
//! a node is central if many walks pass through it, a path is central if it is drawn often.
//!
//! Public invariants (must not drift):
//! - **Node order**: node ids are `0..n-1` in first-seen label order of the input edges.
//! - **Determinism**: for a fixed graph and [`KPathConfig`] (including `seed`), every table is
//!   bit-for-bit reproducible.
//! - **No fabricated edges**: each consecutive pair in a sampled walk is an edge of the graph.
//! - **Conservation**: path counts sum to the number of walks drawn.
//!
//! Swappable (allowed to change without breaking the contract):
//! - serial vs parallel sampling (the parallel stream is seeded per walk)
//! - internal data structures, so long as the invariants hold

pub mod centrality;
pub mod graph;
pub mod input;
pub mod output;
pub mod sampler;
pub mod topk;

pub use centrality::{aggregate, Aggregator, KPathCentrality, ProbEstimator};
pub use graph::{inv_weight, EdgeRecord, EdgeWeights, MutationGraph, WeightedGraphRef, INV_WEIGHT_SCALE};
pub use input::{
    load_graph, pairs_to_edges, parse_edges, read_edges, write_edge_list, InputFormat, MutationPair,
};
pub use output::{
    format_path, parse_path, write_node_table, write_path_table, write_prob_path_table,
    PATH_DELIMITER,
};
pub use sampler::{
    default_sample_count, path_probability, sample_walks, sample_walks_streaming,
    transition_probs, KPathConfig, StartDistribution, StartPolicy,
};
#[cfg(feature = "parallel")]
pub use sampler::sample_walks_parallel;
pub use topk::{normalize, top_k, top_paths};

use log::info;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("graph has no nodes")]
    EmptyGraph,
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("edge {source_label} -> {target_label} has weight {weight}; weights must be positive and finite")]
    InvalidWeight {
        source_label: String,
        target_label: String,
        weight: f64,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("label `{0}` cannot be written into a path column")]
    UnencodableLabel(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Run the k-path estimator: sample walks and aggregate them into the three tables.
pub fn estimate<G: WeightedGraphRef>(graph: &G, config: KPathConfig) -> Result<KPathCentrality> {
    let mut agg = Aggregator::new(graph.node_count());
    let samples = sample_walks_streaming(graph, config, |w| agg.push(w))?;
    info!(
        "Aggregated {} walks into {} distinct paths (bias {})",
        samples,
        agg.distinct_paths(),
        config.bias
    );
    Ok(finish(graph, config, agg))
}

/// Parallel [`estimate`]: per-thread aggregators merged by summing counts.
///
/// Output is independent of Rayon thread count, and equals
/// `aggregate(&sample_walks_parallel(graph, config)?, n)` for the frequency estimator.
#[cfg(feature = "parallel")]
pub fn estimate_parallel<G>(graph: &G, config: KPathConfig) -> Result<KPathCentrality>
where
    G: WeightedGraphRef + Sync,
{
    use rayon::prelude::*;

    config.validate()?;
    let n = graph.node_count();
    if n == 0 {
        return Err(Error::EmptyGraph);
    }
    let samples = config.sample_count(n);
    let starts = StartDistribution::new(graph, config.start);

    let agg = (0..samples)
        .into_par_iter()
        .fold(
            || (Aggregator::new(n), Vec::new(), Vec::new()),
            |(mut agg, mut walk, mut probs), i| {
                let mut rng = sampler::walk_rng(config.seed, i);
                let start = starts.draw(&mut rng);
                sampler::kpath_walk(graph, start, config, &mut walk, &mut probs, &mut rng);
                agg.push(&walk);
                (agg, walk, probs)
            },
        )
        .map(|(agg, _, _)| agg)
        .reduce(
            || Aggregator::new(n),
            |mut a, b| {
                a.merge(b);
                a
            },
        );
    info!(
        "Aggregated {} walks into {} distinct paths in parallel",
        agg.walks(),
        agg.distinct_paths()
    );
    Ok(finish(graph, config, agg))
}

fn finish<G: WeightedGraphRef>(graph: &G, config: KPathConfig, agg: Aggregator) -> KPathCentrality {
    match config.estimator {
        ProbEstimator::Frequency => agg.finish(),
        ProbEstimator::TransitionProduct => {
            let starts = StartDistribution::new(graph, config.start);
            agg.finish_with(|path, _| path_probability(graph, &starts, config.bias, path))
        }
    }
}
