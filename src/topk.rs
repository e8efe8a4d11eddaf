//! Ranking utilities.

use ordered_float::NotNan;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

/// The `k` highest-scoring nodes, best first; ties go to the lower node id.
///
/// Non-finite and non-positive scores are skipped.
pub fn top_k(scores: &BTreeMap<usize, f64>, k: usize) -> Vec<(usize, f64)> {
    if k == 0 || scores.is_empty() {
        return Vec::new();
    }
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (&node, &score) in scores {
        if !score.is_finite() || score <= 0.0 {
            continue;
        }
        let Ok(s) = NotNan::new(score) else { continue };
        // Min-heap on (score, Reverse(id)): the root is the entry to evict next.
        heap.push(Reverse((s, Reverse(node))));
        if heap.len() > k {
            heap.pop();
        }
    }
    let mut results: Vec<(usize, f64)> = heap
        .into_iter()
        .map(|Reverse((s, Reverse(node)))| (node, s.into_inner()))
        .collect();
    results.sort_unstable_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    results
}

/// The `k` most frequent paths, highest count first; ties in path key order.
pub fn top_paths(paths: &BTreeMap<Vec<usize>, u64>, k: usize) -> Vec<(&[usize], u64)> {
    let mut ranked: Vec<(&[usize], u64)> = paths.iter().map(|(p, &c)| (p.as_slice(), c)).collect();
    // Stable sort keeps the BTreeMap key order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(k);
    ranked
}

/// Rescale scores in place so they sum to 1; an all-zero (or empty) slice is left as is.
///
/// Node centralities sum to the mean number of distinct nodes per walk, not to 1; this turns
/// them into shares of all visits.
pub fn normalize(scores: &mut [f64]) {
    let sum: f64 = scores.iter().sum();
    if sum > 0.0 {
        for s in scores {
            *s /= sum;
        }
    }
}
