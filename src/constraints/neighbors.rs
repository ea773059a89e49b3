//! Brute-force Euclidean neighbour search over raw features.
//!
//! Ties are broken by the lower candidate position, which makes triplet
//! generation deterministic.

use ndarray::{ArrayView1, ArrayView2};

/// Positions (into `candidates` rows) of the `k` nearest rows to `query`.
///
/// `exclude` removes one candidate position from consideration (the query
/// point itself when it is also a candidate). Returns fewer than `k`
/// positions when there are not enough candidates.
pub fn k_nearest(
    candidates: ArrayView2<'_, f64>, query: ArrayView1<'_, f64>, k: usize, exclude: Option<usize>,
) -> Vec<usize> {
    let mut scored: Vec<(f64, usize)> = candidates
        .outer_iter()
        .enumerate()
        .filter(|(pos, _)| Some(*pos) != exclude)
        .map(|(pos, row)| {
            let diff = &row - &query;
            (diff.dot(&diff), pos)
        })
        .collect();
    // Stable sort keeps ascending position order among equal distances.
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().take(k).map(|(_, pos)| pos).collect()
}
