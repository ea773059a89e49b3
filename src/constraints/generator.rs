//! constraints::generator — weak supervision synthesized from partial labels.
//!
//! Purpose
//! -------
//! Build the tuples that weakly-supervised learners train on from a
//! vector of class labels in which some entries are unknown (negative).
//!
//! Key behaviors
//! -------------
//! - [`Constraints::positive_negative_pairs`]: random same-label and
//!   different-label index pairs under a bounded retry budget
//!   ([`MAX_PAIR_ROUNDS`]), deduplicated per polarity, never self-paired.
//! - [`Constraints::chunks`]: disjoint same-label groups of a fixed size.
//! - [`Constraints::generate_knntriplets`]: `(anchor, genuine, impostor)`
//!   triplets from nearest same-class / other-class neighbours.
//! - [`wrap_pairs`]: materialize pair indices into a pair array plus
//!   `{+1, -1}` labels, positives first.
//!
//! Invariants & assumptions
//! ------------------------
//! - All randomness comes from the generator passed in; the same seed
//!   reproduces the same output.
//! - Pair and chunk indices address the original label vector; triplet
//!   indices address the subset of points with known labels.
//! - Shortfalls are warnings (logged with their counts), never errors.
//!
//! Testing notes
//! -------------
//! - The nine-point collinear fixture pins the triplet order exactly.
//! - Pair and chunk tests use `ChaCha8Rng` seeds and check structural
//!   properties rather than specific draws.

use std::collections::{BTreeMap, HashSet};

use ndarray::{Array1, Array2, Array3, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::constraints::{
    errors::{ConstraintError, ConstraintResult, ConstraintWarning},
    neighbors::k_nearest,
};

/// Sampling rounds per polarity before giving up on the pair quota.
pub const MAX_PAIR_ROUNDS: usize = 10;

/// Similar (`a[i]`, `b[i]`) and dissimilar (`c[i]`, `d[i]`) index pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairConstraints {
    pub a: Array1<usize>,
    pub b: Array1<usize>,
    pub c: Array1<usize>,
    pub d: Array1<usize>,
}

impl PairConstraints {
    pub fn n_positive(&self) -> usize {
        self.a.len()
    }

    pub fn n_negative(&self) -> usize {
        self.c.len()
    }

    /// `(n_pairs, 2)` index array and matching `{+1, -1}` labels,
    /// positives first. Suitable for learners configured with a preprocessor.
    pub fn wrap_indices(&self) -> (Array2<usize>, Array1<f64>) {
        let n_pos = self.n_positive();
        let n = n_pos + self.n_negative();
        let mut idx = Array2::<usize>::zeros((n, 2));
        let pairs = self.a.iter().zip(self.b.iter()).chain(self.c.iter().zip(self.d.iter()));
        for (i, (&left, &right)) in pairs.enumerate() {
            idx[[i, 0]] = left;
            idx[[i, 1]] = right;
        }
        let y = Array1::from_shape_fn(n, |i| if i < n_pos { 1.0 } else { -1.0 });
        (idx, y)
    }
}

/// Label vector with `-1` (any negative value) marking unknown labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    partial_labels: Array1<i64>,
}

impl Constraints {
    pub fn new(partial_labels: Array1<i64>) -> Self {
        Self { partial_labels }
    }

    pub fn partial_labels(&self) -> &Array1<i64> {
        &self.partial_labels
    }

    /// Positions and values of the known labels.
    fn known(&self) -> (Vec<usize>, Vec<i64>) {
        self.partial_labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l >= 0)
            .map(|(i, &l)| (i, l))
            .unzip()
    }

    /// positive_negative_pairs — sample similar and dissimilar pairs.
    ///
    /// Parameters
    /// ----------
    /// - `num_constraints`: quota per polarity.
    /// - `same_length`: truncate both polarities to the shorter one.
    /// - `rng`: source of randomness.
    ///
    /// Returns
    /// -------
    /// Index pairs into the label vector. Each polarity holds at most
    /// `num_constraints` unique pairs; a shortfall is logged.
    ///
    /// Errors
    /// ------
    /// - `ConstraintError::NoKnownLabels` when pairs are requested but no
    ///   label is known.
    pub fn positive_negative_pairs<R: Rng + ?Sized>(
        &self, num_constraints: usize, same_length: bool, rng: &mut R,
    ) -> ConstraintResult<PairConstraints> {
        let ((mut a, mut b), pos_warning) = self.sample_pairs(num_constraints, true, rng)?;
        let ((mut c, mut d), neg_warning) = self.sample_pairs(num_constraints, false, rng)?;
        for w in pos_warning.iter().chain(neg_warning.iter()) {
            w.emit();
        }
        if same_length && a.len() != c.len() {
            let n = a.len().min(c.len());
            a.truncate(n);
            b.truncate(n);
            c.truncate(n);
            d.truncate(n);
        }
        Ok(PairConstraints {
            a: Array1::from(a),
            b: Array1::from(b),
            c: Array1::from(c),
            d: Array1::from(d),
        })
    }

    /// One polarity of [`Self::positive_negative_pairs`], returning the
    /// shortfall warning instead of logging it.
    pub(crate) fn sample_pairs<R: Rng + ?Sized>(
        &self, num_constraints: usize, same_label: bool, rng: &mut R,
    ) -> ConstraintResult<((Vec<usize>, Vec<usize>), Option<ConstraintWarning>)> {
        if num_constraints == 0 {
            return Ok(((Vec::new(), Vec::new()), None));
        }
        let (known_idx, known_labels) = self.known();
        let n = known_labels.len();
        if n == 0 {
            return Err(ConstraintError::NoKnownLabels);
        }

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(num_constraints);
        let mut round = 0;
        while round < MAX_PAIR_ROUNDS && pairs.len() < num_constraints {
            let missing = num_constraints - pairs.len();
            let anchors: Vec<usize> = (0..missing).map(|_| rng.gen_range(0..n)).collect();
            for anchor in anchors {
                let target = known_labels[anchor];
                let partners: Vec<usize> = (0..n)
                    .filter(|&j| {
                        if same_label {
                            j != anchor && known_labels[j] == target
                        } else {
                            known_labels[j] != target
                        }
                    })
                    .collect();
                if let Some(&partner) = partners.choose(rng) {
                    if seen.insert((anchor, partner)) {
                        pairs.push((anchor, partner));
                    }
                }
            }
            round += 1;
        }

        let warning = (pairs.len() < num_constraints).then(|| ConstraintWarning::PairShortfall {
            generated: pairs.len(),
            requested: num_constraints,
            positive: same_label,
        });
        pairs.truncate(num_constraints);
        let mapped = pairs.into_iter().map(|(l, r)| (known_idx[l], known_idx[r])).unzip();
        Ok((mapped, warning))
    }

    /// chunks — assign disjoint same-label groups of `chunk_size` points.
    ///
    /// Returns a vector of chunk ids aligned with the labels; `-1` marks
    /// points left unassigned (always the case for unknown labels).
    ///
    /// Errors
    /// ------
    /// - `ConstraintError::InvalidChunkSize` when `chunk_size == 0`.
    /// - `ConstraintError::NotEnoughChunks` when
    ///   `Σ floor(|class| / chunk_size) < num_chunks`.
    ///
    /// Notes
    /// -----
    /// - The class to draw from is picked uniformly from all but the last
    ///   remaining class (the last one is only used once it is alone).
    pub fn chunks<R: Rng + ?Sized>(
        &self, num_chunks: usize, chunk_size: usize, rng: &mut R,
    ) -> ConstraintResult<Array1<i64>> {
        if chunk_size == 0 {
            return Err(ConstraintError::InvalidChunkSize);
        }
        let mut chunk_ids = Array1::from_elem(self.partial_labels.len(), -1_i64);
        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &label) in self.partial_labels.iter().enumerate() {
            if label >= 0 {
                by_class.entry(label).or_default().push(i);
            }
        }
        let mut pools: Vec<Vec<usize>> = by_class.into_values().collect();
        let max_chunks: usize = pools.iter().map(|p| p.len() / chunk_size).sum();
        if max_chunks < num_chunks {
            return Err(ConstraintError::NotEnoughChunks { chunk_size, num_chunks, max_chunks });
        }

        let mut idx = 0;
        while idx < num_chunks && !pools.is_empty() {
            let c = if pools.len() == 1 { 0 } else { rng.gen_range(0..pools.len() - 1) };
            if pools[c].len() < chunk_size {
                pools.remove(c);
                continue;
            }
            let picked: Vec<usize> = pools[c].choose_multiple(rng, chunk_size).copied().collect();
            pools[c].retain(|i| !picked.contains(i));
            for &i in &picked {
                chunk_ids[i] = idx as i64;
            }
            idx += 1;
        }
        Ok(chunk_ids)
    }

    /// generate_knntriplets — `(anchor, genuine, impostor)` ranking triplets.
    ///
    /// Parameters
    /// ----------
    /// - `x`: points aligned with the label vector, `(n_samples, n_features)`.
    /// - `k_genuine`: nearest same-class neighbours per anchor.
    /// - `k_impostor`: nearest other-class neighbours per anchor.
    ///
    /// Returns
    /// -------
    /// `(n_triplets, 3)` indices into the known-label subset of `x`.
    /// Classes are visited in ascending label order, anchors in index
    /// order, then every genuine neighbour (outer) with every impostor
    /// (inner). Neighbours are searched in the raw Euclidean space.
    ///
    /// Errors
    /// ------
    /// - `ConstraintError::LabelLengthMismatch` if `x` and the labels differ
    ///   in length.
    ///
    /// Notes
    /// -----
    /// - Classes too small for `k_genuine` neighbours, or with too few
    ///   other-class points for `k_impostor`, get reduced counts and a
    ///   logged warning.
    pub fn generate_knntriplets(
        &self, x: &Array2<f64>, k_genuine: usize, k_impostor: usize,
    ) -> ConstraintResult<Array2<usize>> {
        if x.nrows() != self.partial_labels.len() {
            return Err(ConstraintError::LabelLengthMismatch {
                n_labels: self.partial_labels.len(),
                n_samples: x.nrows(),
            });
        }
        let (known_idx, known_labels) = self.known();
        let xk = x.select(Axis(0), &known_idx);
        let len_input = known_labels.len();

        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (pos, &label) in known_labels.iter().enumerate() {
            by_class.entry(label).or_default().push(pos);
        }

        let mut rows: Vec<[usize; 3]> = Vec::new();
        for (&label, members) in &by_class {
            let (k_gen, k_imp, warnings) =
                neighbour_budget(label, members.len(), len_input, k_genuine, k_impostor);
            for w in &warnings {
                w.emit();
            }
            let others: Vec<usize> =
                (0..len_input).filter(|&i| known_labels[i] != label).collect();
            let class_points = xk.select(Axis(0), members);
            let other_points = xk.select(Axis(0), &others);

            for (pos, &anchor) in members.iter().enumerate() {
                let query = class_points.row(pos);
                let genuine = k_nearest(class_points.view(), query, k_gen, Some(pos));
                let impostors = k_nearest(other_points.view(), query, k_imp, None);
                for &g in &genuine {
                    for &m in &impostors {
                        rows.push([anchor, members[g], others[m]]);
                    }
                }
            }
        }
        Ok(Array2::from_shape_fn((rows.len(), 3), |(i, j)| rows[i][j]))
    }
}

/// Per-class neighbour counts after availability reductions.
pub(crate) fn neighbour_budget(
    label: i64, count: usize, len_input: usize, k_genuine: usize, k_impostor: usize,
) -> (usize, usize, Vec<ConstraintWarning>) {
    let mut warnings = Vec::new();
    let mut k_gen = k_genuine;
    if k_genuine + 1 > count {
        k_gen = count.saturating_sub(1);
        warnings.push(ConstraintWarning::GenuineReduced {
            label,
            count,
            requested: k_genuine + 1,
            reduced: k_gen,
        });
    }
    let others = len_input - count;
    let mut k_imp = k_impostor;
    if k_impostor > others {
        k_imp = others;
        warnings.push(ConstraintWarning::ImpostorReduced {
            label,
            others,
            requested: k_impostor,
            reduced: k_imp,
        });
    }
    (k_gen, k_imp, warnings)
}

/// wrap_pairs — materialize pair constraints against a point array.
///
/// Returns `(n_pairs, 2, n_features)` pairs and `{+1, -1}` labels,
/// positives first.
///
/// Errors
/// ------
/// - `ConstraintError::IndexOutOfBounds` if an index exceeds `x.nrows()`.
pub fn wrap_pairs(
    x: &Array2<f64>, constraints: &PairConstraints,
) -> ConstraintResult<(Array3<f64>, Array1<f64>)> {
    let (idx, y) = constraints.wrap_indices();
    let n_samples = x.nrows();
    if let Some(&index) = idx.iter().find(|&&i| i >= n_samples) {
        return Err(ConstraintError::IndexOutOfBounds { index, n_samples });
    }
    let pairs = Array3::from_shape_fn((idx.nrows(), 2, x.ncols()), |(i, j, k)| x[[idx[[i, j]], k]]);
    Ok((pairs, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Exact kNN triplet output on the collinear nine-point fixture.
    // - Neighbour-count reductions and their warnings.
    // - Pair sampling: polarity, no self-pairs, uniqueness, shortfall,
    //   truncation, reproducibility.
    // - Chunk assignment and the feasibility error.
    // - Wrapping pairs into arrays.
    // -------------------------------------------------------------------------

    fn nine_points() -> (Array2<f64>, Constraints) {
        let x = Array2::from_shape_fn((9, 2), |(i, _)| i as f64);
        let labels = Constraints::new(array![1, 1, 1, 2, 2, 2, 3, 3, 3]);
        (x, labels)
    }

    #[test]
    // Purpose
    // -------
    // The collinear fixture yields the documented nine triplets in order.
    //
    // Given
    // -----
    // - Points (i, i) for i in 0..9, labels [1,1,1,2,2,2,3,3,3].
    // - k_genuine = 1, k_impostor = 1.
    //
    // Expect
    // ------
    // - Exactly [[0,1,3],[1,0,3],[2,1,3],[3,4,2],[4,3,2],[5,4,6],[6,7,5],
    //   [7,6,5],[8,7,5]].
    fn knn_triplets_match_collinear_fixture() {
        // Arrange
        let (x, constraints) = nine_points();

        // Act
        let triplets = constraints.generate_knntriplets(&x, 1, 1).expect("fixture is valid");

        // Assert
        let expected = array![
            [0, 1, 3],
            [1, 0, 3],
            [2, 1, 3],
            [3, 4, 2],
            [4, 3, 2],
            [5, 4, 6],
            [6, 7, 5],
            [7, 6, 5],
            [8, 7, 5]
        ];
        assert_eq!(triplets, expected);
    }

    #[test]
    // Purpose
    // -------
    // Unknown labels are skipped and indices refer to the known subset.
    //
    // Given
    // -----
    // - Labels [0, -1, 0, 1, 1] on a line.
    //
    // Expect
    // ------
    // - 4 triplets over positions 0..4 of the known subset; the first is
    //   (0, 1, 2) since known point 1 is original point 2.
    fn knn_triplets_skip_unknown_labels() {
        // Arrange
        let x = array![[0.0], [10.0], [1.0], [3.0], [4.0]];
        let constraints = Constraints::new(array![0, -1, 0, 1, 1]);

        // Act
        let triplets = constraints.generate_knntriplets(&x, 1, 1).expect("valid");

        // Assert
        assert_eq!(triplets.nrows(), 4);
        assert_eq!(triplets.row(0).to_vec(), vec![0, 1, 2]);
        assert!(triplets.iter().all(|&i| i < 4));
    }

    #[test]
    // Purpose
    // -------
    // Small classes reduce genuine and impostor counts with warnings.
    //
    // Given
    // -----
    // - A class of 2 among 5 known points, k_genuine = 3, k_impostor = 4.
    //
    // Expect
    // ------
    // - Budget (1, 3) and both warnings with the reduced counts.
    fn neighbour_budget_reduces_and_warns() {
        // Arrange / Act
        let (k_gen, k_imp, warnings) = neighbour_budget(7, 2, 5, 3, 4);

        // Assert
        assert_eq!((k_gen, k_imp), (1, 3));
        assert_eq!(
            warnings,
            vec![
                ConstraintWarning::GenuineReduced { label: 7, count: 2, requested: 4, reduced: 1 },
                ConstraintWarning::ImpostorReduced {
                    label: 7,
                    others: 3,
                    requested: 4,
                    reduced: 3
                },
            ]
        );
    }

    #[test]
    // Purpose
    // -------
    // Sampled pairs respect polarity, never self-pair, and are unique.
    //
    // Given
    // -----
    // - 12 points in 3 classes plus 2 unknowns, 15 pairs per polarity.
    //
    // Expect
    // ------
    // - Positives share labels with a != b; negatives differ; no duplicates;
    //   no unknown-label index appears.
    fn pairs_respect_polarity_and_uniqueness() {
        // Arrange
        let labels = array![0, 0, 0, 0, 1, 1, 1, 1, -1, 2, 2, 2, 2, -1];
        let constraints = Constraints::new(labels.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        // Act
        let pairs = constraints.positive_negative_pairs(15, false, &mut rng).expect("labels known");

        // Assert
        let mut seen = HashSet::new();
        for (&a, &b) in pairs.a.iter().zip(pairs.b.iter()) {
            assert_ne!(a, b);
            assert_eq!(labels[a], labels[b]);
            assert!(labels[a] >= 0);
            assert!(seen.insert((a, b)), "duplicate positive pair ({a}, {b})");
        }
        let mut seen = HashSet::new();
        for (&c, &d) in pairs.c.iter().zip(pairs.d.iter()) {
            assert_ne!(labels[c], labels[d]);
            assert!(labels[c] >= 0 && labels[d] >= 0);
            assert!(seen.insert((c, d)), "duplicate negative pair ({c}, {d})");
        }
        assert_eq!(pairs.n_positive(), 15);
        assert_eq!(pairs.n_negative(), 15);
    }

    #[test]
    // Purpose
    // -------
    // An unattainable quota stops after the retry budget with a warning.
    //
    // Given
    // -----
    // - Labels [1, 1, 2]: only (0, 1) and (1, 0) are valid positives.
    // - 10 positives requested.
    //
    // Expect
    // ------
    // - At most 2 positives and a shortfall warning with requested = 10.
    fn pair_shortfall_is_reported() {
        // Arrange
        let constraints = Constraints::new(array![1, 1, 2]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        // Act
        let ((a, _b), warning) =
            constraints.sample_pairs(10, true, &mut rng).expect("labels known");

        // Assert
        assert!(a.len() <= 2);
        match warning {
            Some(ConstraintWarning::PairShortfall { generated, requested: 10, positive: true }) => {
                assert_eq!(generated, a.len());
            }
            other => panic!("expected a positive shortfall, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // `same_length` truncates both polarities to the shorter one, and the
    // same seed reproduces the same draw.
    //
    // Given
    // -----
    // - Labels [1, 1, 2, 2]: 4 positives possible, 8 negatives possible.
    // - 8 pairs requested with `same_length = true`, twice with seed 3.
    //
    // Expect
    // ------
    // - Equal lengths (≤ 4) and identical outputs across runs.
    fn same_length_truncates_and_seed_reproduces() {
        // Arrange
        let constraints = Constraints::new(array![1, 1, 2, 2]);

        // Act
        let first = constraints
            .positive_negative_pairs(8, true, &mut ChaCha8Rng::seed_from_u64(3))
            .expect("labels known");
        let second = constraints
            .positive_negative_pairs(8, true, &mut ChaCha8Rng::seed_from_u64(3))
            .expect("labels known");

        // Assert
        assert_eq!(first.n_positive(), first.n_negative());
        assert!(first.n_positive() <= 4);
        assert_eq!(first, second);
    }

    #[test]
    // Purpose
    // -------
    // Chunks are disjoint, same-label, exactly sized, and never include
    // unknown labels.
    //
    // Given
    // -----
    // - Labels with classes of sizes 4, 5, 2 and three unknowns.
    // - 5 chunks of size 2 (maximum feasible is 2 + 2 + 1 = 5).
    //
    // Expect
    // ------
    // - Ids 0..5 each used exactly twice within one class; unknowns stay -1.
    fn chunks_are_disjoint_same_label_groups() {
        // Arrange
        let labels = array![0, 0, 0, 0, 1, 1, 1, 1, 1, 2, 2, -1, -1, -1];
        let constraints = Constraints::new(labels.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        // Act
        let chunks = constraints.chunks(5, 2, &mut rng).expect("5 chunks are feasible");

        // Assert
        for (i, &label) in labels.iter().enumerate() {
            if label < 0 {
                assert_eq!(chunks[i], -1);
            }
        }
        for id in 0..5_i64 {
            let members: Vec<usize> = (0..labels.len()).filter(|&i| chunks[i] == id).collect();
            assert_eq!(members.len(), 2, "chunk {id} has {members:?}");
            assert_eq!(labels[members[0]], labels[members[1]]);
        }
        assert!(chunks.iter().all(|&c| c < 5));
    }

    #[test]
    // Purpose
    // -------
    // Infeasible chunk requests fail with the exact maximum.
    //
    // Given
    // -----
    // - Classes of sizes 3 and 2, chunk_size 2, 3 chunks requested.
    //
    // Expect
    // ------
    // - `NotEnoughChunks { max_chunks: 2, .. }`.
    fn chunks_infeasible_request_reports_maximum() {
        // Arrange
        let constraints = Constraints::new(array![0, 0, 0, 1, 1, -1]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        // Act
        let err = constraints.chunks(3, 2, &mut rng).expect_err("only 2 chunks possible");

        // Assert
        assert_eq!(
            err,
            ConstraintError::NotEnoughChunks { chunk_size: 2, num_chunks: 3, max_chunks: 2 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Wrapping places positives first with +1 labels.
    //
    // Given
    // -----
    // - One positive (0, 1) and one negative (0, 2) on three 1-D points.
    //
    // Expect
    // ------
    // - Pairs [[[0],[1]], [[0],[2]]] and labels [1, -1].
    fn wrap_pairs_orders_positives_first() {
        // Arrange
        let x = array![[0.0], [1.0], [2.0]];
        let pc = PairConstraints { a: array![0], b: array![1], c: array![0], d: array![2] };

        // Act
        let (pairs, y) = wrap_pairs(&x, &pc).expect("indices in range");

        // Assert
        assert_eq!(pairs, array![[[0.0], [1.0]], [[0.0], [2.0]]]);
        assert_eq!(y, array![1.0, -1.0]);
    }
}
