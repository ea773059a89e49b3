//! mahalanobis::classifiers — pair, triplet, and quadruplet decision rules.
//!
//! Purpose
//! -------
//! Turn any [`MetricScorer`] into a classifier over tuples. Each strategy
//! borrows its scorer, so one learned metric can back several of them.
//!
//! Key behaviors
//! -------------
//! - [`PairsClassifier`]: similar (`+1`) when the distance is at most a
//!   calibrated threshold; scored by ROC AUC of the similarity.
//! - [`TripletsClassifier`]: `+1` when the anchor is closer to the second
//!   point than to the third.
//! - [`QuadrupletsClassifier`]: `+1` when the first pair is closer than the
//!   second pair.
//!
//! Conventions
//! -----------
//! - Ranking predictions use the sign of the decision function, so exact
//!   ties predict `0`; ranking scores are `mean(prediction) / 2 + 0.5`.

use crate::{
    input::{
        CheckOptions, InputArray, InputError, Preprocessor, check_tuples,
        check_y_valid_values_for_pairs,
    },
    mahalanobis::{
        errors::{MetricError, MetricResult},
        metric::MahalanobisMetric,
    },
};
use ndarray::{Array1, Array3, Axis};

/// Capability of scoring pairs with a learned metric.
pub trait MetricScorer {
    /// Name used in validation messages.
    fn estimator(&self) -> &'static str;

    fn preprocessor(&self) -> Option<&Preprocessor>;

    /// Distance of every pair, `(n, 2, d)` points or `(n, 2)` indicators.
    fn pair_distance(&self, pairs: &InputArray) -> MetricResult<Array1<f64>>;

    /// Similarity of every pair.
    fn pair_score(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        Ok(-self.pair_distance(pairs)?)
    }
}

impl MetricScorer for MahalanobisMetric {
    fn estimator(&self) -> &'static str {
        MahalanobisMetric::estimator(self)
    }

    fn preprocessor(&self) -> Option<&Preprocessor> {
        MahalanobisMetric::preprocessor(self)
    }

    fn pair_distance(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        MahalanobisMetric::pair_distance(self, pairs)
    }
}

// ---- Pairs ----

/// Threshold classifier over pairs.
#[derive(Debug, Clone)]
pub struct PairsClassifier<'a, S: MetricScorer + ?Sized> {
    scorer: &'a S,
    threshold: Option<f64>,
}

impl<'a, S: MetricScorer + ?Sized> PairsClassifier<'a, S> {
    pub fn new(scorer: &'a S) -> Self {
        Self { scorer, threshold: None }
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = Some(threshold);
    }

    pub fn decision_function(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        self.scorer.pair_score(pairs)
    }

    /// `+1` for pairs whose distance is at most the threshold, else `-1`.
    ///
    /// # Errors
    /// [`MetricError::NotCalibrated`] when no threshold is set.
    pub fn predict(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        let threshold = self.threshold.ok_or(MetricError::NotCalibrated)?;
        let distances = self.scorer.pair_distance(pairs)?;
        Ok(distances.mapv(|d| if d <= threshold { 1.0 } else { -1.0 }))
    }

    /// ROC AUC of the similarity scores against `y ∈ {-1, +1}`.
    ///
    /// # Errors
    /// - Invalid pair labels or a label count that does not match.
    /// - [`MetricError::UndefinedScore`] when `y` holds a single class.
    pub fn score(&self, pairs: &InputArray, y: &Array1<f64>) -> MetricResult<f64> {
        let scores = self.decision_function(pairs)?;
        check_pair_labels(scores.len(), y)?;
        roc_auc(&scores, y)
    }

    /// Pick and store the distance threshold that maximizes accuracy on
    /// `(pairs, y)`.
    ///
    /// Candidate cuts lie between consecutive distinct sorted distances;
    /// the threshold is the midpoint of the chosen gap. Accepting every
    /// pair uses the largest distance, rejecting every pair uses the
    /// smallest distance minus one.
    pub fn calibrate_threshold(&mut self, pairs: &InputArray, y: &Array1<f64>) -> MetricResult<f64> {
        let distances = self.scorer.pair_distance(pairs)?;
        check_pair_labels(distances.len(), y)?;
        let n = distances.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| distances[i].total_cmp(&distances[j]));
        let d: Vec<f64> = order.iter().map(|&i| distances[i]).collect();
        let positive: Vec<bool> = order.iter().map(|&i| y[i] > 0.0).collect();

        // Accept the first `k` sorted pairs; correct = accepted positives
        // plus rejected negatives.
        let total_negatives = positive.iter().filter(|p| !**p).count();
        let (mut best_k, mut best_correct) = (0, total_negatives);
        let (mut tp, mut fp) = (0, 0);
        for k in 1..=n {
            if positive[k - 1] { tp += 1 } else { fp += 1 }
            let splittable = k == n || d[k - 1] < d[k];
            let correct = tp + (total_negatives - fp);
            if splittable && correct > best_correct {
                best_k = k;
                best_correct = correct;
            }
        }
        let threshold = match best_k {
            0 => d[0] - 1.0,
            k if k == n => d[n - 1],
            k => 0.5 * (d[k - 1] + d[k]),
        };
        log::debug!(
            "calibrated pair threshold {threshold:.6} (accuracy {:.4})",
            best_correct as f64 / n as f64
        );
        self.threshold = Some(threshold);
        Ok(threshold)
    }
}

// ---- Triplets ----

/// Ranking classifier over `(anchor, positive, negative)` triplets.
#[derive(Debug, Clone, Copy)]
pub struct TripletsClassifier<'a, S: MetricScorer + ?Sized> {
    scorer: &'a S,
}

impl<'a, S: MetricScorer + ?Sized> TripletsClassifier<'a, S> {
    pub fn new(scorer: &'a S) -> Self {
        Self { scorer }
    }

    /// `score(a, b) − score(a, c)` per triplet.
    pub fn decision_function(&self, triplets: &InputArray) -> MetricResult<Array1<f64>> {
        let formed = form_tuples(self.scorer, triplets, 3)?;
        let ab = self.scorer.pair_score(&select_pair(&formed, [0, 1]))?;
        let ac = self.scorer.pair_score(&select_pair(&formed, [0, 2]))?;
        Ok(ab - ac)
    }

    pub fn predict(&self, triplets: &InputArray) -> MetricResult<Array1<f64>> {
        Ok(self.decision_function(triplets)?.mapv(sign))
    }

    /// Fraction of correctly ordered triplets, ties counting half.
    pub fn score(&self, triplets: &InputArray) -> MetricResult<f64> {
        ranking_accuracy(&self.predict(triplets)?)
    }
}

// ---- Quadruplets ----

/// Ranking classifier over `(a, b, c, d)` quadruplets.
#[derive(Debug, Clone, Copy)]
pub struct QuadrupletsClassifier<'a, S: MetricScorer + ?Sized> {
    scorer: &'a S,
}

impl<'a, S: MetricScorer + ?Sized> QuadrupletsClassifier<'a, S> {
    pub fn new(scorer: &'a S) -> Self {
        Self { scorer }
    }

    /// `score(a, b) − score(c, d)` per quadruplet.
    pub fn decision_function(&self, quadruplets: &InputArray) -> MetricResult<Array1<f64>> {
        let formed = form_tuples(self.scorer, quadruplets, 4)?;
        let ab = self.scorer.pair_score(&select_pair(&formed, [0, 1]))?;
        let cd = self.scorer.pair_score(&select_pair(&formed, [2, 3]))?;
        Ok(ab - cd)
    }

    pub fn predict(&self, quadruplets: &InputArray) -> MetricResult<Array1<f64>> {
        Ok(self.decision_function(quadruplets)?.mapv(sign))
    }

    pub fn score(&self, quadruplets: &InputArray) -> MetricResult<f64> {
        ranking_accuracy(&self.predict(quadruplets)?)
    }
}

// ---- Helper methods ----

fn form_tuples<S: MetricScorer + ?Sized>(
    scorer: &S, tuples: &InputArray, tuple_size: usize,
) -> MetricResult<Array3<f64>> {
    let opts = CheckOptions::for_estimator(scorer.estimator());
    Ok(check_tuples(tuples, scorer.preprocessor(), Some(tuple_size), &opts)?)
}

fn select_pair(tuples: &Array3<f64>, columns: [usize; 2]) -> InputArray {
    tuples.select(Axis(1), &columns).into()
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn ranking_accuracy(predictions: &Array1<f64>) -> MetricResult<f64> {
    let mean = predictions
        .mean()
        .ok_or(MetricError::UndefinedScore { reason: "no tuples to score" })?;
    Ok(mean / 2.0 + 0.5)
}

fn check_pair_labels(n_pairs: usize, y: &Array1<f64>) -> MetricResult<()> {
    if y.len() != n_pairs {
        return Err(InputError::InconsistentLength { n_samples: n_pairs, n_labels: y.len() }.into());
    }
    check_y_valid_values_for_pairs(y)?;
    Ok(())
}

/// Rank-based ROC AUC with average ranks for tied scores.
fn roc_auc(scores: &Array1<f64>, y: &Array1<f64>) -> MetricResult<f64> {
    let n_pos = y.iter().filter(|v| **v > 0.0).count();
    let n_neg = y.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(MetricError::UndefinedScore {
            reason: "Only one class present in y_true. ROC AUC score is not defined in that case.",
        });
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| scores[i].total_cmp(&scores[j]));
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; ties share the average of their positions.
        let avg = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }
    let pos_rank_sum: f64 = y.iter().zip(&ranks).filter(|(v, _)| **v > 0.0).map(|(_, r)| r).sum();
    let n_pos_f = n_pos as f64;
    Ok((pos_rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Pair prediction with and without a threshold, AUC, and threshold
    //   calibration on separable data.
    // - Triplet and quadruplet decision functions, predictions, and scores.
    // - The AUC helper with ties.
    // -------------------------------------------------------------------------

    fn identity_metric() -> MahalanobisMetric {
        let mut metric = MahalanobisMetric::new("TestLearner", None);
        metric.set_transformer(Array2::eye(1));
        metric
    }

    /// Pairs on a line with distances 1, 2, 3, 4.
    fn line_pairs() -> InputArray {
        let pairs: Array3<f64> =
            array![[[0.0], [1.0]], [[0.0], [2.0]], [[0.0], [3.0]], [[0.0], [4.0]]];
        pairs.into()
    }

    #[test]
    // Purpose
    // -------
    // Prediction needs a threshold and accepts distances up to it.
    //
    // Given
    // -----
    // - Distances [1, 2, 3, 4]; no threshold, then threshold 2.
    //
    // Expect
    // ------
    // - `NotCalibrated`, then [1, 1, -1, -1].
    fn pair_prediction_requires_threshold() {
        // Arrange
        let metric = identity_metric();
        let mut clf = PairsClassifier::new(&metric);
        let pairs = line_pairs();

        // Act
        let before = clf.predict(&pairs);
        clf.set_threshold(2.0);
        let after = clf.predict(&pairs).unwrap();

        // Assert
        assert!(matches!(before, Err(MetricError::NotCalibrated)));
        assert_eq!(after, array![1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    // Purpose
    // -------
    // Calibration on separable data lands between the classes and yields
    // perfect AUC and accuracy.
    //
    // Given
    // -----
    // - Distances [1, 2, 3, 4] with labels [+1, +1, -1, -1].
    //
    // Expect
    // ------
    // - Threshold 2.5, AUC 1, predictions equal labels.
    fn calibration_separates_classes() {
        // Arrange
        let metric = identity_metric();
        let mut clf = PairsClassifier::new(&metric);
        let pairs = line_pairs();
        let y = array![1.0, 1.0, -1.0, -1.0];

        // Act
        let t = clf.calibrate_threshold(&pairs, &y).unwrap();
        let auc = clf.score(&pairs, &y).unwrap();

        // Assert
        assert_abs_diff_eq!(t, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(auc, 1.0, epsilon = 1e-12);
        assert_eq!(clf.predict(&pairs).unwrap(), y);
    }

    #[test]
    // Purpose
    // -------
    // Pair labels outside {-1, +1} and single-class labels are rejected.
    //
    // Given
    // -----
    // - y = [1, 0, 1, 1] and y = [1, 1, 1, 1].
    //
    // Expect
    // ------
    // - `Input(InvalidPairLabels)` and `UndefinedScore`.
    fn pair_score_validates_labels() {
        // Arrange
        let metric = identity_metric();
        let clf = PairsClassifier::new(&metric);
        let pairs = line_pairs();

        // Act
        let bad = clf.score(&pairs, &array![1.0, 0.0, 1.0, 1.0]);
        let single = clf.score(&pairs, &array![1.0, 1.0, 1.0, 1.0]);

        // Assert
        assert!(matches!(bad, Err(MetricError::Input(InputError::InvalidPairLabels))));
        assert!(matches!(single, Err(MetricError::UndefinedScore { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Tied scores across classes count half in the AUC.
    //
    // Given
    // -----
    // - scores [0, 0, 1], labels [+1, -1, +1].
    //
    // Expect
    // ------
    // - AUC = (0.5 + 1) / 2 = 0.75.
    fn auc_counts_ties_half() {
        // Act
        let auc = roc_auc(&array![0.0, 0.0, 1.0], &array![1.0, -1.0, 1.0]).unwrap();

        // Assert
        assert_abs_diff_eq!(auc, 0.75, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Triplets predict +1 when the anchor is closer to the second point.
    //
    // Given
    // -----
    // - (0, 1, 5): correct; (0, 5, 1): wrong; (0, 2, -2): tie.
    //
    // Expect
    // ------
    // - Decisions [4, -4, 0], predictions [1, -1, 0], score 0.5.
    fn triplets_rank_by_anchor_distance() {
        // Arrange
        let metric = identity_metric();
        let clf = TripletsClassifier::new(&metric);
        let triplets: Array3<f64> =
            array![[[0.0], [1.0], [5.0]], [[0.0], [5.0], [1.0]], [[0.0], [2.0], [-2.0]]];
        let triplets: InputArray = triplets.into();

        // Act
        let decision = clf.decision_function(&triplets).unwrap();
        let pred = clf.predict(&triplets).unwrap();
        let score = clf.score(&triplets).unwrap();

        // Assert
        assert_abs_diff_eq!(decision, array![4.0, -4.0, 0.0], epsilon = 1e-12);
        assert_eq!(pred, array![1.0, -1.0, 0.0]);
        assert_abs_diff_eq!(score, 0.5, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Quadruplets compare the first pair against the second.
    //
    // Given
    // -----
    // - ((0,1),(0,3)) and ((0,1),(0,3)) reversed as ((0,3),(0,1)).
    //
    // Expect
    // ------
    // - Predictions [1, -1]; with only the first, score 1.
    fn quadruplets_compare_pairs() {
        // Arrange
        let metric = identity_metric();
        let clf = QuadrupletsClassifier::new(&metric);
        let both: Array3<f64> =
            array![[[0.0], [1.0], [0.0], [3.0]], [[0.0], [3.0], [0.0], [1.0]]];
        let first: Array3<f64> = array![[[0.0], [1.0], [0.0], [3.0]]];
        let (both, first) = (InputArray::from(both), InputArray::from(first));

        // Act
        let pred = clf.predict(&both).unwrap();
        let score = clf.score(&first).unwrap();

        // Assert
        assert_eq!(pred, array![1.0, -1.0]);
        assert_abs_diff_eq!(score, 1.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Tuples of the wrong width are rejected before scoring.
    //
    // Given
    // -----
    // - Pairs passed to the triplet classifier.
    //
    // Expect
    // ------
    // - `Input(TupleSize { expected: 3, found: 2, .. })`.
    fn triplets_reject_pairs() {
        // Arrange
        let metric = identity_metric();
        let clf = TripletsClassifier::new(&metric);

        // Act
        let err = clf.predict(&line_pairs()).unwrap_err();

        // Assert
        assert!(matches!(
            err,
            MetricError::Input(InputError::TupleSize { expected: 3, found: 2, .. })
        ));
    }
}
