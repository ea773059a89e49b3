//! mahalanobis::metric — the learned Mahalanobis metric and its operations.
//!
//! Purpose
//! -------
//! Hold the learned transform `L` (shape `(k, d)`) together with an
//! optional preprocessor, and expose everything a fitted learner offers:
//! pair distances, embeddings, a standalone metric function, and the
//! Mahalanobis matrix `M = LᵀL`.
//!
//! Key behaviors
//! -------------
//! - `L` lives behind an `Arc`; [`MahalanobisMetric::set_transformer`]
//!   swaps the whole `Arc`, so closures returned by
//!   [`MahalanobisMetric::get_metric`] keep the transform they captured.
//! - Every scoring entry point validates its input through
//!   `input::check_tuples` / `input::check_points` with the metric's own
//!   preprocessor before touching `L`.
//! - [`TransformerSnapshot`] persists `L` as a flat row-major buffer plus
//!   its shape.
//!
//! Invariants & assumptions
//! ------------------------
//! - Distances are Euclidean norms of `L (x₂ − x₁)`; they are symmetric,
//!   non-negative, and zero on identical points.
//! - Feature counts of scored data must equal `L.ncols()`.

use crate::{
    input::{CheckOptions, InputArray, Preprocessor, check_points, check_tuples},
    mahalanobis::errors::{MetricError, MetricResult},
};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Standalone distance function over two points.
pub type MetricFn =
    Box<dyn Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>) -> MetricResult<f64> + Send + Sync>;

/// Flat persisted form of a transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerSnapshot {
    pub n_rows: usize,
    pub n_cols: usize,
    pub data: Vec<f64>,
}

impl TransformerSnapshot {
    pub fn from_array(transformer: &Array2<f64>) -> Self {
        let (n_rows, n_cols) = transformer.dim();
        Self { n_rows, n_cols, data: transformer.iter().copied().collect() }
    }

    /// Rebuild the `(n_rows, n_cols)` matrix.
    ///
    /// # Errors
    /// [`MetricError::DimensionMismatch`] when the buffer length disagrees
    /// with the recorded shape.
    pub fn to_array(&self) -> MetricResult<Array2<f64>> {
        let expected = self.n_rows * self.n_cols;
        Array2::from_shape_vec((self.n_rows, self.n_cols), self.data.clone()).map_err(|_| {
            MetricError::DimensionMismatch {
                expected,
                found: self.data.len(),
                what: "snapshot buffer",
            }
        })
    }
}

/// A Mahalanobis metric: optional preprocessor plus an optional learned
/// transform.
#[derive(Debug, Clone)]
pub struct MahalanobisMetric {
    estimator: &'static str,
    preprocessor: Option<Preprocessor>,
    transformer: Option<Arc<Array2<f64>>>,
}

impl MahalanobisMetric {
    /// An unfitted metric. `estimator` names the owner in error messages.
    pub fn new(estimator: &'static str, preprocessor: Option<Preprocessor>) -> Self {
        Self { estimator, preprocessor, transformer: None }
    }

    pub fn estimator(&self) -> &'static str {
        self.estimator
    }

    pub fn preprocessor(&self) -> Option<&Preprocessor> {
        self.preprocessor.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.transformer.is_some()
    }

    /// The learned transform `L`.
    pub fn components(&self) -> MetricResult<&Array2<f64>> {
        self.transformer_arc().map(|l| l.as_ref())
    }

    /// Install a new transform, replacing any previous one wholesale.
    pub fn set_transformer(&mut self, transformer: Array2<f64>) {
        self.transformer = Some(Arc::new(transformer));
    }

    /// Learned distance of every pair.
    ///
    /// `pairs` is `(n_pairs, 2, n_features)` or, with a preprocessor,
    /// `(n_pairs, 2)` indicators.
    ///
    /// # Errors
    /// - [`MetricError::NotFitted`] before a transform is installed.
    /// - [`MetricError::Input`] for invalid pairs.
    /// - [`MetricError::DimensionMismatch`] when the feature count differs
    ///   from `L.ncols()`.
    pub fn pair_distance(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        let l = self.transformer_arc()?;
        let pairs = check_tuples(pairs, self.preprocessor(), Some(2), &self.check_options())?;
        check_n_features(l, pairs.shape()[2])?;
        // The embedding is linear, so embed the difference directly.
        let diffs = &pairs.index_axis(Axis(1), 1) - &pairs.index_axis(Axis(1), 0);
        let embedded = diffs.dot(&l.t());
        Ok(embedded.map_axis(Axis(1), |row| row.dot(&row).sqrt()))
    }

    /// Alias of [`pair_distance`](Self::pair_distance).
    pub fn score_pairs(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        self.pair_distance(pairs)
    }

    /// Similarity of every pair: the negated distance.
    pub fn pair_score(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        Ok(-self.pair_distance(pairs)?)
    }

    /// Embed points as `X Lᵀ`.
    pub fn transform(&self, x: &InputArray) -> MetricResult<Array2<f64>> {
        let l = self.transformer_arc()?;
        let x = check_points(x, self.preprocessor(), &self.check_options())?;
        check_n_features(l, x.ncols())?;
        Ok(x.dot(&l.t()))
    }

    /// A distance function bound to the current transform.
    ///
    /// The closure owns its own `Arc` to `L`; later refits do not affect it.
    pub fn get_metric(&self) -> MetricResult<MetricFn> {
        let l = Arc::clone(self.transformer_arc()?);
        Ok(Box::new(move |u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>| {
            if u.len() != v.len() {
                return Err(MetricError::DimensionMismatch {
                    expected: u.len(),
                    found: v.len(),
                    what: "second point",
                });
            }
            check_n_features(&l, u.len())?;
            let diff = &v - &u;
            let embedded = l.dot(&diff);
            Ok(embedded.dot(&embedded).sqrt())
        }))
    }

    /// `M = LᵀL`.
    pub fn get_mahalanobis_matrix(&self) -> MetricResult<Array2<f64>> {
        let l = self.transformer_arc()?;
        Ok(l.t().dot(l.as_ref()))
    }

    pub fn snapshot(&self) -> MetricResult<TransformerSnapshot> {
        Ok(TransformerSnapshot::from_array(self.transformer_arc()?))
    }

    /// Install the transform stored in `snapshot`.
    pub fn restore(&mut self, snapshot: &TransformerSnapshot) -> MetricResult<()> {
        self.set_transformer(snapshot.to_array()?);
        Ok(())
    }

    pub(crate) fn check_options(&self) -> CheckOptions {
        CheckOptions::for_estimator(self.estimator)
    }

    fn transformer_arc(&self) -> MetricResult<&Arc<Array2<f64>>> {
        self.transformer.as_ref().ok_or(MetricError::NotFitted { estimator: self.estimator })
    }
}

fn check_n_features(l: &Array2<f64>, found: usize) -> MetricResult<()> {
    if found != l.ncols() {
        return Err(MetricError::DimensionMismatch {
            expected: l.ncols(),
            found,
            what: "number of features",
        });
    }
    Ok(())
}
