//! learners::covariance — the covariance baseline metric.
//!
//! Nothing is learned: the metric is the inverse sample covariance of the
//! training points (`1 / var` for a single feature), factored into `L` by
//! [`transformer_from_metric`]. A singular covariance is an error.

use crate::{
    input::{CheckOptions, InputArray, Preprocessor, check_points},
    mahalanobis::{
        classifiers::MetricScorer,
        errors::{MetricError, MetricResult},
        metric::MahalanobisMetric,
        psd::{from_dmatrix, to_dmatrix, transformer_from_metric},
    },
};
use ndarray::{Array1, Array2, Axis};

pub const COVARIANCE_NAME: &str = "Covariance";

#[derive(Debug, Clone)]
pub struct Covariance {
    metric: MahalanobisMetric,
}

impl Covariance {
    pub fn new(preprocessor: Option<Preprocessor>) -> Self {
        Self { metric: MahalanobisMetric::new(COVARIANCE_NAME, preprocessor) }
    }

    pub fn metric(&self) -> &MahalanobisMetric {
        &self.metric
    }

    pub fn components(&self) -> MetricResult<&Array2<f64>> {
        self.metric.components()
    }

    pub fn transform(&self, x: &InputArray) -> MetricResult<Array2<f64>> {
        self.metric.transform(x)
    }

    /// Fit on at least two points.
    ///
    /// # Errors
    /// - [`MetricError::Input`] for invalid points.
    /// - [`MetricError::SingularMatrix`] when the covariance has no inverse.
    pub fn fit(&mut self, x: &InputArray) -> MetricResult<()> {
        let opts = CheckOptions::for_estimator(COVARIANCE_NAME).with_min_samples(2);
        let x = check_points(x, self.metric.preprocessor(), &opts)?;
        let metric = inverse_covariance(&x)?;
        let transformer = transformer_from_metric(&metric, None)?;
        self.metric.set_transformer(transformer);
        Ok(())
    }
}

impl MetricScorer for Covariance {
    fn estimator(&self) -> &'static str {
        COVARIANCE_NAME
    }

    fn preprocessor(&self) -> Option<&Preprocessor> {
        self.metric.preprocessor()
    }

    fn pair_distance(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        self.metric.pair_distance(pairs)
    }
}

/// Inverse of the unbiased sample covariance of `x` (`n ≥ 2`).
pub fn inverse_covariance(x: &Array2<f64>) -> MetricResult<Array2<f64>> {
    let n = x.nrows();
    let mean = x.mean_axis(Axis(0)).ok_or(MetricError::SingularMatrix {
        reason: "covariance of an empty sample is undefined",
    })?;
    let centered = x - &mean;
    let cov = centered.t().dot(&centered) / (n - 1) as f64;

    if cov.dim() == (1, 1) {
        let var = cov[[0, 0]];
        if var == 0.0 {
            return Err(MetricError::SingularMatrix { reason: "feature has zero variance" });
        }
        return Ok(Array2::from_elem((1, 1), 1.0 / var));
    }
    let inv = to_dmatrix(&cov)
        .try_inverse()
        .ok_or(MetricError::SingularMatrix { reason: "covariance matrix is not invertible" })?;
    let inv = from_dmatrix(&inv);
    // Restore exact symmetry lost to rounding in the inverse.
    Ok((&inv + &inv.t()) * 0.5)
}
