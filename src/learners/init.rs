//! learners::init — initial transforms for iterative learners.
//!
//! Purpose
//! -------
//! Produce the starting `L` (shape `(n_components, n_features)`) handed to
//! the optimizer: identity, PCA, LDA, standard-normal random, or a
//! user-supplied matrix, with `Auto` choosing among the first three from
//! the data shape.
//!
//! Key behaviors
//! -------------
//! - [`auto_select_init`]: LDA when class labels exist and
//!   `n_components ≤ min(n_features, n_classes − 1)`; PCA when
//!   `n_components < min(n_features, n_samples)`; identity otherwise.
//! - PCA rows are the leading eigenvectors of the sample covariance, each
//!   signed so its largest-magnitude entry is positive.
//! - LDA whitens the within-class scatter and takes the leading directions
//!   of the whitened between-class scatter.
//! - Random draws come from `rand_distr::StandardNormal` through the
//!   caller's RNG, so a seeded `ChaCha8Rng` reproduces the same start.
//!
//! Conventions
//! -----------
//! - All failures are [`MetricError::InvalidInit`] with a user-facing
//!   message.

use crate::mahalanobis::{
    errors::{MetricError, MetricResult},
    psd::symmetric_eigen,
};
use ndarray::{Array1, Array2, Axis, s};
use rand::Rng;
use rand_distr::StandardNormal;
use std::str::FromStr;

/// Eigenvalues at or below this are dropped when whitening.
pub const WHITENING_EPS: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitStrategy {
    #[default]
    Auto,
    Identity,
    Pca,
    Lda,
    Random,
    Matrix(Array2<f64>),
}

impl FromStr for InitStrategy {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(InitStrategy::Auto),
            "identity" => Ok(InitStrategy::Identity),
            "pca" => Ok(InitStrategy::Pca),
            "lda" => Ok(InitStrategy::Lda),
            "random" => Ok(InitStrategy::Random),
            _ => Err(MetricError::InvalidInit {
                message: format!(
                    "`init` must be 'auto', 'pca', 'lda', 'identity', 'random' or a matrix of \
                     shape (n_components, n_features); got '{s}'."
                ),
            }),
        }
    }
}

/// Resolve [`InitStrategy::Auto`] from the data shape.
pub fn auto_select_init(
    has_classes: bool, n_features: usize, n_samples: usize, n_components: usize,
    n_classes: usize,
) -> InitStrategy {
    if has_classes && n_classes > 0 && n_components <= n_features.min(n_classes - 1) {
        InitStrategy::Lda
    } else if n_components < n_features.min(n_samples) {
        InitStrategy::Pca
    } else {
        InitStrategy::Identity
    }
}

/// Build the initial transform for `x` (`n × d`).
///
/// `class_labels` is `Some` only for learners trained on classes; LDA is
/// unavailable otherwise.
///
/// # Errors
/// [`MetricError::InvalidInit`] for an unusable strategy or matrix.
pub fn initialize_transformer<R: Rng + ?Sized>(
    init: &InitStrategy, x: &Array2<f64>, class_labels: Option<&Array1<f64>>,
    n_components: usize, rng: &mut R,
) -> MetricResult<Array2<f64>> {
    let (n_samples, n_features) = x.dim();
    let classes = class_labels.map(distinct_labels).unwrap_or_default();
    let strategy = match init {
        InitStrategy::Auto => auto_select_init(
            class_labels.is_some(),
            n_features,
            n_samples,
            n_components,
            classes.len(),
        ),
        other => other.clone(),
    };
    log::debug!("initializing {n_components}x{n_features} transform with {strategy:?}");

    match strategy {
        InitStrategy::Identity | InitStrategy::Auto => {
            Ok(rectangular_identity(n_components, n_features))
        }
        InitStrategy::Pca => Ok(pca_components(x, n_components)),
        InitStrategy::Lda => match class_labels {
            Some(y) => lda_components(x, y, &classes, n_components),
            None => Err(MetricError::InvalidInit {
                message: "`init` 'lda' requires class labels; use 'auto', 'pca', 'identity', \
                          'random' or a matrix."
                    .to_string(),
            }),
        },
        InitStrategy::Random => Ok(Array2::from_shape_fn((n_components, n_features), |_| {
            rng.sample::<f64, _>(StandardNormal)
        })),
        InitStrategy::Matrix(m) => {
            check_init_matrix(&m, n_features, n_components)?;
            Ok(m)
        }
    }
}

/// Shape checks for a user-supplied initial transform.
pub fn check_init_matrix(
    init: &Array2<f64>, n_features: usize, n_components: usize,
) -> MetricResult<()> {
    let (rows, cols) = init.dim();
    if cols != n_features {
        return Err(MetricError::InvalidInit {
            message: format!(
                "The input dimensionality ({cols}) of the given linear transformation `init` \
                 must match the dimensionality of the given inputs `X` ({n_features})."
            ),
        });
    }
    if rows > cols {
        return Err(MetricError::InvalidInit {
            message: format!(
                "The output dimensionality ({rows}) of the given linear transformation `init` \
                 cannot be greater than its input dimensionality ({cols})."
            ),
        });
    }
    if rows != n_components {
        return Err(MetricError::InvalidInit {
            message: format!(
                "The preferred dimensionality of the projected space `n_components` \
                 ({n_components}) does not match the output dimensionality of the given linear \
                 transformation `init` ({rows})!"
            ),
        });
    }
    if init.iter().any(|v| !v.is_finite()) {
        return Err(MetricError::InvalidInit {
            message: "The given linear transformation `init` contains non-finite values."
                .to_string(),
        });
    }
    Ok(())
}

// ---- Helper methods ----

fn rectangular_identity(rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(i, j)| if i == j { 1.0 } else { 0.0 })
}

fn distinct_labels(y: &Array1<f64>) -> Vec<f64> {
    let mut labels = y.to_vec();
    labels.sort_by(f64::total_cmp);
    labels.dedup();
    labels
}

fn sample_covariance(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let centered = match x.mean_axis(Axis(0)) {
        Some(mean) => x - &mean,
        None => return Array2::zeros((x.ncols(), x.ncols())),
    };
    centered.t().dot(&centered) / (n.saturating_sub(1).max(1) as f64)
}

/// Flip each row so its largest-magnitude entry is positive.
fn fix_signs(components: &mut Array2<f64>) {
    for mut row in components.outer_iter_mut() {
        let pivot =
            row.iter().copied().fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        if pivot < 0.0 {
            row.mapv_inplace(|v| -v);
        }
    }
}

fn pca_components(x: &Array2<f64>, n_components: usize) -> Array2<f64> {
    let (_, vectors) = symmetric_eigen(&sample_covariance(x));
    let mut components = vectors.t().slice(s![..n_components, ..]).to_owned();
    fix_signs(&mut components);
    components
}

fn lda_components(
    x: &Array2<f64>, y: &Array1<f64>, classes: &[f64], n_components: usize,
) -> MetricResult<Array2<f64>> {
    let n_features = x.ncols();
    if classes.len() < 2 || n_components > n_features.min(classes.len() - 1) {
        return Err(MetricError::InvalidInit {
            message: "n_components cannot be larger than min(n_features, n_classes - 1)."
                .to_string(),
        });
    }
    let overall = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
    let mut within = Array2::<f64>::zeros((n_features, n_features));
    let mut between = Array2::<f64>::zeros((n_features, n_features));
    for &label in classes {
        let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == label).collect();
        let members = x.select(Axis(0), &rows);
        let Some(mean) = members.mean_axis(Axis(0)) else { continue };
        let centered = &members - &mean;
        within = within + centered.t().dot(&centered);
        let shift = (&mean - &overall).insert_axis(Axis(1));
        between = between + shift.dot(&shift.t()) * rows.len() as f64;
    }

    // Whitening map W with Wᵀ S_w W = I on the retained subspace.
    let (w_vals, w_vecs) = symmetric_eigen(&within);
    let kept: Vec<usize> = (0..w_vals.len()).filter(|&k| w_vals[k] > WHITENING_EPS).collect();
    if kept.is_empty() {
        return Err(MetricError::InvalidInit {
            message: "LDA initialization failed: within-class scatter is zero.".to_string(),
        });
    }
    let mut whiten = w_vecs.select(Axis(1), &kept);
    for (mut col, &k) in whiten.axis_iter_mut(Axis(1)).zip(&kept) {
        let scale = 1.0 / w_vals[k].sqrt();
        col.mapv_inplace(|v| v * scale);
    }
    let projected = whiten.t().dot(&between).dot(&whiten);
    let (_, b_vecs) = symmetric_eigen(&projected);
    let directions = whiten.dot(&b_vecs);
    let take = n_components.min(directions.ncols());
    let mut components = Array2::<f64>::zeros((n_components, n_features));
    components
        .slice_mut(s![..take, ..])
        .assign(&directions.t().slice(s![..take, ..]));
    fix_signs(&mut components);
    Ok(components)
}
