//! learners::mlkr — Metric Learning for Kernel Regression.
//!
//! Purpose
//! -------
//! Learn a linear transform `L` (shape `(k, d)`) that minimizes the
//! leave-one-out kernel-regression error on real-valued targets, using
//! L-BFGS with an analytic gradient.
//!
//! Key behaviors
//! -------------
//! - Loss: `E(L) = Σᵢ (ŷᵢ − yᵢ)²` with `ŷ = P y`, where `P` is the row
//!   softmax of negative squared embedded distances and each point's own
//!   distance is `+∞`.
//! - Gradient: `∇E = 4 · X_embᵀ · W_sym · X` with
//!   `W_ij = P_ij (ŷᵢ − yᵢ)(y_j − ŷᵢ)`, `W_sym = W + Wᵀ`, and the diagonal
//!   of `W_sym` set to `−(colsum(W) + rowsum(W))`.
//! - Non-convergence is logged with `log::warn!` and the best parameters
//!   are installed anyway; only validation and optimizer errors fail a fit.
//!
//! Invariants & assumptions
//! ------------------------
//! - At least two samples (leave-one-out needs a neighbour).
//! - `θ` is `L` flattened row-major; its length is `k · d`.
//! - A failed `fit` leaves any previously learned transform untouched.
//!
//! Testing notes
//! -------------
//! - The analytic gradient is checked against `finitediff` central
//!   differences on random problems.

use crate::{
    input::{
        CheckOptions, InputArray, InputKind, Preprocessor, ValidatedInput, check_input,
        check_n_components,
    },
    learners::init::{InitStrategy, initialize_transformer},
    mahalanobis::{
        classifiers::MetricScorer,
        errors::{MetricError, MetricResult},
        metric::MahalanobisMetric,
    },
    optimization::{
        errors::{OptError, OptResult},
        lbfgs::{
            LineSearcher, Objective, OptimOptions, Tolerances, minimize,
            types::{Cost, Grad, Theta},
            validation::validate_theta_input,
        },
        numerical_stability::{SOFTMAX_FLOOR, softmax_rows},
    },
};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Name used in validation and `NotFitted` messages.
pub const MLKR_NAME: &str = "MLKR";

/// Default gradient tolerance when `tol` is not given.
pub const DEFAULT_MLKR_TOL: f64 = 1e-6;

/// MLKR configuration.
///
/// Default: `n_components = None` (all features), `init = Auto`,
/// `tol = None` ([`DEFAULT_MLKR_TOL`]), `max_iter = 1000`, no seed,
/// More–Thuente line search, quiet, no preprocessor.
#[derive(Debug, Clone)]
pub struct MLKROptions {
    pub n_components: Option<usize>,
    pub init: InitStrategy,
    pub tol: Option<f64>,
    pub max_iter: usize,
    pub random_seed: Option<u64>,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub preprocessor: Option<Preprocessor>,
}

impl Default for MLKROptions {
    fn default() -> Self {
        Self {
            n_components: None,
            init: InitStrategy::Auto,
            tol: None,
            max_iter: 1000,
            random_seed: None,
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            preprocessor: None,
        }
    }
}

impl MLKROptions {
    fn optim_options(&self) -> OptResult<OptimOptions> {
        let tols =
            Tolerances::new(Some(self.tol.unwrap_or(DEFAULT_MLKR_TOL)), None, Some(self.max_iter))?;
        OptimOptions::new(tols, self.line_searcher, self.verbose, None)
    }
}

/// What a successful fit reports.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
    pub loss: f64,
}

/// MLKR learner: options plus the learned metric.
#[derive(Debug, Clone)]
pub struct MLKR {
    opts: MLKROptions,
    metric: MahalanobisMetric,
    n_iter: Option<usize>,
}

impl MLKR {
    pub fn new(opts: MLKROptions) -> Self {
        let metric = MahalanobisMetric::new(MLKR_NAME, opts.preprocessor.clone());
        Self { opts, metric, n_iter: None }
    }

    pub fn options(&self) -> &MLKROptions {
        &self.opts
    }

    pub fn metric(&self) -> &MahalanobisMetric {
        &self.metric
    }

    /// Iterations of the last successful fit.
    pub fn n_iter(&self) -> Option<usize> {
        self.n_iter
    }

    pub fn components(&self) -> MetricResult<&Array2<f64>> {
        self.metric.components()
    }

    pub fn transform(&self, x: &InputArray) -> MetricResult<Array2<f64>> {
        self.metric.transform(x)
    }

    /// Fit on points `x` (or indicators with a preprocessor) and targets `y`.
    ///
    /// # Errors
    /// - [`MetricError::Input`] for invalid `x`/`y` or `n_components`.
    /// - [`MetricError::InvalidInit`] for an unusable initialization.
    /// - [`MetricError::Opt`] when the optimizer itself fails.
    pub fn fit(&mut self, x: &InputArray, y: &Array1<f64>) -> MetricResult<FitSummary> {
        let check = CheckOptions::for_estimator(MLKR_NAME).with_min_samples(2);
        let (validated, labels) =
            check_input(x, Some(y), self.metric.preprocessor(), InputKind::Classic, None, &check)?;
        let ValidatedInput::Points(x) = validated else {
            return Err(MetricError::DimensionMismatch {
                expected: 2,
                found: 3,
                what: "input rank",
            });
        };
        let y = labels.unwrap_or_else(|| y.clone());
        let n_features = x.ncols();
        let n_components = check_n_components(n_features, self.opts.n_components)?;

        let mut rng = match self.opts.random_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let init = initialize_transformer(&self.opts.init, &x, None, n_components, &mut rng)?;
        let optim = self.opts.optim_options()?;

        let theta0: Theta = init.iter().copied().collect();
        let data = MlkrData { x, y, n_components };
        let outcome = minimize(&MlkrLoss, theta0, &data, &optim)?;
        if !outcome.converged {
            log::warn!("[{MLKR_NAME}] MLKR did not converge: {}", outcome.status);
        }

        let shape = (n_components, n_features);
        let transformer = Array2::from_shape_vec(shape, outcome.theta_hat.to_vec()).map_err(|_| {
            MetricError::DimensionMismatch {
                expected: n_components * n_features,
                found: outcome.theta_hat.len(),
                what: "optimized parameters",
            }
        })?;
        self.metric.set_transformer(transformer);
        self.n_iter = Some(outcome.iterations);
        log::debug!(
            "[{MLKR_NAME}] fit done: {} iterations, loss = {:.6e}",
            outcome.iterations,
            outcome.value
        );
        Ok(FitSummary {
            iterations: outcome.iterations,
            converged: outcome.converged,
            loss: outcome.value,
        })
    }
}

impl MetricScorer for MLKR {
    fn estimator(&self) -> &'static str {
        MLKR_NAME
    }

    fn preprocessor(&self) -> Option<&Preprocessor> {
        self.metric.preprocessor()
    }

    fn pair_distance(&self, pairs: &InputArray) -> MetricResult<Array1<f64>> {
        self.metric.pair_distance(pairs)
    }
}

// ---- Objective ----

/// Training data for [`MlkrLoss`].
#[derive(Debug, Clone)]
pub struct MlkrData {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub n_components: usize,
}

/// The MLKR leave-one-out loss as an [`Objective`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MlkrLoss;

impl Objective for MlkrLoss {
    type Data = MlkrData;

    fn value(&self, theta: &Theta, data: &MlkrData) -> OptResult<Cost> {
        Ok(mlkr_loss(theta, data)?.0)
    }

    fn check(&self, theta: &Theta, data: &MlkrData) -> OptResult<()> {
        if data.x.nrows() != data.y.len() {
            return Err(OptError::InvalidObjectiveData {
                reason: format!("{} samples but {} targets", data.x.nrows(), data.y.len()),
            });
        }
        if data.x.nrows() < 2 {
            return Err(OptError::InvalidObjectiveData {
                reason: "at least two samples are required".to_string(),
            });
        }
        validate_theta_input(theta, data.n_components * data.x.ncols())
    }

    fn grad(&self, theta: &Theta, data: &MlkrData) -> OptResult<Grad> {
        Ok(mlkr_loss(theta, data)?.1)
    }
}

/// Loss and flattened gradient at `theta` (row-major `L`).
pub fn mlkr_loss(theta: &Theta, data: &MlkrData) -> OptResult<(Cost, Grad)> {
    let (x, y) = (&data.x, &data.y);
    let n_features = x.ncols();
    let a = Array2::from_shape_vec((data.n_components, n_features), theta.to_vec()).map_err(
        |_| OptError::ThetaLengthMismatch {
            expected: data.n_components * n_features,
            actual: theta.len(),
        },
    )?;
    let x_emb = x.dot(&a.t());

    // Negative squared distances with self-affinity masked out.
    let n = x.nrows();
    let mut logits = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let diff = &x_emb.row(i) - &x_emb.row(j);
            let d = diff.dot(&diff);
            logits[[i, j]] = -d;
            logits[[j, i]] = -d;
        }
        logits[[i, i]] = f64::NEG_INFINITY;
    }
    let p = softmax_rows(logits.view(), SOFTMAX_FLOOR);
    let yhat = p.dot(y);
    let ydiff = &yhat - y;
    let cost = ydiff.dot(&ydiff);

    let w = Array2::from_shape_fn((n, n), |(i, j)| p[[i, j]] * ydiff[i] * (y[j] - yhat[i]));
    let mut w_sym = &w + &w.t();
    let col_sums = w.sum_axis(Axis(0));
    let row_sums = w.sum_axis(Axis(1));
    for i in 0..n {
        w_sym[[i, i]] = -(col_sums[i] + row_sums[i]);
    }
    let grad = x_emb.t().dot(&w_sym).dot(x) * 4.0;
    Ok((cost, grad.iter().copied().collect()))
}
