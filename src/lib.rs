//! rust_metric_learn — Mahalanobis metric learning with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the metric learners to Python via the `_rust_metric_learn` extension
//! module. When the `python-bindings` feature is enabled, this module defines
//! the Python-facing classes and submodules used by the `rust_metric_learn`
//! package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: input validation (`input`), weak
//!   supervision (`constraints`), the learned metric and its classifiers
//!   (`mahalanobis`), the estimators (`learners`), and the L-BFGS layer
//!   (`optimization`).
//! - Define `#[pyclass]` wrappers and the `#[pymodule]` initializer for the
//!   `_rust_metric_learn` Python extension.
//! - Create and register Python submodules (`learners`, `constraints`) so that
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner Rust modules; this file
//!   performs only FFI glue and error mapping.
//! - A learner exposes a transform only after a fully successful fit; the
//!   Python wrappers never cache partial state.
//!
//! Conventions
//! -----------
//! - Python-exposed classes live under `_rust_metric_learn.<submodule>`.
//! - Errors from core Rust code are propagated as rich error types internally
//!   and converted to `ValueError` at the PyO3 boundary; malformed Python
//!   objects raise `TypeError`.
//! - Randomness is seeded through `random_state` arguments; `None` draws a
//!   seed from the operating system.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on the inner modules and can
//!   ignore the PyO3 items guarded by the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core numerical behavior is covered by unit tests in the inner modules and
//!   by the integration tests under `tests/`.

pub mod constraints;
pub mod input;
pub mod learners;
pub mod mahalanobis;
pub mod optimization;
pub mod utils;

pub use crate::constraints::{Constraints, PairConstraints, wrap_pairs};
pub use crate::input::{InputArray, Preprocessor};
pub use crate::learners::{Covariance, MLKR, MLKROptions};
pub use crate::mahalanobis::{MahalanobisMetric, MetricError, MetricResult, PairsClassifier};

#[cfg(feature = "python-bindings")]
use crate::{
    mahalanobis::MetricScorer,
    utils::{
        build_mlkr_options, extract_f64_matrix, extract_f64_vector, extract_i64_labels,
        extract_input_array,
    },
};
#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2};
#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};
#[cfg(feature = "python-bindings")]
use rand::SeedableRng;
#[cfg(feature = "python-bindings")]
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "python-bindings")]
fn seeded_rng(random_state: Option<u64>) -> ChaCha8Rng {
    match random_state {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[cfg(feature = "python-bindings")]
fn pairs_classifier<S: MetricScorer>(scorer: &S, threshold: Option<f64>) -> PairsClassifier<'_, S> {
    let mut clf = PairsClassifier::new(scorer);
    if let Some(t) = threshold {
        clf.set_threshold(t);
    }
    clf
}

/// Metric Learning for Kernel Regression.
///
/// Learns a linear transform `L` such that Gaussian-kernel regression in the
/// embedded space `x ↦ L x` has minimal leave-one-out squared error.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "MLKR", module = "rust_metric_learn.learners", unsendable)]
pub struct PyMLKR {
    inner: MLKR,
    threshold: Option<f64>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyMLKR {
    #[new]
    #[pyo3(
        signature = (
            n_components = None,
            init = None,
            tol = None,
            max_iter = None,
            random_state = None,
            line_searcher = None,
            verbose = None,
        ),
        text_signature = "(n_components=None, init='auto', tol=None, max_iter=1000, \
                          random_state=None, line_searcher='MoreThuente', verbose=False)"
    )]
    pub fn new<'py>(
        n_components: Option<usize>, init: Option<&Bound<'py, PyAny>>, tol: Option<f64>,
        max_iter: Option<usize>, random_state: Option<u64>, line_searcher: Option<&str>,
        verbose: Option<bool>,
    ) -> PyResult<Self> {
        let opts = build_mlkr_options(
            n_components,
            init,
            tol,
            max_iter,
            random_state,
            line_searcher,
            verbose,
        )?;
        Ok(PyMLKR { inner: MLKR::new(opts), threshold: None })
    }

    /// Fit the transform on points `x` with real-valued targets `y`.
    ///
    /// Returns `(iterations, converged, loss)`.
    #[pyo3(text_signature = "(self, x, y, /)")]
    pub fn fit<'py>(
        &mut self, x: &Bound<'py, PyAny>, y: &Bound<'py, PyAny>,
    ) -> PyResult<(usize, bool, f64)> {
        let x = extract_input_array(x)?;
        let y = extract_f64_vector(y)?;
        let summary = self.inner.fit(&x, &y)?;
        Ok((summary.iterations, summary.converged, summary.loss))
    }

    /// Embed points with the learned transform.
    #[pyo3(text_signature = "(self, x, /)")]
    pub fn transform<'py>(
        &self, py: Python<'py>, x: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let x = extract_input_array(x)?;
        Ok(self.inner.transform(&x)?.into_pyarray(py))
    }

    /// Learned Mahalanobis distance of each pair in `(n_pairs, 2, n_features)`.
    #[pyo3(text_signature = "(self, pairs, /)")]
    pub fn pair_distance<'py>(
        &self, py: Python<'py>, pairs: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let pairs = extract_input_array(pairs)?;
        Ok(self.inner.metric().pair_distance(&pairs)?.into_pyarray(py))
    }

    /// Negated pair distances (higher means more similar).
    #[pyo3(text_signature = "(self, pairs, /)")]
    pub fn pair_score<'py>(
        &self, py: Python<'py>, pairs: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let pairs = extract_input_array(pairs)?;
        Ok(self.inner.metric().pair_score(&pairs)?.into_pyarray(py))
    }

    /// `Lᵀ L`.
    pub fn get_mahalanobis_matrix<'py>(
        &self, py: Python<'py>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.metric().get_mahalanobis_matrix()?.into_pyarray(py))
    }

    /// Choose the accuracy-maximizing distance threshold on labelled pairs.
    #[pyo3(text_signature = "(self, pairs, y, /)")]
    pub fn calibrate_threshold<'py>(
        &mut self, pairs: &Bound<'py, PyAny>, y: &Bound<'py, PyAny>,
    ) -> PyResult<f64> {
        let pairs = extract_input_array(pairs)?;
        let y = extract_f64_vector(y)?;
        let mut clf = PairsClassifier::new(&self.inner);
        let t = clf.calibrate_threshold(&pairs, &y)?;
        self.threshold = Some(t);
        Ok(t)
    }

    /// `+1` for pairs closer than the threshold, `-1` otherwise.
    #[pyo3(text_signature = "(self, pairs, /)")]
    pub fn predict<'py>(
        &self, py: Python<'py>, pairs: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let pairs = extract_input_array(pairs)?;
        let clf = pairs_classifier(&self.inner, self.threshold);
        Ok(clf.predict(&pairs)?.into_pyarray(py))
    }

    #[setter]
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = Some(threshold);
    }

    #[getter]
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    #[getter]
    pub fn components_<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.components()?.clone().into_pyarray(py))
    }

    #[getter]
    pub fn n_iter_(&self) -> Option<usize> {
        self.inner.n_iter()
    }
}

/// Inverse-covariance baseline metric.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "Covariance", module = "rust_metric_learn.learners", unsendable)]
pub struct PyCovariance {
    inner: Covariance,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyCovariance {
    #[new]
    #[pyo3(text_signature = "()")]
    pub fn new() -> Self {
        PyCovariance { inner: Covariance::new(None) }
    }

    #[pyo3(text_signature = "(self, x, /)")]
    pub fn fit<'py>(&mut self, x: &Bound<'py, PyAny>) -> PyResult<()> {
        let x = extract_input_array(x)?;
        self.inner.fit(&x)?;
        Ok(())
    }

    #[pyo3(text_signature = "(self, x, /)")]
    pub fn transform<'py>(
        &self, py: Python<'py>, x: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let x = extract_input_array(x)?;
        Ok(self.inner.transform(&x)?.into_pyarray(py))
    }

    #[pyo3(text_signature = "(self, pairs, /)")]
    pub fn pair_distance<'py>(
        &self, py: Python<'py>, pairs: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let pairs = extract_input_array(pairs)?;
        Ok(self.inner.metric().pair_distance(&pairs)?.into_pyarray(py))
    }

    pub fn get_mahalanobis_matrix<'py>(
        &self, py: Python<'py>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.metric().get_mahalanobis_matrix()?.into_pyarray(py))
    }

    #[getter]
    pub fn components_<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(self.inner.components()?.clone().into_pyarray(py))
    }
}

/// Constraint generator over a partially labelled vector (`-1` = unknown).
#[cfg(feature = "python-bindings")]
#[pyclass(name = "Constraints", module = "rust_metric_learn.constraints")]
pub struct PyConstraints {
    inner: Constraints,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyConstraints {
    #[new]
    #[pyo3(text_signature = "(partial_labels, /)")]
    pub fn new<'py>(partial_labels: &Bound<'py, PyAny>) -> PyResult<Self> {
        Ok(PyConstraints { inner: Constraints::new(extract_i64_labels(partial_labels)?) })
    }

    /// Returns `(a, b, c, d)`: similar pairs `(a[i], b[i])` and dissimilar
    /// pairs `(c[i], d[i])`.
    #[pyo3(
        signature = (num_constraints, same_length = false, random_state = None),
        text_signature = "(self, num_constraints, /, same_length=False, random_state=None)"
    )]
    #[allow(clippy::type_complexity)]
    pub fn positive_negative_pairs<'py>(
        &self, py: Python<'py>, num_constraints: usize, same_length: bool,
        random_state: Option<u64>,
    ) -> PyResult<(
        Bound<'py, PyArray1<usize>>,
        Bound<'py, PyArray1<usize>>,
        Bound<'py, PyArray1<usize>>,
        Bound<'py, PyArray1<usize>>,
    )> {
        let mut rng = seeded_rng(random_state);
        let pairs = self.inner.positive_negative_pairs(num_constraints, same_length, &mut rng)?;
        Ok((
            pairs.a.into_pyarray(py),
            pairs.b.into_pyarray(py),
            pairs.c.into_pyarray(py),
            pairs.d.into_pyarray(py),
        ))
    }

    /// Chunk id per point, `-1` for points left out of every chunk.
    #[pyo3(
        signature = (num_chunks = 100, chunk_size = 2, random_state = None),
        text_signature = "(self, /, num_chunks=100, chunk_size=2, random_state=None)"
    )]
    pub fn chunks<'py>(
        &self, py: Python<'py>, num_chunks: usize, chunk_size: usize, random_state: Option<u64>,
    ) -> PyResult<Bound<'py, PyArray1<i64>>> {
        let mut rng = seeded_rng(random_state);
        Ok(self.inner.chunks(num_chunks, chunk_size, &mut rng)?.into_pyarray(py))
    }

    /// `(n_triplets, 3)` index triplets `(anchor, genuine, impostor)`.
    #[pyo3(text_signature = "(self, x, k_genuine, k_impostor, /)")]
    pub fn generate_knntriplets<'py>(
        &self, py: Python<'py>, x: &Bound<'py, PyAny>, k_genuine: usize, k_impostor: usize,
    ) -> PyResult<Bound<'py, PyArray2<usize>>> {
        let x = extract_f64_matrix(x)?;
        Ok(self.inner.generate_knntriplets(&x, k_genuine, k_impostor)?.into_pyarray(py))
    }
}

/// _rust_metric_learn — PyO3 module initializer for the Python extension.
///
/// Creates the `learners` and `constraints` submodules, attaches them to the
/// parent module, and registers them in `sys.modules` so they are importable
/// via dotted paths from Python.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_metric_learn<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let learners_mod = PyModule::new(_py, "learners")?;
    let constraints_mod = PyModule::new(_py, "constraints")?;
    learners(_py, m, &learners_mod)?;
    constraints(_py, m, &constraints_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_metric_learn.learners", learners_mod)?;

    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_metric_learn.constraints", constraints_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn learners<'py>(
    _py: Python, rust_metric_learn: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<PyMLKR>()?;
    m.add_class::<PyCovariance>()?;
    rust_metric_learn.add_submodule(m)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn constraints<'py>(
    _py: Python, rust_metric_learn: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<PyConstraints>()?;
    rust_metric_learn.add_submodule(m)?;
    Ok(())
}
