//! utils — PyO3 conversion helpers shared by the Python bindings.
//!
//! Purpose
//! -------
//! Convert loosely-typed Python inputs (numpy arrays, pandas objects, nested
//! sequences) into the owned `ndarray` / [`InputArray`] values consumed by
//! the core modules, and assemble learner options from keyword arguments.
//!
//! Conventions
//! -----------
//! - Every helper is gated behind the `python-bindings` feature.
//! - Type mismatches surface as `TypeError`; invalid option values surface as
//!   `ValueError` through the crate error conversions.
//! - Data is copied into owned arrays; the Python buffers are never retained.

#[cfg(feature = "python-bindings")]
use std::str::FromStr;

#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
    PyReadonlyArrayDyn,
};

#[cfg(feature = "python-bindings")]
use crate::{
    input::InputArray,
    learners::{InitStrategy, MLKROptions},
    optimization::lbfgs::LineSearcher,
};

/// extract_input_array — copy a numeric array-like into an [`InputArray`].
///
/// Accepts float64 or int64 numpy arrays of any rank, objects exposing
/// `to_numpy()`, and nested sequences of floats (up to rank 3).
///
/// Errors
/// ------
/// - `TypeError` when none of the accepted forms match.
#[cfg(feature = "python-bindings")]
pub fn extract_input_array<'py>(raw: &Bound<'py, PyAny>) -> PyResult<InputArray> {
    if let Some(arr) = extract_numpy_dyn(raw) {
        return Ok(arr);
    }

    if let Ok(obj) = raw.call_method("to_numpy", (false,), None) {
        if let Some(arr) = extract_numpy_dyn(&obj) {
            return Ok(arr);
        }
    }

    if let Ok(v) = raw.extract::<Vec<f64>>() {
        return Ok(InputArray::from(Array1::from(v)));
    }
    if let Ok(rows) = raw.extract::<Vec<Vec<f64>>>() {
        return rows_to_array(rows).map(InputArray::from);
    }
    if let Ok(tuples) = raw.extract::<Vec<Vec<Vec<f64>>>>() {
        let n = tuples.len();
        let rows: Vec<Vec<f64>> = tuples.into_iter().flatten().collect();
        let flat = rows_to_array(rows)?;
        let (m, d) = flat.dim();
        let k = if n == 0 { 0 } else { m / n };
        let arr = flat
            .into_shape((n, k, d))
            .map_err(|_| PyTypeError::new_err("tuples must all contain the same number of rows"))?;
        return Ok(InputArray::from(arr));
    }

    Err(PyTypeError::new_err(
        "expected a numpy.ndarray, pandas object, or nested sequence of float64",
    ))
}

#[cfg(feature = "python-bindings")]
fn extract_numpy_dyn<'py>(raw: &Bound<'py, PyAny>) -> Option<InputArray> {
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArrayDyn<f64>>() {
        return Some(InputArray::Float(arr_ro.as_array().to_owned()));
    }
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArrayDyn<i64>>() {
        return Some(InputArray::Int(arr_ro.as_array().to_owned()));
    }
    None
}

#[cfg(feature = "python-bindings")]
fn rows_to_array(rows: Vec<Vec<f64>>) -> PyResult<Array2<f64>> {
    let n = rows.len();
    let d = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != d) {
        return Err(PyTypeError::new_err("all rows must have the same length"));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, d), flat)
        .map_err(|_| PyTypeError::new_err("could not build a 2-D array from the given rows"))
}

/// Copy a 1-D float64 array-like (numpy, pandas, sequence) into an `Array1`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vector<'py>(raw: &Bound<'py, PyAny>) -> PyResult<Array1<f64>> {
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArray1<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }
    if let Ok(obj) = raw.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            return Ok(series_ro.as_array().to_owned());
        }
    }
    let vec: Vec<f64> = raw.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(Array1::from(vec))
}

/// Copy a 1-D integer label array-like into an `Array1<i64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_i64_labels<'py>(raw: &Bound<'py, PyAny>) -> PyResult<Array1<i64>> {
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArray1<i64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }
    let vec: Vec<i64> = raw.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray or sequence of int64 labels")
    })?;
    Ok(Array1::from(vec))
}

/// Copy a 2-D float64 numpy array (or nested sequence) into an `Array2`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }
    let rows: Vec<Vec<f64>> = raw.extract().map_err(|_| {
        PyTypeError::new_err("expected a 2-D numpy.ndarray or nested sequence of float64")
    })?;
    rows_to_array(rows)
}

/// build_mlkr_options — assemble [`MLKROptions`] from Python keyword arguments.
///
/// `init` may be one of the strategy names or a 2-D array used as the
/// starting transform. Omitted arguments keep [`MLKROptions::default`].
#[cfg(feature = "python-bindings")]
pub fn build_mlkr_options<'py>(
    n_components: Option<usize>, init: Option<&Bound<'py, PyAny>>, tol: Option<f64>,
    max_iter: Option<usize>, random_state: Option<u64>, line_searcher: Option<&str>,
    verbose: Option<bool>,
) -> PyResult<MLKROptions> {
    let defaults = MLKROptions::default();

    let init = match init {
        None => defaults.init.clone(),
        Some(obj) => match obj.extract::<String>() {
            Ok(name) => InitStrategy::from_str(&name)?,
            Err(_) => InitStrategy::Matrix(extract_f64_matrix(obj)?),
        },
    };

    let line_searcher = match line_searcher {
        Some(name) => LineSearcher::from_str(name)?,
        None => defaults.line_searcher,
    };

    Ok(MLKROptions {
        n_components,
        init,
        tol,
        max_iter: max_iter.unwrap_or(defaults.max_iter),
        random_seed: random_state,
        line_searcher,
        verbose: verbose.unwrap_or(defaults.verbose),
        preprocessor: None,
    })
}
