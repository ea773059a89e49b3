//! mahalanobis::psd — PSD checks and factorization of metric matrices.
//!
//! Purpose
//! -------
//! Turn a learned or user-supplied Mahalanobis matrix `M` into a transform
//! `L` with `LᵀL = M`, and decide from eigenvalues whether `M` is positive
//! semidefinite and whether it is strictly definite.
//!
//! Key behaviors
//! -------------
//! - [`check_sdp_from_eigen`] rejects eigenvalues below `-tol` and reports
//!   whether any eigenvalue is numerically zero.
//! - [`default_psd_tolerance`] scales with the spectrum:
//!   `max|w| · len(w) · f64::EPSILON`.
//! - [`transformer_from_metric`] picks the cheapest exact factorization:
//!   elementwise square root for diagonal `M`, transposed Cholesky factor
//!   for nonsingular `M`, and an eigen-decomposition otherwise.
//!
//! Conventions
//! -----------
//! - Linear algebra runs in `nalgebra` (`DMatrix`, `symmetric_eigen`,
//!   `cholesky`); inputs and outputs stay `ndarray` types.
//! - Symmetry is judged like `allclose`: `|a − b| ≤ 1e-8 + 1e-5·|b|`.

use crate::mahalanobis::errors::{MetricError, MetricResult};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Absolute tolerance used by the symmetry and determinant checks.
pub const SYMMETRY_ATOL: f64 = 1e-8;
/// Relative tolerance used by the symmetry check.
pub const SYMMETRY_RTOL: f64 = 1e-5;

/// `max|w| · len(w) · f64::EPSILON`; zero for an empty spectrum.
pub fn default_psd_tolerance(w: &Array1<f64>) -> f64 {
    let max_abs = w.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    max_abs * w.len() as f64 * f64::EPSILON
}

/// Check eigenvalues of a symmetric matrix for positive semidefiniteness.
///
/// Returns `Ok(true)` when every eigenvalue is at least `tol` in magnitude
/// (strictly definite) and `Ok(false)` when some eigenvalue is numerically
/// zero.
///
/// # Errors
/// - [`MetricError::NegativeTolerance`] if `tol < 0`.
/// - [`MetricError::NonPsd`] if any eigenvalue is below `-tol`.
pub fn check_sdp_from_eigen(w: &Array1<f64>, tol: Option<f64>) -> MetricResult<bool> {
    let tol = tol.unwrap_or_else(|| default_psd_tolerance(w));
    if tol < 0.0 {
        return Err(MetricError::NegativeTolerance { tol });
    }
    let min_eigenvalue = w.iter().copied().fold(f64::INFINITY, f64::min);
    if min_eigenvalue < -tol {
        return Err(MetricError::NonPsd { min_eigenvalue, tol });
    }
    Ok(!w.iter().any(|v| v.abs() < tol))
}

/// Factor a Mahalanobis matrix as `M = LᵀL` and return `L`.
///
/// # Errors
/// - [`MetricError::DimensionMismatch`] for a non-square matrix.
/// - [`MetricError::NotSymmetric`] when `M` is not (numerically) symmetric.
/// - [`MetricError::NonPsd`] / [`MetricError::NegativeTolerance`] from the
///   eigenvalue check on the diagonal and eigen paths.
pub fn transformer_from_metric(metric: &Array2<f64>, tol: Option<f64>) -> MetricResult<Array2<f64>> {
    let (n, n_cols) = metric.dim();
    if n != n_cols {
        return Err(MetricError::DimensionMismatch {
            expected: n,
            found: n_cols,
            what: "metric columns",
        });
    }
    if !is_symmetric(metric) {
        return Err(MetricError::NotSymmetric);
    }

    if is_diagonal(metric) {
        let diag = metric.diag().to_owned();
        check_sdp_from_eigen(&diag, tol)?;
        return Ok(Array2::from_diag(&diag.mapv(|v| v.max(0.0).sqrt())));
    }

    let m = to_dmatrix(metric);
    if m.determinant().abs() > SYMMETRY_ATOL {
        // Indefinite but nonsingular matrices fail here and fall through.
        if let Some(chol) = m.clone().cholesky() {
            return Ok(from_dmatrix(&chol.l().transpose()));
        }
    }

    let (w, v) = eigen_decomposition(&m);
    check_sdp_from_eigen(&w, tol)?;
    let mut transformer = v.reversed_axes();
    for (mut row, &lambda) in transformer.outer_iter_mut().zip(w.iter()) {
        let scale = lambda.max(0.0).sqrt();
        row.mapv_inplace(|x| x * scale);
    }
    Ok(transformer)
}

/// Moore–Penrose pseudo-inverse `Σ v_k v_kᵀ / w_k` over eigenpairs with
/// `|w_k| > tol` (default [`default_psd_tolerance`]).
///
/// `v` holds eigenvectors in its columns, aligned with `w`.
pub fn pseudo_inverse_from_eig(w: &Array1<f64>, v: &Array2<f64>, tol: Option<f64>) -> Array2<f64> {
    let tol = tol.unwrap_or_else(|| default_psd_tolerance(w));
    let n = v.nrows();
    let mut pinv = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in w.iter().enumerate() {
        if lambda.abs() <= tol {
            continue;
        }
        let col = v.column(k);
        for i in 0..n {
            for j in 0..n {
                pinv[[i, j]] += col[i] * col[j] / lambda;
            }
        }
    }
    pinv
}

/// Eigen-decomposition of a symmetric matrix, eigenvalues in descending
/// order and eigenvectors in the matching columns.
pub fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let (w, v) = eigen_decomposition(&to_dmatrix(a));
    let mut order: Vec<usize> = (0..w.len()).collect();
    order.sort_by(|&i, &j| w[j].total_cmp(&w[i]));
    let w_sorted = Array1::from_iter(order.iter().map(|&k| w[k]));
    let v_sorted = Array2::from_shape_fn(v.dim(), |(i, j)| v[[i, order[j]]]);
    (w_sorted, v_sorted)
}

// ---- Helper methods ----

fn eigen_decomposition(m: &DMatrix<f64>) -> (Array1<f64>, Array2<f64>) {
    let eig = m.clone().symmetric_eigen();
    let w = Array1::from_iter(eig.eigenvalues.iter().copied());
    (w, from_dmatrix(&eig.eigenvectors))
}

pub(crate) fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

fn is_symmetric(a: &Array2<f64>) -> bool {
    let n = a.nrows();
    (0..n).all(|i| {
        (0..i).all(|j| {
            let (x, y) = (a[[i, j]], a[[j, i]]);
            (x - y).abs() <= SYMMETRY_ATOL + SYMMETRY_RTOL * y.abs()
        })
    })
}

fn is_diagonal(a: &Array2<f64>) -> bool {
    a.indexed_iter().all(|((i, j), &v)| i == j || v == 0.0)
}
