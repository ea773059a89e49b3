//! mahalanobis::errors — aggregate error surface of the metric layer.
//!
//! `MetricError` is what learners and scorers return. It owns the
//! linear-algebra failures of this module and wraps the input, optimizer,
//! and constraint errors of the lower layers via `From`, so `?` works
//! across module boundaries.

use crate::{constraints::ConstraintError, input::InputError, optimization::errors::OptError};

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for metric-layer operations.
pub type MetricResult<T> = Result<T, MetricError>;

#[derive(Debug, Clone)]
pub enum MetricError {
    // ---- Linear algebra ----
    /// An eigenvalue is more negative than the tolerance allows.
    NonPsd { min_eigenvalue: f64, tol: f64 },

    /// PSD tolerance must be non-negative.
    NegativeTolerance { tol: f64 },

    /// A metric matrix must equal its transpose.
    NotSymmetric,

    /// A matrix that must be inverted is singular.
    SingularMatrix { reason: &'static str },

    // ---- State ----
    /// No transform has been learned or installed.
    NotFitted { estimator: &'static str },

    /// Decision threshold missing for pair prediction.
    NotCalibrated,

    /// Array dimensions disagree with the learned transform.
    DimensionMismatch { expected: usize, found: usize, what: &'static str },

    /// User-provided initial transform is unusable.
    InvalidInit { message: String },

    /// A score is not defined for the given labels.
    UndefinedScore { reason: &'static str },

    // ---- Wrapped ----
    Input(InputError),
    Opt(OptError),
    Constraint(ConstraintError),
}

impl std::error::Error for MetricError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MetricError::Input(e) => Some(e),
            MetricError::Opt(e) => Some(e),
            MetricError::Constraint(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Linear algebra ----
            MetricError::NonPsd { .. } => {
                write!(f, "Matrix is not positive semidefinite (PSD).")
            }
            MetricError::NegativeTolerance { .. } => write!(f, "tol should be positive."),
            MetricError::NotSymmetric => write!(f, "The input metric should be symmetric."),
            MetricError::SingularMatrix { reason } => write!(f, "Singular matrix: {reason}"),

            // ---- State ----
            MetricError::NotFitted { estimator } => write!(
                f,
                "This {estimator} instance is not fitted yet. Call 'fit' with appropriate \
                 arguments before using this estimator."
            ),
            MetricError::NotCalibrated => write!(
                f,
                "No decision threshold is set. Call 'calibrate_threshold' or 'set_threshold' \
                 before predicting."
            ),
            MetricError::DimensionMismatch { expected, found, what } => {
                write!(f, "Dimension mismatch for {what}: expected {expected}, found {found}")
            }
            MetricError::InvalidInit { message } => write!(f, "{message}"),
            MetricError::UndefinedScore { reason } => write!(f, "Score is undefined: {reason}"),

            // ---- Wrapped ----
            MetricError::Input(e) => write!(f, "{e}"),
            MetricError::Opt(e) => write!(f, "Optimization failed: {e}"),
            MetricError::Constraint(e) => write!(f, "{e}"),
        }
    }
}

impl From<InputError> for MetricError {
    fn from(err: InputError) -> Self {
        MetricError::Input(err)
    }
}

impl From<OptError> for MetricError {
    fn from(err: OptError) -> Self {
        MetricError::Opt(err)
    }
}

impl From<ConstraintError> for MetricError {
    fn from(err: ConstraintError) -> Self {
        MetricError::Constraint(err)
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<MetricError> for PyErr {
    fn from(err: MetricError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    // Purpose
    // -------
    // Lower-layer errors convert with `?` and stay reachable via `source`.
    //
    // Given
    // -----
    // - `InputError::InvalidPairLabels` and `OptError::NoTolerancesProvided`.
    //
    // Expect
    // ------
    // - Matching wrapper variants with a `source`.
    fn wrapped_errors_convert_and_expose_source() {
        // Arrange
        let input: MetricError = InputError::InvalidPairLabels.into();
        let opt: MetricError = OptError::NoTolerancesProvided.into();

        // Act / Assert
        assert!(matches!(input, MetricError::Input(InputError::InvalidPairLabels)));
        assert!(matches!(opt, MetricError::Opt(OptError::NoTolerancesProvided)));
        assert!(input.source().is_some());
        assert!(MetricError::NotSymmetric.source().is_none());
    }

    #[test]
    // Purpose
    // -------
    // User-facing texts of the linear-algebra errors.
    //
    // Given
    // -----
    // - `NonPsd` and `NegativeTolerance`.
    //
    // Expect
    // ------
    // - The exact fixed messages.
    fn linear_algebra_messages() {
        // Act / Assert
        assert_eq!(
            MetricError::NonPsd { min_eigenvalue: -1.0, tol: 0.0 }.to_string(),
            "Matrix is not positive semidefinite (PSD)."
        );
        assert_eq!(
            MetricError::NegativeTolerance { tol: -1.0 }.to_string(),
            "tol should be positive."
        );
    }
}
