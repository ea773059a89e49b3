//! input::errors — validation failures for points, tuples, and labels.
//!
//! Purpose
//! -------
//! Collect every way raw user input can be rejected before it reaches a
//! learner: wrong rank, wrong tuple width, too few samples or features,
//! non-numeric or complex values, non-finite entries, degenerate pairs,
//! malformed pair labels, and preprocessor failures.
//!
//! Key behaviors
//! -------------
//! - Rank errors carry a fully rendered message (see
//!   [`crate::input::validation::make_error_input`]) because its wording
//!   depends on the estimator context and on whether a preprocessor was
//!   involved.
//! - Preprocessor failures keep the original cause behind an `Arc` so the
//!   error stays `Clone` while `Error::source` still exposes the cause.
//!
//! Conventions
//! -----------
//! - Messages mirror the wording users already know from the reference
//!   metric-learning toolkit, so assertions on message fragments stay
//!   portable.
//! - Shapes are rendered in tuple notation (`(3, 2)`, `(4,)`).

use std::sync::Arc;

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for input validation.
pub type InputResult<T> = Result<T, InputError>;

#[derive(Debug, Clone)]
pub enum InputError {
    // ---- Shape ----
    /// Wrong rank for the requested input kind; message is pre-rendered.
    InvalidShape { message: String },

    /// Tuples have the wrong number of elements.
    TupleSize { expected: usize, found: usize, context: String, shape: Vec<usize>, data: String },

    /// Fewer features than required.
    TooFewFeatures { found: usize, required: usize, shape: Vec<usize>, context: String },

    /// Fewer samples than required.
    TooFewSamples { found: usize, required: usize, shape: Vec<usize>, context: String },

    /// Data and labels disagree on the number of samples.
    InconsistentLength { n_samples: usize, n_labels: usize },

    // ---- Values ----
    /// Values cannot be interpreted as numbers.
    InvalidDtype { dtype: &'static str },

    /// Complex values are never accepted.
    ComplexData { data: String },

    /// NaN or infinite values where the finiteness policy forbids them.
    NonFinite { allow_nan: bool },

    /// Pairs whose two members coincide.
    CollapsedPairs { collapsed: usize, total: usize },

    /// Pair labels outside `{-1, +1}`.
    InvalidPairLabels,

    /// Requested output dimensionality outside `[1, n_features]`.
    InvalidNComponents { n_features: usize },

    // ---- Preprocessor ----
    /// The preprocessor failed; the original cause is preserved.
    Preprocessor { cause: Arc<anyhow::Error> },
}

impl InputError {
    /// Wrap an arbitrary preprocessor failure.
    pub fn preprocessor(cause: anyhow::Error) -> Self {
        InputError::Preprocessor { cause: Arc::new(cause) }
    }
}

/// Render a shape the way array libraries print it: `(3, 2)` or `(4,)`.
pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({single},)"),
        _ => {
            let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InputError::Preprocessor { cause } => Some(&***cause),
            _ => None,
        }
    }
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shape ----
            InputError::InvalidShape { message } => write!(f, "{message}"),
            InputError::TupleSize { expected, found, context, shape, data } => write!(
                f,
                "Tuples of {expected} element(s) expected{context}. Got tuples of {found} \
                 element(s) instead (shape={}):\ninput={data}.\n",
                format_shape(shape)
            ),
            InputError::TooFewFeatures { found, required, shape, context } => write!(
                f,
                "Found array with {found} feature(s) (shape={}) while a minimum of {required} \
                 is required{context}.",
                format_shape(shape)
            ),
            InputError::TooFewSamples { found, required, shape, context } => write!(
                f,
                "Found array with {found} sample(s) (shape={}) while a minimum of {required} \
                 is required{context}.",
                format_shape(shape)
            ),
            InputError::InconsistentLength { n_samples, n_labels } => write!(
                f,
                "Found input variables with inconsistent numbers of samples: \
                 [{n_samples}, {n_labels}]"
            ),

            // ---- Values ----
            InputError::InvalidDtype { dtype } => write!(
                f,
                "Arrays of dtype '{dtype}' cannot be used as numeric input. Convert your data \
                 to numeric values explicitly or use a preprocessor."
            ),
            InputError::ComplexData { data } => {
                write!(f, "Complex data not supported\n{data}\n")
            }
            InputError::NonFinite { allow_nan: true } => {
                write!(f, "Input contains infinity or a value too large for dtype('float64').")
            }
            InputError::NonFinite { allow_nan: false } => write!(
                f,
                "Input contains NaN, infinity or a value too large for dtype('float64')."
            ),
            InputError::CollapsedPairs { collapsed, total } => write!(
                f,
                "{collapsed} collapsed pairs found (where the left element is the same as the \
                 right element), out of {total} pairs in total."
            ),
            InputError::InvalidPairLabels => write!(
                f,
                "When training on pairs, the labels (y) should contain only values in [-1, 1]. \
                 Found an incorrect value."
            ),
            InputError::InvalidNComponents { n_features } => {
                write!(f, "Invalid n_components, must be in [1, {n_features}]")
            }

            // ---- Preprocessor ----
            InputError::Preprocessor { cause } => {
                write!(f, "An error occurred when trying to use the preprocessor: {cause}")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<InputError> for PyErr {
    fn from(err: InputError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Shape rendering used inside messages.
    // - Message wording for the size, collapsed-pair, and label errors.
    // - Cause preservation for preprocessor failures.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Shapes print in tuple notation, with a trailing comma for rank 1.
    //
    // Given
    // -----
    // - Shapes `[4]` and `[3, 2, 5]`.
    //
    // Expect
    // ------
    // - `"(4,)"` and `"(3, 2, 5)"`.
    fn format_shape_uses_tuple_notation() {
        // Arrange / Act
        let one = format_shape(&[4]);
        let three = format_shape(&[3, 2, 5]);

        // Assert
        assert_eq!(one, "(4,)");
        assert_eq!(three, "(3, 2, 5)");
    }

    #[test]
    // Purpose
    // -------
    // The feature-count error embeds the count, shape, minimum and context.
    //
    // Given
    // -----
    // - 0 features found, 1 required, shape (3, 2, 0), context " by MLKR".
    //
    // Expect
    // ------
    // - The exact rendered sentence.
    fn too_few_features_message_is_exact() {
        // Arrange
        let err = InputError::TooFewFeatures {
            found: 0,
            required: 1,
            shape: vec![3, 2, 0],
            context: " by MLKR".to_string(),
        };

        // Act
        let msg = err.to_string();

        // Assert
        assert_eq!(
            msg,
            "Found array with 0 feature(s) (shape=(3, 2, 0)) while a minimum of 1 is \
             required by MLKR."
        );
    }

    #[test]
    // Purpose
    // -------
    // Collapsed-pair messages report both the offending and total counts.
    //
    // Given
    // -----
    // - 2 collapsed pairs out of 3.
    //
    // Expect
    // ------
    // - Message starts with "2 collapsed pairs found" and ends with
    //   "out of 3 pairs in total."
    fn collapsed_pairs_message_reports_counts() {
        // Arrange
        let err = InputError::CollapsedPairs { collapsed: 2, total: 3 };

        // Act
        let msg = err.to_string();

        // Assert
        assert!(msg.starts_with("2 collapsed pairs found"));
        assert!(msg.ends_with("out of 3 pairs in total."));
    }

    #[test]
    // Purpose
    // -------
    // A preprocessor failure keeps its cause reachable through `source`.
    //
    // Given
    // -----
    // - An `anyhow` error "index 7 is out of bounds".
    //
    // Expect
    // ------
    // - Display contains the cause text and `source()` is `Some`.
    fn preprocessor_error_preserves_cause() {
        // Arrange
        let err = InputError::preprocessor(anyhow::anyhow!("index 7 is out of bounds"));

        // Act
        let msg = err.to_string();
        let source = err.source();

        // Assert
        assert!(msg.contains("An error occurred when trying to use the preprocessor"));
        assert!(msg.contains("index 7 is out of bounds"));
        assert!(source.is_some());
        assert_eq!(source.map(|s| s.to_string()).unwrap_or_default(), "index 7 is out of bounds");
    }
}
