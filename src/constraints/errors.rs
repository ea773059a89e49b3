//! constraints::errors — failures and non-fatal warnings of tuple generation.
//!
//! Errors abort generation (impossible chunk requests, mismatched inputs).
//! Warnings report that fewer constraints or neighbours than requested were
//! produced; they are logged through `log::warn!` and never fail a call.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

pub type ConstraintResult<T> = Result<T, ConstraintError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// The label distribution cannot supply the requested number of chunks.
    NotEnoughChunks { chunk_size: usize, num_chunks: usize, max_chunks: usize },

    /// Chunks must contain at least one element.
    InvalidChunkSize,

    /// The point array and the label vector disagree in length.
    LabelLengthMismatch { n_labels: usize, n_samples: usize },

    /// Pair sampling needs at least one labelled point.
    NoKnownLabels,

    /// A constraint index does not address a row of the point array.
    IndexOutOfBounds { index: usize, n_samples: usize },
}

impl std::error::Error for ConstraintError {}

impl std::fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintError::NotEnoughChunks { chunk_size, num_chunks, max_chunks } => write!(
                f,
                "Not enough possible chunks of {chunk_size} elements in each class to form \
                 expected {num_chunks} chunks - maximum number of chunks is {max_chunks}"
            ),
            ConstraintError::InvalidChunkSize => {
                write!(f, "chunk_size must be at least 1")
            }
            ConstraintError::LabelLengthMismatch { n_labels, n_samples } => write!(
                f,
                "Label vector has {n_labels} entries but the point array has {n_samples} rows"
            ),
            ConstraintError::NoKnownLabels => {
                write!(f, "Cannot sample pairs: no point has a known (non-negative) label")
            }
            ConstraintError::IndexOutOfBounds { index, n_samples } => {
                write!(f, "Constraint index {index} is out of bounds for {n_samples} points")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<ConstraintError> for PyErr {
    fn from(err: ConstraintError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Non-fatal shortfalls, always carrying the concrete counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintWarning {
    /// The retry budget ran out before the pair quota was met.
    PairShortfall { generated: usize, requested: usize, positive: bool },

    /// A class is too small for `k_genuine` neighbours.
    GenuineReduced { label: i64, count: usize, requested: usize, reduced: usize },

    /// Too few points of other classes for `k_impostor` neighbours.
    ImpostorReduced { label: i64, others: usize, requested: usize, reduced: usize },
}

impl std::fmt::Display for ConstraintWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintWarning::PairShortfall { generated, requested, positive } => write!(
                f,
                "Only generated {generated} {} constraints (requested {requested})",
                if *positive { "positive" } else { "negative" }
            ),
            ConstraintWarning::GenuineReduced { label, count, requested, reduced } => write!(
                f,
                "The class {label} has {count} elements, which is not sufficient to generate \
                 {requested} genuine neighbors as specified by k_genuine. Will generate \
                 {reduced} genuine neighbors instead.\n"
            ),
            ConstraintWarning::ImpostorReduced { label, others, requested, reduced } => write!(
                f,
                "The class {label} has {others} elements of other classes, which is not \
                 sufficient to generate {requested} impostor neighbors as specified by \
                 k_impostor. Will generate {reduced} impostor neighbors instead.\n"
            ),
        }
    }
}

impl ConstraintWarning {
    pub(crate) fn emit(&self) {
        log::warn!("{self}");
    }
}
