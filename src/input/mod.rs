//! input — validation and preprocessing of points, tuples, and labels.
//!
//! Purpose
//! -------
//! Give every learner and scorer a single entry point, [`check_input`],
//! that accepts raw arrays (formed points, formed tuples, or indicators)
//! and returns canonical `f64` arrays or a precise, user-facing error.
//!
//! Key behaviors
//! -------------
//! - [`array::InputArray`] carries raw data of any rank and dtype.
//! - [`preprocessor::Preprocessor`] resolves indicators into points,
//!   either through a lookup table or an arbitrary resolver.
//! - [`validation`] routes on rank, applies the preprocessor, then runs
//!   the strict numeric checks; helper checks cover tuple width,
//!   collapsed pairs, pair labels, and `n_components`.
//!
//! Downstream usage
//! ----------------
//! - `mahalanobis` validates scoring input with [`check_tuples`] /
//!   [`check_points`] using the metric's own preprocessor.
//! - `learners` validate training data with [`check_input`] and an
//!   estimator-tagged [`CheckOptions`].

pub mod array;
pub mod errors;
pub mod preprocessor;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::array::InputArray;
pub use self::errors::{InputError, InputResult};
pub use self::preprocessor::Preprocessor;
pub use self::validation::{
    CheckOptions, FiniteCheck, InputKind, ValidatedInput, check_collapsed_pairs, check_input,
    check_n_components, check_points, check_tuples, check_y_valid_values_for_pairs,
};

pub mod prelude {
    pub use super::array::InputArray;
    pub use super::errors::{InputError, InputResult};
    pub use super::preprocessor::Preprocessor;
    pub use super::validation::{CheckOptions, FiniteCheck, InputKind, check_input};
}
