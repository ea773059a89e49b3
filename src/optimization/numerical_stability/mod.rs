//! numerical_stability — guarded numeric kernels shared by the learners.
//!
//! Purpose
//! -------
//! Keep overflow-prone transforms in one place so loss code can assume
//! finite weights. Currently this is the masked row softmax used by MLKR.
//!
//! Conventions
//! -----------
//! - Pure functions over `ndarray` views; no logging or global state.
//! - Floors and tolerances are passed in explicitly; [`SOFTMAX_FLOOR`] is
//!   the default.

pub mod softmax;

pub use self::softmax::{SOFTMAX_FLOOR, softmax_rows};
