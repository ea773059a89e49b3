//! constraints — weak supervision generated from partially labelled data.
//!
//! Purpose
//! -------
//! Turn a label vector (with `-1` for unknown labels) into the pairs,
//! chunks, and ranking triplets that weakly-supervised learners consume.
//!
//! Key behaviors
//! -------------
//! - [`Constraints`] stores the labels and exposes the generators as pure
//!   functions of the labels plus an injected random source.
//! - [`wrap_pairs`] and [`PairConstraints::wrap_indices`] turn index pairs
//!   into training pairs with `{+1, -1}` labels.
//! - [`neighbors`] holds the deterministic brute-force kNN search used for
//!   triplets.
//!
//! Conventions
//! -----------
//! - Randomness is passed as `&mut R where R: rand::Rng`; callers needing
//!   reproducibility use a seeded `rand_chacha::ChaCha8Rng`.
//! - Shortfalls are logged through `log::warn!` as [`ConstraintWarning`]s.

pub mod errors;
pub mod generator;
pub mod neighbors;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{ConstraintError, ConstraintResult, ConstraintWarning};
pub use self::generator::{Constraints, MAX_PAIR_ROUNDS, PairConstraints, wrap_pairs};
