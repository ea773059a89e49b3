//! lbfgs — L-BFGS minimization of user objectives on top of `argmin`.
//!
//! Purpose
//! -------
//! Give learners a single call, [`minimize`], that runs L-BFGS on any type
//! implementing [`Objective`], with tolerances, line search, and memory
//! taken from [`OptimOptions`].
//!
//! Key behaviors
//! -------------
//! - Objectives are minimized directly; no sign flip.
//! - Missing analytic gradients fall back to finite differences (central,
//!   then forward).
//! - [`OptimOutcome::converged`] is `true` only for solver convergence or a
//!   reached target cost.
//!
//! Downstream usage
//! ----------------
//! - `learners::mlkr` implements [`Objective`] for the MLKR loss and calls
//!   [`minimize`].

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::api::minimize;
pub use self::traits::{LineSearcher, Objective, OptimOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::minimize;
    pub use super::traits::{LineSearcher, Objective, OptimOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
