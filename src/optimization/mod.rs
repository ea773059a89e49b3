//! optimization — numerical optimization layer for the metric learners.
//!
//! - [`lbfgs`]: L-BFGS minimization of user objectives via `argmin`.
//! - [`numerical_stability`]: guarded softmax used inside losses.
//! - [`errors`]: the [`OptError`](errors::OptError) surface.

pub mod errors;
pub mod lbfgs;
pub mod numerical_stability;
