//! Finite-difference gradients with error capture.
//!
//! `finitediff` evaluates plain `Fn(&Theta) -> f64` closures, so a failing
//! cost evaluation cannot use `?`. Callers wrap their cost in a closure that
//! stores the first error in a `RefCell` slot and returns `NaN`; the helpers
//! here turn that slot back into a real error.
use crate::optimization::{
    errors::OptResult,
    lbfgs::{
        types::{Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Central differences first, forward differences as the fallback.
///
/// Forward differences are used when a cost evaluation failed during the
/// central pass or when the central gradient has non-finite entries.
///
/// # Errors
/// Any error captured during the forward pass, or a gradient validation
/// error if the forward gradient is unusable too.
pub fn fd_gradient<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    let dim = theta.len();
    let central = theta.central_diff(func);
    if closure_err.borrow().is_none() && validate_grad(&central, dim).is_ok() {
        return Ok(central);
    }
    run_fd_diff(theta, func, closure_err)
}

/// Forward-difference gradient of `func` at `theta`.
///
/// Clears `closure_err`, differentiates, then returns the captured error if
/// any evaluation failed.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}
