//! Adapter that exposes a user [`Objective`] as an `argmin` problem.
//!
//! The objective is minimized as-is. Analytic gradients are validated and
//! passed through; objectives without one are differentiated numerically
//! via [`fd_gradient`].
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    lbfgs::{
        finite_diff::fd_gradient,
        traits::Objective,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// Bridges a user `Objective` to `argmin`'s `CostFunction` and `Gradient`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: Objective> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: Objective> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<F: Objective> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `f(θ)`, rejecting non-finite values with `NonFiniteCost`.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(output)
    }
}

impl<F: Objective> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Analytic gradient when available, otherwise finite differences of the
    /// cost (central, then forward).
    ///
    /// # Errors
    /// - User errors from `grad` other than `GradientNotImplemented`.
    /// - Errors raised by cost evaluations performed during differencing.
    /// - Dimension or finiteness failures of the resulting gradient.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                Ok(fd_gradient(theta, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use ndarray::array;

    struct Bowl;

    impl Objective for Bowl {
        type Data = f64;

        fn value(&self, theta: &Theta, shift: &f64) -> OptResult<Cost> {
            Ok(theta.iter().map(|t| (t - shift).powi(2)).sum())
        }

        fn check(&self, _theta: &Theta, _data: &f64) -> OptResult<()> {
            Ok(())
        }
    }

    struct BadGrad;

    impl Objective for BadGrad {
        type Data = ();

        fn value(&self, _theta: &Theta, _data: &()) -> OptResult<Cost> {
            Ok(0.0)
        }

        fn check(&self, _theta: &Theta, _data: &()) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, _theta: &Theta, _data: &()) -> OptResult<Grad> {
            Ok(array![1.0])
        }
    }

    #[test]
    // Purpose
    // -------
    // Cost is passed through without a sign change; missing gradients are
    // filled in numerically.
    //
    // Given
    // -----
    // - f(θ) = Σ (θᵢ − 1)² at θ = (3, 1).
    //
    // Expect
    // ------
    // - cost 4, gradient ≈ (4, 0).
    fn cost_passes_through_and_fd_gradient_is_used() {
        // Arrange
        let adapter = ArgMinAdapter::new(&Bowl, &1.0);
        let theta = array![3.0, 1.0];

        // Act
        let c = adapter.cost(&theta).unwrap();
        let g = adapter.gradient(&theta).unwrap();

        // Assert
        assert_eq!(c, 4.0);
        assert!((g[0] - 4.0).abs() < 1e-5 && g[1].abs() < 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // Analytic gradients of the wrong length are rejected.
    //
    // Given
    // -----
    // - A 1-element gradient for a 2-element θ.
    //
    // Expect
    // ------
    // - `GradientDimMismatch { expected: 2, found: 1 }`.
    fn analytic_gradient_dimension_is_checked() {
        // Arrange
        let adapter = ArgMinAdapter::new(&BadGrad, &());

        // Act
        let err = adapter.gradient(&array![0.0, 0.0]).unwrap_err();

        // Assert
        assert_eq!(OptError::from(err), OptError::GradientDimMismatch { expected: 2, found: 1 });
    }
}
