//! Execution helper that runs an `argmin` solver on an [`Objective`] and
//! returns a crate-friendly [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    lbfgs::{
        adapter::ArgMinAdapter,
        traits::{Objective, OptimOptions, OptimOutcome},
        types::{Grad, Theta},
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run `solver` on `problem` starting from `theta0`.
///
/// Wires the initial parameter, the optional `max_iters`, and (behind the
/// `obs_slog` feature, when `opts.verbose`) a terminal observer, then turns
/// the final state into an [`OptimOutcome`] whose `value` is the best cost.
///
/// # Errors
/// - Backend and objective errors mapped into `OptError`.
/// - Outcome validation errors (missing or non-finite best parameters).
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &OptimOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: Objective,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let outcome = OptimOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )?;
    log::debug!(
        "L-BFGS finished after {} iterations: cost = {:.6e}, status = {}",
        outcome.iterations,
        outcome.value,
        outcome.status
    );
    Ok(outcome)
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: Objective,
{
    let cost = problem.cost(theta0)?;
    match problem.gradient(theta0) {
        Ok(g) => log::info!("L-BFGS start: cost = {cost:.6e}, |grad| = {:.6e}", g.l2_norm()),
        Err(_) => log::info!("L-BFGS start: cost = {cost:.6e}"),
    }
    Ok(())
}
