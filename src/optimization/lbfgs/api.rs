//! Entry point for minimizing an [`Objective`] with L-BFGS.
use crate::optimization::{
    errors::OptResult,
    lbfgs::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, Objective, OptimOptions, OptimOutcome},
        types::Theta,
    },
};

/// Minimize `f` over `θ` starting from `theta0`.
///
/// Calls `f.check(theta0, data)` first, then builds the L-BFGS solver for
/// `opts.line_searcher` and runs it.
///
/// # Errors
/// - Whatever `check` rejects.
/// - Solver configuration, objective, and outcome errors as `OptError`.
///
/// # Example
/// ```ignore
/// let opts = OptimOptions::default();
/// let out = minimize(&model, theta0, &data, &opts)?;
/// println!("f* = {}, converged = {}", out.value, out.converged);
/// ```
pub fn minimize<F: Objective>(
    f: &F, theta0: Theta, data: &F::Data, opts: &OptimOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
