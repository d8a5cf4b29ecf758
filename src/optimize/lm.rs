//! Levenberg-Marquardt for small curve-fitting problems.

use super::numdiff::jacobian;
use super::{LeastSquaresSolver, SolverOutcome, Termination};
use log::trace;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Stopping tolerances.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmParams {
    /// Relative reduction of the sum of squares.
    pub ftol: f64,
    /// Relative step size.
    pub xtol: f64,
    /// Inf-norm of the gradient `Jᵀr`.
    pub gtol: f64,
    /// Iteration cap; `None` means `200 · (n + 1)` for `n` parameters.
    pub max_iterations: Option<usize>,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            max_iterations: None,
        }
    }
}

/// Marquardt damping `λ · diag(JᵀJ)` with Nielsen's update: shrink
/// smoothly on good steps, grow geometrically on consecutive rejections.
struct Damping {
    lambda: f64,
    nu: f64,
}

impl Damping {
    const INITIAL_LAMBDA: f64 = 1e-3;
    const MAX_LAMBDA: f64 = 1e16;

    fn new() -> Self {
        Self {
            lambda: Self::INITIAL_LAMBDA,
            nu: 2.0,
        }
    }

    fn accept(&mut self, rho: f64) {
        let shrink = 1.0 - (2.0 * rho - 1.0).powi(3);
        self.lambda *= shrink.max(1.0 / 3.0);
        self.nu = 2.0;
    }

    fn reject(&mut self) {
        self.lambda *= self.nu;
        self.nu *= 2.0;
    }

    fn exhausted(&self) -> bool {
        self.lambda > Self::MAX_LAMBDA
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LevenbergMarquardt {
    pub params: LmParams,
}

impl LevenbergMarquardt {
    pub fn new(params: LmParams) -> Self {
        Self { params }
    }
}

fn residuals<F>(model: &F, x: &[f64], y: &[f64], p: &[f64]) -> DVector<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    DVector::from_iterator(x.len(), x.iter().zip(y).map(|(&xi, &yi)| model(xi, p) - yi))
}

impl LeastSquaresSolver for LevenbergMarquardt {
    fn solve<F>(&self, model: F, x: &[f64], y: &[f64], initial: &[f64]) -> SolverOutcome
    where
        F: Fn(f64, &[f64]) -> f64,
    {
        let n = initial.len();
        let mut p = DVector::from_column_slice(initial);
        let outcome = |p: &DVector<f64>, termination, iterations, cost| SolverOutcome {
            params: p.as_slice().to_vec(),
            termination,
            iterations,
            cost,
        };
        if n == 0 || x.len() != y.len() || x.len() < n {
            return outcome(&p, Termination::InvalidInput, 0, f64::NAN);
        }

        let mut r = residuals(&model, x, y, p.as_slice());
        let mut cost = 0.5 * r.norm_squared();
        if !cost.is_finite() {
            return outcome(&p, Termination::NumericalFailure, 0, cost);
        }

        let max_iterations = self.params.max_iterations.unwrap_or(200 * (n + 1));
        // Column scales: running maximum of diag(JᵀJ), as in MINPACK.
        let mut scale = DVector::<f64>::zeros(n);
        let mut damping = Damping::new();
        let mut accepted = 0usize;

        for iter in 0..max_iterations {
            if cost == 0.0 {
                return outcome(&p, Termination::SmallReduction, iter, cost);
            }
            let jac: DMatrix<f64> = jacobian(&model, x, p.as_slice());
            let jtj = jac.transpose() * &jac;
            let g = jac.transpose() * &r;
            if g.amax() <= self.params.gtol {
                let termination = if accepted > 0 {
                    Termination::SmallGradient
                } else {
                    Termination::Stalled
                };
                return outcome(&p, termination, iter, cost);
            }
            for j in 0..n {
                scale[j] = scale[j].max(jtj[(j, j)]).max(1e-12);
            }

            loop {
                let mut system = jtj.clone();
                for j in 0..n {
                    system[(j, j)] += damping.lambda * scale[j];
                }
                let step = system.cholesky().map(|c| c.solve(&(-&g)));
                let Some(h) = step else {
                    damping.reject();
                    if damping.exhausted() {
                        return outcome(&p, Termination::NumericalFailure, iter, cost);
                    }
                    continue;
                };

                let step_small =
                    h.norm() <= self.params.xtol * (p.norm() + self.params.xtol);
                let trial = &p + &h;
                let r_trial = residuals(&model, x, y, trial.as_slice());
                let cost_trial = 0.5 * r_trial.norm_squared();
                let damped_h = h.component_mul(&scale) * damping.lambda;
                let predicted = 0.5 * h.dot(&(damped_h - &g));
                let actual = cost - cost_trial;
                let rho = if predicted > 0.0 { actual / predicted } else { -1.0 };

                if cost_trial.is_finite() && rho > 0.0 {
                    trace!(
                        "LevenbergMarquardt: iter={} cost={:.3e} lambda={:.3e} rho={:.3}",
                        iter,
                        cost_trial,
                        damping.lambda,
                        rho
                    );
                    let small_reduction = actual <= self.params.ftol * cost
                        && predicted <= self.params.ftol * cost
                        && rho <= 2.0;
                    p = trial;
                    r = r_trial;
                    cost = cost_trial;
                    accepted += 1;
                    damping.accept(rho);
                    if small_reduction {
                        return outcome(&p, Termination::SmallReduction, iter + 1, cost);
                    }
                    if step_small {
                        return outcome(&p, Termination::SmallStep, iter + 1, cost);
                    }
                    break;
                }

                // A collapsed step only counts as convergence after progress.
                if step_small {
                    let termination = if accepted > 0 {
                        Termination::SmallStep
                    } else {
                        Termination::Stalled
                    };
                    return outcome(&p, termination, iter + 1, cost);
                }
                damping.reject();
                if damping.exhausted() {
                    return outcome(&p, Termination::NumericalFailure, iter + 1, cost);
                }
            }
        }
        outcome(&p, Termination::MaxIterations, max_iterations, cost)
    }
}
