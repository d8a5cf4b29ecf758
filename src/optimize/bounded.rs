//! Box-constrained quasi-Newton minimization.
//!
//! Projected BFGS: variables sitting on a bound with the gradient pushing
//! outwards are frozen for the iteration, the search direction comes from
//! the inverse-Hessian estimate restricted to the free variables, and every
//! trial point is projected back into the box. Backtracking uses the Armijo
//! condition on the projected displacement.

use super::numdiff::gradient;
use super::{BoundedMinimizer, Interval, MinimizeOutcome, Termination};
use log::trace;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

const ARMIJO_C1: f64 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BfgsParams {
    /// Stop when `(f_k − f_{k+1}) / max(|f_k|, |f_{k+1}|, 1) ≤ ftol`.
    pub ftol: f64,
    /// Stop when the projected gradient inf-norm is at most `pgtol`.
    pub pgtol: f64,
    pub max_iterations: usize,
    /// Step halvings before a line search gives up.
    pub max_line_search_steps: usize,
}

impl Default for BfgsParams {
    fn default() -> Self {
        Self {
            ftol: 2.220446049250313e-9,
            pgtol: 1e-5,
            max_iterations: 15_000,
            max_line_search_steps: 40,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProjectedBfgs {
    pub params: BfgsParams,
}

impl ProjectedBfgs {
    pub fn new(params: BfgsParams) -> Self {
        Self { params }
    }
}

fn project(x: &mut DVector<f64>, bounds: &[Interval]) {
    for (v, b) in x.iter_mut().zip(bounds) {
        *v = b.clamp(*v);
    }
}

/// Variables free to move: not pinned to a bound by the gradient.
fn free_mask(x: &DVector<f64>, g: &DVector<f64>, bounds: &[Interval]) -> Vec<bool> {
    (0..x.len())
        .map(|j| {
            let at_lower = x[j] <= bounds[j].lower && g[j] > 0.0;
            let at_upper = x[j] >= bounds[j].upper && g[j] < 0.0;
            !(at_lower || at_upper)
        })
        .collect()
}

fn projected_gradient_norm(x: &DVector<f64>, g: &DVector<f64>, bounds: &[Interval]) -> f64 {
    (0..x.len())
        .map(|j| (bounds[j].clamp(x[j] - g[j]) - x[j]).abs())
        .fold(0.0, f64::max)
}

impl BoundedMinimizer for ProjectedBfgs {
    fn minimize<F>(&self, loss: F, initial: &[f64], bounds: &[Interval]) -> MinimizeOutcome
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = initial.len();
        let mut x = DVector::from_column_slice(initial);
        let outcome = |x: &DVector<f64>, termination, iterations, value| MinimizeOutcome {
            params: x.as_slice().to_vec(),
            termination,
            iterations,
            value,
        };
        if n == 0 || bounds.len() != n || bounds.iter().any(|b| b.lower > b.upper) {
            return outcome(&x, Termination::InvalidInput, 0, f64::NAN);
        }
        project(&mut x, bounds);

        let mut f = loss(x.as_slice());
        if !f.is_finite() {
            return outcome(&x, Termination::NumericalFailure, 0, f);
        }
        let mut g = DVector::from_vec(gradient(&loss, x.as_slice(), f, bounds));
        if g.iter().any(|v| !v.is_finite()) {
            return outcome(&x, Termination::NumericalFailure, 0, f);
        }
        let mut h_inv = DMatrix::<f64>::identity(n, n);
        let mut identity = true;
        let mut first_update = true;

        for iter in 0..self.params.max_iterations {
            if projected_gradient_norm(&x, &g, bounds) <= self.params.pgtol {
                return outcome(&x, Termination::ProjectedGradient, iter, f);
            }

            let free = free_mask(&x, &g, bounds);
            let restrict = |v: DVector<f64>| {
                DVector::from_iterator(n, v.iter().zip(&free).map(|(&vj, &fj)| if fj { vj } else { 0.0 }))
            };
            let g_free = restrict(g.clone());
            let mut d = restrict(-(&h_inv * &g_free));
            if g_free.dot(&d) >= 0.0 {
                h_inv.fill_with_identity();
                identity = true;
                d = -g_free.clone();
            }

            let mut t = if identity {
                (1.0 / d.norm()).min(1.0)
            } else {
                1.0
            };
            let mut accepted = None;
            for _ in 0..self.params.max_line_search_steps {
                let mut trial = &x + &d * t;
                project(&mut trial, bounds);
                let f_trial = loss(trial.as_slice());
                let decrease = g.dot(&(&trial - &x));
                if f_trial.is_finite() && f_trial <= f + ARMIJO_C1 * decrease {
                    accepted = Some((trial, f_trial));
                    break;
                }
                t *= 0.5;
            }

            let Some((x_new, f_new)) = accepted else {
                if identity {
                    return outcome(&x, Termination::LineSearchFailed, iter, f);
                }
                h_inv.fill_with_identity();
                identity = true;
                continue;
            };

            let g_new = DVector::from_vec(gradient(&loss, x_new.as_slice(), f_new, bounds));
            if g_new.iter().any(|v| !v.is_finite()) {
                return outcome(&x_new, Termination::NumericalFailure, iter + 1, f_new);
            }
            let s = &x_new - &x;
            let y = &g_new - &g;
            let rel = (f - f_new) / f.abs().max(f_new.abs()).max(1.0);
            trace!(
                "ProjectedBfgs: iter={} f={:.6e} step={:.3e} rel={:.3e}",
                iter,
                f_new,
                s.norm(),
                rel
            );
            x = x_new;
            f = f_new;
            g = g_new;
            if rel <= self.params.ftol {
                return outcome(&x, Termination::SmallReduction, iter + 1, f);
            }

            let sy = s.dot(&y);
            if sy > 1e-10 * s.norm() * y.norm() {
                if first_update {
                    h_inv = DMatrix::identity(n, n) * (sy / y.norm_squared());
                    first_update = false;
                }
                let rho = 1.0 / sy;
                let eye = DMatrix::<f64>::identity(n, n);
                let left = &eye - (&s * y.transpose()) * rho;
                let right = &eye - (&y * s.transpose()) * rho;
                h_inv = &left * &h_inv * &right + (&s * s.transpose()) * rho;
                identity = false;
            }
        }
        outcome(&x, Termination::MaxIterations, self.params.max_iterations, f)
    }
}

/// Indices of parameters held on a bound by a gradient pointing out of the
/// box, i.e. where the unconstrained minimum lies beyond the bound.
/// `tolerance` is the smallest outward slope that counts.
pub fn pinned_parameters<F>(loss: F, x: &[f64], bounds: &[Interval], tolerance: f64) -> Vec<usize>
where
    F: Fn(&[f64]) -> f64,
{
    let fx = loss(x);
    let g = gradient(&loss, x, fx, bounds);
    (0..x.len().min(bounds.len()))
        .filter(|&j| {
            let b = bounds[j];
            let slack = 1e-9 * x[j].abs().max(1.0);
            let at_lower = b.lower.is_finite() && x[j] <= b.lower + slack && g[j] > tolerance;
            let at_upper = b.upper.is_finite() && x[j] >= b.upper - slack && g[j] < -tolerance;
            at_lower || at_upper
        })
        .collect()
}
