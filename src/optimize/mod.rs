//! Small dense nonlinear solvers used by the catenary fitters.
//!
//! - [`LevenbergMarquardt`] solves unconstrained curve-fitting problems
//!   `min Σ (model(xᵢ, p) − yᵢ)²`.
//! - [`ProjectedBfgs`] minimizes a smooth scalar loss inside a box.
//!
//! Both use finite-difference derivatives and report a [`Termination`]
//! reason rather than failing; callers decide what a non-converged run means.

mod bounded;
mod lm;
mod numdiff;

pub use bounded::{pinned_parameters, BfgsParams, ProjectedBfgs};
pub use lm::{LevenbergMarquardt, LmParams};

use serde::{Deserialize, Serialize};

/// Closed interval `[lower, upper]` for one parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Unbounded on both sides.
    pub const fn free() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.max(self.lower).min(self.upper)
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// Why a solver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Relative step size fell below `xtol`.
    SmallStep,
    /// Relative cost reduction fell below `ftol`.
    SmallReduction,
    /// Gradient norm fell below `gtol`.
    SmallGradient,
    /// Projected gradient inf-norm fell below `pgtol`.
    ProjectedGradient,
    MaxIterations,
    /// No acceptable step along a steepest-descent direction.
    LineSearchFailed,
    /// Steps collapsed or the gradient vanished before any step reduced the
    /// cost.
    Stalled,
    /// Cost or step became non-finite, or the damped system stayed singular.
    NumericalFailure,
    /// Inconsistent problem dimensions.
    InvalidInput,
}

impl Termination {
    pub fn converged(self) -> bool {
        matches!(
            self,
            Termination::SmallStep
                | Termination::SmallReduction
                | Termination::SmallGradient
                | Termination::ProjectedGradient
        )
    }
}

/// Result of a least-squares solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverOutcome {
    pub params: Vec<f64>,
    pub termination: Termination,
    pub iterations: usize,
    /// `0.5 · Σ rᵢ²` at `params`.
    pub cost: f64,
}

/// Result of a bounded minimization.
#[derive(Clone, Debug, PartialEq)]
pub struct MinimizeOutcome {
    pub params: Vec<f64>,
    pub termination: Termination,
    pub iterations: usize,
    /// Loss at `params`.
    pub value: f64,
}

/// Nonlinear least-squares curve fitting: find `p` minimizing
/// `Σ (model(xᵢ, p) − yᵢ)²`.
pub trait LeastSquaresSolver: Send + Sync {
    fn solve<F>(&self, model: F, x: &[f64], y: &[f64], initial: &[f64]) -> SolverOutcome
    where
        F: Fn(f64, &[f64]) -> f64;
}

/// Minimization of a scalar loss under per-parameter box constraints.
pub trait BoundedMinimizer: Send + Sync {
    fn minimize<F>(&self, loss: F, initial: &[f64], bounds: &[Interval]) -> MinimizeOutcome
    where
        F: Fn(&[f64]) -> f64;
}
