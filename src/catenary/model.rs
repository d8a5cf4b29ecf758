//! Planar catenary `y = y0 + c · (cosh((x − x0) / c) − 1)` and its
//! least-squares fit.

use crate::error::FitError;
use crate::geometry::{linspace, mean};
use crate::optimize::LeastSquaresSolver;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Evaluate the catenary at `x`.
#[inline]
pub fn catenary(x: f64, x0: f64, y0: f64, c: f64) -> f64 {
    y0 + c * (((x - x0) / c).cosh() - 1.0)
}

/// Catenary parameters in a 2D frame: vertex `(x0, y0)` and curvature
/// scale `c` (larger is flatter).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatenaryParams {
    pub x0: f64,
    pub y0: f64,
    pub c: f64,
}

impl CatenaryParams {
    pub fn new(x0: f64, y0: f64, c: f64) -> Self {
        Self { x0, y0, c }
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        catenary(x, self.x0, self.y0, self.c)
    }

    /// Finite parameters with a strictly positive scale.
    pub fn is_valid(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.c.is_finite() && self.c > 0.0
    }

    fn from_slice(p: &[f64]) -> Self {
        Self::new(p[0], p[1], p[2])
    }

    fn to_input_frame(self, origin_x: f64, origin_y: f64, extent: f64) -> Self {
        Self::new(
            origin_x + self.x0 * extent,
            origin_y + self.y0 * extent,
            self.c * extent,
        )
    }
}

/// Result of a 2D catenary fit.
#[derive(Clone, Debug, PartialEq)]
pub struct CatenaryFit2d {
    pub params: CatenaryParams,
    /// Model sampled at evenly spaced x over the data range.
    pub curve: Vec<Point2<f64>>,
    /// RMS of the vertical residuals `y − model(x)` at the data points.
    pub residual_rmse: f64,
    pub iterations: usize,
}

/// Fit a catenary to 2D points.
///
/// The solver runs in a frame translated to `(mean x, min y)` and scaled so
/// the x extent is one unit; catenaries map onto catenaries under uniform
/// scaling, so the parameters convert back exactly. The initial guess is
/// `(mean x, min y, 1.0)` in that frame, a scale equal to the x extent in
/// input units, unless `initial` overrides it.
///
/// Needs at least three points spanning more than one distinct x value and
/// `sample_count >= 2`.
pub fn fit_catenary_2d<S: LeastSquaresSolver>(
    points: &[Point2<f64>],
    sample_count: usize,
    initial: Option<CatenaryParams>,
    solver: &S,
) -> Result<CatenaryFit2d, FitError> {
    if points.len() < 3 {
        return Err(FitError::precondition(format!(
            "need at least 3 points, got {}",
            points.len()
        )));
    }
    if sample_count < 2 {
        return Err(FitError::precondition(format!(
            "sample_count must be at least 2, got {sample_count}"
        )));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(FitError::precondition("non-finite 2D coordinates"));
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    let xs: Vec<f64> = sorted.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = sorted.iter().map(|p| p.y).collect();
    let (x_min, x_max) = (xs[0], xs[xs.len() - 1]);
    if x_max <= x_min {
        return Err(FitError::precondition(
            "all points share one x value; catenary is unidentifiable",
        ));
    }

    let extent = x_max - x_min;
    let origin_x = mean(&xs).unwrap_or(0.0);
    let origin_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let xn: Vec<f64> = xs.iter().map(|x| (x - origin_x) / extent).collect();
    let yn: Vec<f64> = ys.iter().map(|y| (y - origin_y) / extent).collect();
    let p0 = match initial {
        Some(p) => [
            (p.x0 - origin_x) / extent,
            (p.y0 - origin_y) / extent,
            p.c / extent,
        ],
        None => [0.0, 0.0, 1.0],
    };
    let outcome = solver.solve(|x, p| catenary(x, p[0], p[1], p[2]), &xn, &yn, &p0);
    debug!(
        "CatenaryModel: n={} termination={:?} iterations={} cost={:.3e}",
        xs.len(),
        outcome.termination,
        outcome.iterations,
        outcome.cost
    );
    if !outcome.termination.converged() {
        return Err(FitError::convergence(format!(
            "least squares stopped with {:?} after {} iterations",
            outcome.termination, outcome.iterations
        )));
    }
    let params = CatenaryParams::from_slice(&outcome.params)
        .to_input_frame(origin_x, origin_y, extent);
    if !params.is_valid() {
        return Err(FitError::convergence(format!(
            "solver returned an invalid catenary (x0={}, y0={}, c={})",
            params.x0, params.y0, params.c
        )));
    }

    let residual_rmse = (xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| (y - params.eval(x)).powi(2))
        .sum::<f64>()
        / xs.len() as f64)
        .sqrt();
    let curve = linspace(x_min, x_max, sample_count)
        .into_iter()
        .map(|x| Point2::new(x, params.eval(x)))
        .collect();

    Ok(CatenaryFit2d {
        params,
        curve,
        residual_rmse,
        iterations: outcome.iterations,
    })
}
