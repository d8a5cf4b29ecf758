//! Direct 3D catenary fitting without a planarity step.
//!
//! The wire is parameterized by its position `t` along the dominant
//! principal direction `(dx, ·, dz)` of the centered points:
//!
//! ```text
//! x(t) = x0 + t·dx
//! y(t) = y0 + c·(cosh(t / c) − 1)
//! z(t) = z0 + t·dz
//! ```
//!
//! `(x0, y0, z0, c)` minimize the mean squared 3D residual under box bounds.
//! The bounds apply to the centered problem, in input units, and depend on
//! scene scale.
//!
//! The optimizer works on coordinates divided by the wire's extent along
//! `t`, with the loss divided by its value at the initial guess, so the
//! stopping tolerances mean the same thing for a 5 m and a 500 m span. The
//! initial guess `(0, min y, 0, 1)` is taken in that frame. A solution left
//! on a bound with the loss still falling outwards is not a fit.
//!
//! `y` is the sag axis of this model, so wires that run mostly along `y`
//! are rejected up front.

use super::batch::{CurveParams, WireFit, WireFitter};
use super::quality::curve_rmse;
use crate::error::FitError;
use crate::geometry::{linspace, principal_direction};
use crate::optimize::{pinned_parameters, BfgsParams, BoundedMinimizer, Interval, ProjectedBfgs};
use log::debug;
use std::f64::consts::FRAC_1_SQRT_2;

const PARAMETER_NAMES: [&str; 4] = ["x0", "y0", "z0", "c"];

/// Smallest outward slope of the relative loss that counts as pinned.
const PINNED_SLOPE: f64 = 1e-7;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Spatial catenary in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialCatenaryParams {
    pub x0: f64,
    pub y0: f64,
    pub z0: f64,
    pub c: f64,
    /// x-component of the principal direction.
    pub dx: f64,
    /// z-component of the principal direction.
    pub dz: f64,
}

impl SpatialCatenaryParams {
    pub fn eval(&self, t: f64) -> Point3<f64> {
        Point3::new(
            self.x0 + t * self.dx,
            self.y0 + self.c * ((t / self.c).cosh() - 1.0),
            self.z0 + t * self.dz,
        )
    }
}

/// Box bounds of the centered optimization variables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectFitBounds {
    pub x0: Interval,
    pub y0: Interval,
    pub z0: Interval,
    pub c: Interval,
}

impl Default for DirectFitBounds {
    fn default() -> Self {
        Self {
            x0: Interval::new(-10.0, 10.0),
            y0: Interval::new(-10.0, 10.0),
            z0: Interval::new(-10.0, 10.0),
            c: Interval::new(0.01, 1000.0),
        }
    }
}

impl DirectFitBounds {
    fn as_array(&self) -> [Interval; 4] {
        [self.x0, self.y0, self.z0, self.c]
    }

    /// Bounds in a frame where lengths are divided by `scale`.
    fn scaled(&self, scale: f64) -> [Interval; 4] {
        self.as_array()
            .map(|b| Interval::new(b.lower / scale, b.upper / scale))
    }
}

/// Parameters of [`DirectWireFitter`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectFitParams {
    pub sample_count: usize,
    pub compute_rmse: bool,
    pub bounds: DirectFitBounds,
    pub minimizer: BfgsParams,
}

impl Default for DirectFitParams {
    fn default() -> Self {
        Self {
            sample_count: 500,
            compute_rmse: true,
            bounds: DirectFitBounds::default(),
            minimizer: BfgsParams::default(),
        }
    }
}

/// Full result of a direct fit.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectWireFit {
    pub params: SpatialCatenaryParams,
    pub curve: Vec<Point3<f64>>,
    pub rmse: Option<f64>,
    /// Mean squared residual at the optimum.
    pub loss: f64,
    pub iterations: usize,
}

#[derive(Clone, Debug)]
pub struct DirectWireFitter<M = ProjectedBfgs> {
    pub params: DirectFitParams,
    minimizer: M,
}

impl DirectWireFitter<ProjectedBfgs> {
    pub fn new(params: DirectFitParams) -> Self {
        let minimizer = ProjectedBfgs::new(params.minimizer);
        Self { params, minimizer }
    }
}

impl Default for DirectWireFitter<ProjectedBfgs> {
    fn default() -> Self {
        Self::new(DirectFitParams::default())
    }
}

impl<M: BoundedMinimizer> DirectWireFitter<M> {
    pub fn with_minimizer(params: DirectFitParams, minimizer: M) -> Self {
        Self { params, minimizer }
    }

    pub fn fit(&self, points: &[Point3<f64>]) -> Result<DirectWireFit, FitError> {
        if points.len() < 3 {
            return Err(FitError::precondition(format!(
                "need at least 3 points, got {}",
                points.len()
            )));
        }
        if self.params.sample_count < 2 {
            return Err(FitError::precondition(format!(
                "sample_count must be at least 2, got {}",
                self.params.sample_count
            )));
        }
        let (centroid, direction) = principal_direction(points)
            .ok_or_else(|| FitError::precondition("cannot compute a principal direction"))?;
        if direction.y.abs() > FRAC_1_SQRT_2 {
            return Err(FitError::precondition(format!(
                "wire runs along the sag axis y (direction y-component {:.3})",
                direction.y
            )));
        }
        let centered: Vec<Vector3<f64>> = points.iter().map(|p| p - centroid).collect();
        let ts: Vec<f64> = centered.iter().map(|v| v.dot(&direction)).collect();
        let t_min = ts.iter().copied().fold(f64::INFINITY, f64::min);
        let t_max = ts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(t_max > t_min) {
            return Err(FitError::precondition("points have no extent along the wire"));
        }
        let (dx, dz) = (direction.x, direction.z);

        let extent = t_max - t_min;
        let unit: Vec<Vector3<f64>> = centered.iter().map(|v| v / extent).collect();
        let unit_t: Vec<f64> = ts.iter().map(|t| t / extent).collect();
        let misfit = |p: &[f64]| {
            let (x0, y0, z0, c) = (p[0], p[1], p[2], p[3]);
            let sum: f64 = unit
                .iter()
                .zip(&unit_t)
                .map(|(v, &t)| {
                    let ex = x0 + t * dx - v.x;
                    let ey = y0 + c * ((t / c).cosh() - 1.0) - v.y;
                    let ez = z0 + t * dz - v.z;
                    ex * ex + ey * ey + ez * ez
                })
                .sum();
            sum / unit.len() as f64
        };

        let y_min = unit.iter().map(|v| v.y).fold(f64::INFINITY, f64::min);
        let bounds = self.params.bounds.scaled(extent);
        let mut initial = [0.0, y_min, 0.0, 1.0];
        for (v, b) in initial.iter_mut().zip(&bounds) {
            *v = b.clamp(*v);
        }
        let reference = misfit(&initial[..]);
        if !reference.is_finite() {
            return Err(FitError::convergence("loss is not finite at the initial guess"));
        }
        let reference = reference.max(f64::MIN_POSITIVE);
        let loss = |p: &[f64]| misfit(p) / reference;

        let outcome = self.minimizer.minimize(&loss, &initial, &bounds);
        debug!(
            "DirectWireFitter: n={} extent={:.3} termination={:?} iterations={} loss={:.3e}",
            points.len(),
            extent,
            outcome.termination,
            outcome.iterations,
            outcome.value
        );
        if !outcome.termination.converged() {
            return Err(FitError::convergence(format!(
                "bounded minimization stopped with {:?} after {} iterations",
                outcome.termination, outcome.iterations
            )));
        }
        let p = outcome.params.as_slice();
        if p.len() != 4 || p.iter().any(|v| !v.is_finite()) || !(p[3] > 0.0) {
            return Err(FitError::convergence("optimizer returned invalid parameters"));
        }
        let pinned = pinned_parameters(&loss, p, &bounds, PINNED_SLOPE);
        if let Some(&j) = pinned.first() {
            return Err(FitError::convergence(format!(
                "{} pinned at its bound ({:.4} in input units)",
                PARAMETER_NAMES[j],
                p[j] * extent
            )));
        }

        let centered_params = SpatialCatenaryParams {
            x0: p[0] * extent,
            y0: p[1] * extent,
            z0: p[2] * extent,
            c: p[3] * extent,
            dx,
            dz,
        };
        let curve: Vec<Point3<f64>> = linspace(t_min, t_max, self.params.sample_count)
            .into_iter()
            .map(|t| centered_params.eval(t) + centroid.coords)
            .collect();
        let params = SpatialCatenaryParams {
            x0: centered_params.x0 + centroid.x,
            y0: centered_params.y0 + centroid.y,
            z0: centered_params.z0 + centroid.z,
            ..centered_params
        };
        let rmse = if self.params.compute_rmse {
            curve_rmse(points, &curve)
        } else {
            None
        };
        Ok(DirectWireFit {
            params,
            curve,
            rmse,
            loss: misfit(p) * extent * extent,
            iterations: outcome.iterations,
        })
    }
}

impl<M: BoundedMinimizer> WireFitter for DirectWireFitter<M> {
    fn fit_wire(&self, points: &[Point3<f64>]) -> Result<WireFit, FitError> {
        let fit = self.fit(points)?;
        Ok(WireFit {
            curve: fit.curve,
            params: CurveParams::Spatial(fit.params),
            rmse: fit.rmse,
        })
    }
}
