//! Plane-projected catenary fitting.
//!
//! A wire hangs in a vertical plane, so the 3D points are projected onto
//! their best-fit plane, a 2D catenary is fitted there, and the sampled
//! curve is mapped back into 3D. The sag axis of the plane frame is oriented
//! so the projected wire opens upwards, whatever the slope of the span.

use super::batch::{CurveParams, WireFit, WireFitter};
use super::model::{fit_catenary_2d, CatenaryParams};
use super::quality::curve_rmse;
use crate::error::FitError;
use crate::geometry::Plane;
use crate::optimize::{LeastSquaresSolver, LevenbergMarquardt, LmParams};
use log::debug;
use nalgebra::{Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Parameters of [`PlanarWireFitter`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanarFitParams {
    /// Samples on the reconstructed curve.
    pub sample_count: usize,
    /// Score each fit with the nearest-sample RMSE.
    pub compute_rmse: bool,
    /// Initial guess in the plane frame; `None` derives it from the data.
    pub initial: Option<CatenaryParams>,
    pub solver: LmParams,
}

impl Default for PlanarFitParams {
    fn default() -> Self {
        Self {
            sample_count: 500,
            compute_rmse: true,
            initial: None,
            solver: LmParams::default(),
        }
    }
}

/// Catenary parameters together with the plane frame they live in.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanarCurve {
    pub catenary: CatenaryParams,
    /// Plane origin (centroid of the wire points).
    pub origin: Point3<f64>,
    /// In-plane basis: along-wire axis, then the sag axis.
    pub axes: [Vector3<f64>; 2],
}

/// Full result of a planar fit.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanarWireFit {
    pub plane: Plane,
    pub params: CatenaryParams,
    pub curve: Vec<Point3<f64>>,
    pub rmse: Option<f64>,
    /// Vertical residual RMS in the plane frame.
    pub residual_rmse: f64,
}

#[derive(Clone, Debug)]
pub struct PlanarWireFitter<S = LevenbergMarquardt> {
    pub params: PlanarFitParams,
    solver: S,
}

impl PlanarWireFitter<LevenbergMarquardt> {
    pub fn new(params: PlanarFitParams) -> Self {
        let solver = LevenbergMarquardt::new(params.solver);
        Self { params, solver }
    }
}

impl Default for PlanarWireFitter<LevenbergMarquardt> {
    fn default() -> Self {
        Self::new(PlanarFitParams::default())
    }
}

impl<S: LeastSquaresSolver> PlanarWireFitter<S> {
    /// Use a custom least-squares backend.
    pub fn with_solver(params: PlanarFitParams, solver: S) -> Self {
        Self { params, solver }
    }

    pub fn fit(&self, points: &[Point3<f64>]) -> Result<PlanarWireFit, FitError> {
        if points.len() < 3 {
            return Err(FitError::precondition(format!(
                "need at least 3 points, got {}",
                points.len()
            )));
        }
        let mut plane = Plane::fit(points)
            .ok_or_else(|| FitError::precondition("cannot fit a plane to the points"))?;
        let mut projected = plane.project_all(points);
        if quadratic_coefficient(&projected) < 0.0 {
            plane.flip_secondary();
            for q in &mut projected {
                q.y = -q.y;
            }
        }
        let fit2d = fit_catenary_2d(
            &projected,
            self.params.sample_count,
            self.params.initial,
            &self.solver,
        )?;
        let curve = plane.unproject_all(&fit2d.curve);
        let rmse = if self.params.compute_rmse {
            curve_rmse(points, &curve)
        } else {
            None
        };
        debug!(
            "PlanarWireFitter: n={} x0={:.4} y0={:.4} c={:.4} residual={:.3e}",
            points.len(),
            fit2d.params.x0,
            fit2d.params.y0,
            fit2d.params.c,
            fit2d.residual_rmse
        );
        Ok(PlanarWireFit {
            plane,
            params: fit2d.params,
            curve,
            rmse,
            residual_rmse: fit2d.residual_rmse,
        })
    }
}

/// Leading coefficient `a` of the least-squares parabola `y = a·x² + b·x + d`,
/// or zero when the normal equations are singular.
fn quadratic_coefficient(points: &[Point2<f64>]) -> f64 {
    let half = points.iter().map(|q| q.x.abs()).fold(0.0, f64::max);
    if half <= 0.0 {
        return 0.0;
    }
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for q in points {
        let u = q.x / half;
        let row = Vector3::new(u * u, u, 1.0);
        ata += row * row.transpose();
        atb += row * q.y;
    }
    ata.lu().solve(&atb).map(|coef| coef[0]).unwrap_or(0.0)
}

impl<S: LeastSquaresSolver> WireFitter for PlanarWireFitter<S> {
    fn fit_wire(&self, points: &[Point3<f64>]) -> Result<WireFit, FitError> {
        let fit = self.fit(points)?;
        Ok(WireFit {
            params: CurveParams::Planar(PlanarCurve {
                catenary: fit.params,
                origin: fit.plane.origin,
                axes: fit.plane.axes,
            }),
            curve: fit.curve,
            rmse: fit.rmse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::linspace;
    use approx::assert_relative_eq;

    fn hanging_wire(c: f64) -> Vec<Point3<f64>> {
        // Wire along y, sagging in z, offset in x.
        linspace(-4.0, 4.0, 120)
            .into_iter()
            .map(|s| Point3::new(2.0, 10.0 + s, 5.0 + c * ((s / c).cosh() - 1.0)))
            .collect()
    }

    #[test]
    fn recovers_the_curvature_scale_in_3d() {
        let pts = hanging_wire(6.0);
        let fit = PlanarWireFitter::default().fit(&pts).unwrap();
        assert_relative_eq!(fit.params.c, 6.0, epsilon = 1e-4);
        assert!(fit.residual_rmse < 1e-6);
        assert_eq!(fit.curve.len(), 500);
        let rmse = fit.rmse.unwrap();
        assert!(rmse < 0.02, "rmse={rmse}");
        // The sag axis of the plane frame points up.
        assert!(fit.plane.axes[1].z > 0.9);
    }

    #[test]
    fn rmse_can_be_disabled() {
        let fitter = PlanarWireFitter::new(PlanarFitParams {
            compute_rmse: false,
            sample_count: 50,
            ..Default::default()
        });
        let wire = fitter.fit_wire(&hanging_wire(3.0)).unwrap();
        assert!(wire.rmse.is_none());
        assert_eq!(wire.curve.len(), 50);
        assert_relative_eq!(wire.params.curvature(), 3.0, epsilon = 1e-4);
    }

    /// Wire in the xz plane: `z = sag(x) + x·tan(slope)`.
    fn sloped_wire(c: f64, half: f64, slope_deg: f64) -> Vec<Point3<f64>> {
        let tan = slope_deg.to_radians().tan();
        linspace(-half, half, 300)
            .into_iter()
            .map(|x| Point3::new(x, 0.0, c * ((x / c).cosh() - 1.0) + x * tan))
            .collect()
    }

    #[test]
    fn steep_span_opens_upwards_in_the_plane_frame() {
        // In the chord frame the curvature scale grows by 1 / cos³(slope).
        let fit = PlanarWireFitter::default()
            .fit(&sloped_wire(50.0, 5.0, 60.0))
            .unwrap();
        let expected = 50.0 / 60f64.to_radians().cos().powi(3);
        assert_relative_eq!(fit.params.c, expected, max_relative = 0.15);
        assert!(fit.residual_rmse < 0.02, "residual={}", fit.residual_rmse);
        let rmse = fit.rmse.unwrap();
        assert!(rmse < 0.05, "rmse={rmse}");
        // Sag axis leans up, against the 60° chord.
        assert!(fit.plane.axes[1].z > 0.0);
        assert!(fit.plane.axes[1].x < 0.0);
    }

    #[test]
    fn parabola_sign_follows_the_opening() {
        let up: Vec<Point2<f64>> = (-5..=5).map(|i| Point2::new(i as f64, 0.2 * (i * i) as f64)).collect();
        let down: Vec<Point2<f64>> = up.iter().map(|q| Point2::new(q.x, 3.0 - q.y)).collect();
        assert!(quadratic_coefficient(&up) > 0.0);
        assert!(quadratic_coefficient(&down) < 0.0);
        assert_eq!(quadratic_coefficient(&[Point2::new(0.0, 1.0)]), 0.0);
    }

    #[test]
    fn too_few_points_is_a_precondition_failure() {
        let pts = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            PlanarWireFitter::default().fit_wire(&pts),
            Err(FitError::Precondition(_))
        ));
    }
}
