//! Fit every labelled wire in a cloud.
//!
//! Per-wire failures never abort the batch: they are collected next to the
//! successful records so the caller sees exactly which labels could not be
//! fitted and why.

use super::direct::SpatialCatenaryParams;
use super::planar::PlanarCurve;
use crate::cluster::indices_by_label;
use crate::error::{FitError, WireError};
use crate::types::PointCloud;
use log::{debug, warn};
use nalgebra::Point3;
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fitted model parameters, tagged by the model that produced them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CurveParams {
    /// Catenary in a best-fit plane.
    Planar(PlanarCurve),
    /// Catenary along a straight 3D direction.
    Spatial(SpatialCatenaryParams),
}

impl CurveParams {
    /// Curvature scale `c` of the fitted catenary.
    pub fn curvature(&self) -> f64 {
        match self {
            CurveParams::Planar(p) => p.catenary.c,
            CurveParams::Spatial(p) => p.c,
        }
    }
}

/// Successful single-wire fit.
#[derive(Clone, Debug, PartialEq)]
pub struct WireFit {
    /// Sampled 3D curve.
    pub curve: Vec<Point3<f64>>,
    pub params: CurveParams,
    /// Fit quality when scoring was requested.
    pub rmse: Option<f64>,
}

/// Single-wire fitting strategy.
pub trait WireFitter: Send + Sync {
    fn fit_wire(&self, points: &[Point3<f64>]) -> Result<WireFit, FitError>;
}

/// One fitted wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireFitRecord {
    pub label: i32,
    /// Source points of this wire.
    pub points: Vec<Point3<f64>>,
    pub curve: Vec<Point3<f64>>,
    pub params: CurveParams,
    pub rmse: Option<f64>,
}

/// One wire that could not be fitted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireFitFailure {
    pub label: i32,
    pub point_count: usize,
    pub error: FitError,
}

/// Outcome of [`fit_all`], both lists in ascending label order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchFitReport {
    pub records: Vec<WireFitRecord>,
    pub failures: Vec<WireFitFailure>,
}

impl BatchFitReport {
    /// Number of labels attempted.
    pub fn attempted(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

/// Fit each non-noise label of `labels` with `fitter`.
///
/// Labels are visited in ascending order; a label array whose length differs
/// from the cloud is the only error.
pub fn fit_all<F>(cloud: &PointCloud, labels: &[i32], fitter: &F) -> Result<BatchFitReport, WireError>
where
    F: WireFitter + ?Sized,
{
    if labels.len() != cloud.len() {
        return Err(WireError::LabelMismatch {
            points: cloud.len(),
            labels: labels.len(),
        });
    }
    let groups: Vec<(i32, Vec<Point3<f64>>)> = indices_by_label(labels)
        .into_iter()
        .map(|(label, idx)| (label, cloud.select(&idx)))
        .collect();

    let fit_one = |(label, points): (i32, Vec<Point3<f64>>)| {
        let result = fitter.fit_wire(&points);
        (label, points, result)
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<_> = groups.into_par_iter().map(fit_one).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<_> = groups.into_iter().map(fit_one).collect();

    let mut report = BatchFitReport::default();
    for (label, points, result) in outcomes {
        match result {
            Ok(fit) => {
                debug!(
                    "BatchFitter: wire {} n={} c={:.4} rmse={}",
                    label,
                    points.len(),
                    fit.params.curvature(),
                    fit.rmse
                        .map(|r| format!("{r:.4}"))
                        .unwrap_or_else(|| "n/a".to_string())
                );
                report.records.push(WireFitRecord {
                    label,
                    points,
                    curve: fit.curve,
                    params: fit.params,
                    rmse: fit.rmse,
                });
            }
            Err(error) => {
                warn!(
                    "BatchFitter: wire {} n={} failed: {}",
                    label,
                    points.len(),
                    error
                );
                report.failures.push(WireFitFailure {
                    label,
                    point_count: points.len(),
                    error,
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catenary::CatenaryParams;
    use crate::types::NOISE;
    use nalgebra::Vector3;

    /// Accepts wires with an even number of points.
    struct EvenFitter;

    impl WireFitter for EvenFitter {
        fn fit_wire(&self, points: &[Point3<f64>]) -> Result<WireFit, FitError> {
            if points.len() % 2 == 1 {
                return Err(FitError::precondition("odd"));
            }
            Ok(WireFit {
                curve: points.to_vec(),
                params: CurveParams::Planar(PlanarCurve {
                    catenary: CatenaryParams::new(0.0, 0.0, points.len() as f64),
                    origin: Point3::origin(),
                    axes: [Vector3::x(), Vector3::z()],
                }),
                rmse: None,
            })
        }
    }

    fn cloud(n: usize) -> PointCloud {
        PointCloud::new((0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect())
    }

    #[test]
    fn failures_do_not_abort_and_order_is_ascending() {
        let labels = [2, 2, 0, 0, 0, NOISE, 1, 1, 0, 2, 2, 2];
        let report = fit_all(&cloud(labels.len()), &labels, &EvenFitter).unwrap();
        let ok: Vec<i32> = report.records.iter().map(|r| r.label).collect();
        let failed: Vec<i32> = report.failures.iter().map(|f| f.label).collect();
        assert_eq!(ok, vec![0, 1]);
        assert_eq!(failed, vec![2]);
        assert_eq!(report.failures[0].point_count, 5);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.records[0].points.len(), 4);
    }

    #[test]
    fn label_length_must_match() {
        let err = fit_all(&cloud(3), &[0, 0], &EvenFitter).unwrap_err();
        assert_eq!(err, WireError::LabelMismatch { points: 3, labels: 2 });
    }

    #[test]
    fn all_noise_is_an_empty_report() {
        let report = fit_all(&cloud(3), &[NOISE; 3], &EvenFitter).unwrap();
        assert_eq!(report, BatchFitReport::default());
    }
}
