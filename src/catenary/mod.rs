//! Catenary models and per-wire fitting.
//!
//! - [`model`]: the 2D catenary and its least-squares fit.
//! - [`planar`]: plane projection, 2D fit, inverse projection.
//! - [`direct`]: bounded 3D fit along the principal direction.
//! - [`quality`]: nearest-sample RMSE against a discretized curve.
//! - [`batch`]: the [`WireFitter`] contract and [`fit_all`] over a label array.

pub mod batch;
pub mod direct;
pub mod model;
pub mod planar;
pub mod quality;

pub use batch::{fit_all, BatchFitReport, CurveParams, WireFit, WireFitFailure, WireFitRecord, WireFitter};
pub use direct::{DirectFitBounds, DirectFitParams, DirectWireFit, DirectWireFitter, SpatialCatenaryParams};
pub use model::{catenary, fit_catenary_2d, CatenaryFit2d, CatenaryParams};
pub use planar::{PlanarCurve, PlanarFitParams, PlanarWireFit, PlanarWireFitter};
pub use quality::{curve_rmse, CurveIndex, NearestNeighborQuery};
