//! Geometry helpers shared by the segmentation and fitting stages.
//!
//! - [`stats`]: means, numpy-compatible percentiles and `linspace`.
//! - [`pca`]: principal-axis decomposition. [`Plane`] fits a best-fit plane
//!   to a 3D point set and maps points to and from its 2D frame; the 2D
//!   rotation and dominant-direction helpers feed the clustering and the
//!   direct 3D fitter.

pub mod pca;
pub mod stats;

pub use pca::{principal_direction, principal_rotation_2d, Plane};
pub use stats::{linspace, mean, percentile};
