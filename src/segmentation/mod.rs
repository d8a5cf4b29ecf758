//! Wire segmentation: assign every point a wire label or `-1`.
//!
//! [`WireSegmenter`] judges the vertical spread of the scene and routes it:
//! - flat scenes (robust z spread below the threshold) go to
//!   [`segment_flat`], a 1D density clustering across the run direction;
//! - stacked scenes go to [`segment_stacked`], which first separates layers
//!   in a vertical cross-section and then splits each layer into wires.
//!
//! [`segment_volumetric`] is a standalone 3D DBSCAN alternative.

pub mod flat;
pub mod stacked;
pub mod volumetric;

pub use flat::segment_flat;
pub use stacked::{segment_stacked, GroupSummary, StackedLabels};
pub use volumetric::{segment_volumetric, VolumetricParams};

use crate::cluster::{distinct_labels, Dbscan, DensityClusterer, Hdbscan};
use crate::geometry::stats::percentile_sorted;
use crate::types::{PointCloud, Topology, NOISE};
use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Vertical plane used to separate layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossSection {
    /// `(y, z)`: wires running along x.
    #[default]
    Yz,
    /// `(x, z)`: wires running along y.
    Xz,
}

impl CrossSection {
    pub fn project(self, p: &Point3<f64>) -> [f64; 2] {
        match self {
            CrossSection::Yz => [p.y, p.z],
            CrossSection::Xz => [p.x, p.z],
        }
    }
}

/// Router configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Scenes with `p95(z) − p5(z)` strictly below this are flat.
    pub flat_threshold: f64,
    /// Per-layer wire separation profile.
    pub fine: Dbscan,
    /// Layer separation profile.
    pub major: Hdbscan,
    pub cross_section: CrossSection,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            flat_threshold: 2.0,
            fine: Dbscan::default(),
            major: Hdbscan::default(),
            cross_section: CrossSection::Yz,
        }
    }
}

/// Robust vertical spread `p95(z) − p5(z)`; `0` for an empty cloud.
pub fn vertical_spread(cloud: &PointCloud) -> f64 {
    let mut z = cloud.axis_values(2);
    if z.is_empty() {
        return 0.0;
    }
    z.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    percentile_sorted(&z, 95.0) - percentile_sorted(&z, 5.0)
}

/// Flat iff the robust vertical spread is strictly below `threshold`.
pub fn classify_topology(cloud: &PointCloud, threshold: f64) -> Topology {
    if vertical_spread(cloud) < threshold {
        Topology::Flat
    } else {
        Topology::Stacked
    }
}

/// Detailed segmentation output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Segmentation {
    pub topology: Topology,
    /// One label per point, `-1` for noise.
    pub labels: Vec<i32>,
    /// Stage-1 layer labels (stacked scenes only).
    pub major_labels: Option<Vec<i32>>,
    /// Per-layer summaries (stacked scenes only).
    pub groups: Vec<GroupSummary>,
}

impl Segmentation {
    pub fn wire_count(&self) -> usize {
        distinct_labels(&self.labels).len()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }
}

/// Topology router over a fine and a major density clusterer.
#[derive(Clone, Debug)]
pub struct WireSegmenter<F = Dbscan, M = Hdbscan> {
    pub flat_threshold: f64,
    pub cross_section: CrossSection,
    fine: F,
    major: M,
}

impl WireSegmenter<Dbscan, Hdbscan> {
    pub fn new(params: SegmentationParams) -> Self {
        Self {
            flat_threshold: params.flat_threshold,
            cross_section: params.cross_section,
            fine: params.fine,
            major: params.major,
        }
    }
}

impl Default for WireSegmenter<Dbscan, Hdbscan> {
    fn default() -> Self {
        Self::new(SegmentationParams::default())
    }
}

impl<F, M> WireSegmenter<F, M>
where
    F: DensityClusterer + Sync,
    M: DensityClusterer,
{
    /// Router over custom clustering backends.
    pub fn with_clusterers(flat_threshold: f64, cross_section: CrossSection, fine: F, major: M) -> Self {
        Self {
            flat_threshold,
            cross_section,
            fine,
            major,
        }
    }

    pub fn classify_topology(&self, cloud: &PointCloud) -> Topology {
        classify_topology(cloud, self.flat_threshold)
    }

    /// One label per point.
    pub fn segment(&self, cloud: &PointCloud) -> Vec<i32> {
        self.segment_detailed(cloud).labels
    }

    pub fn segment_detailed(&self, cloud: &PointCloud) -> Segmentation {
        let topology = self.classify_topology(cloud);
        debug!(
            "SegmentationRouter: n={} spread={:.3} threshold={} topology={:?}",
            cloud.len(),
            vertical_spread(cloud),
            self.flat_threshold,
            topology
        );
        match topology {
            Topology::Flat => Segmentation {
                topology,
                labels: segment_flat(cloud.points(), &self.fine),
                major_labels: None,
                groups: Vec::new(),
            },
            Topology::Stacked => {
                let stacked =
                    segment_stacked(cloud.points(), &self.fine, &self.major, self.cross_section);
                Segmentation {
                    topology,
                    labels: stacked.labels,
                    major_labels: Some(stacked.major_labels),
                    groups: stacked.groups,
                }
            }
        }
    }
}
