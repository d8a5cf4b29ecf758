//! Plain 3D DBSCAN over the whole cloud.
//!
//! An alternative to the topology router for scenes where wires are well
//! separated in 3D. Height can be weighted with `z_scale` before clustering.

use crate::cluster::Dbscan;
use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumetricParams {
    pub eps: f64,
    pub min_samples: usize,
    /// Multiplier applied to z before clustering.
    pub z_scale: f64,
}

impl Default for VolumetricParams {
    fn default() -> Self {
        Self {
            eps: 0.765,
            min_samples: 8,
            z_scale: 1.0,
        }
    }
}

pub fn segment_volumetric(points: &[Point3<f64>], params: &VolumetricParams) -> Vec<i32> {
    let scaled: Vec<[f64; 3]> = points
        .iter()
        .map(|p| [p.x, p.y, p.z * params.z_scale])
        .collect();
    let labels = Dbscan::new(params.eps, params.min_samples).cluster_points(&scaled);
    debug!(
        "Volumetric: n={} eps={} min_samples={} clusters={}",
        points.len(),
        params.eps,
        params.min_samples,
        labels.iter().copied().max().map_or(0, |m| m + 1)
    );
    labels
}
