//! Single-layer wire separation.
//!
//! Side-by-side wires are long and nearly parallel, so once the dominant
//! horizontal run direction is rotated out they differ mostly along the
//! orthogonal horizontal axis. Clustering that single coordinate separates
//! them more reliably than 2D clustering of the footprint.

use crate::cluster::DensityClusterer;
use crate::geometry::principal_rotation_2d;
use log::debug;
use nalgebra::Point3;

/// Label the wires of a single layer. Height is ignored.
pub fn segment_flat<C>(points: &[Point3<f64>], clusterer: &C) -> Vec<i32>
where
    C: DensityClusterer + ?Sized,
{
    if points.is_empty() {
        return Vec::new();
    }
    let footprint: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
    let across: Vec<f64> = principal_rotation_2d(&footprint)
        .into_iter()
        .map(|r| r[1])
        .collect();
    let labels = clusterer.fit_predict_1d(&across);
    debug!(
        "SimpleClustering: n={} clusters={}",
        points.len(),
        labels.iter().copied().max().map_or(0, |m| m + 1)
    );
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{distinct_labels, Dbscan};
    use crate::types::NOISE;

    #[test]
    fn parallel_diagonal_wires_are_separated() {
        // Three wires running along (1, 1), 0.3 apart, with sag in z.
        let dir = [std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2];
        let normal = [-dir[1], dir[0]];
        let mut pts = Vec::new();
        for k in 0..3 {
            for i in 0..80 {
                let s = i as f64 * 0.1 - 4.0;
                let off = k as f64 * 0.3;
                pts.push(Point3::new(
                    s * dir[0] + off * normal[0],
                    s * dir[1] + off * normal[1],
                    0.1 * s * s,
                ));
            }
        }
        let labels = segment_flat(&pts, &Dbscan::default());
        assert_eq!(labels.len(), pts.len());
        assert_eq!(distinct_labels(&labels), vec![0, 1, 2]);
        for k in 0..3 {
            let wire = &labels[k * 80..(k + 1) * 80];
            assert!(wire.iter().all(|&l| l == wire[0] && l != NOISE));
        }
    }

    #[test]
    fn empty_input() {
        assert!(segment_flat(&[], &Dbscan::default()).is_empty());
    }
}
