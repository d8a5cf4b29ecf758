//! Fit quality scoring.
//!
//! The score is the RMS over data points of the distance to the nearest
//! sample of the discretized curve. It is a proxy for the true
//! point-to-curve distance and is bounded below by roughly half the sample
//! spacing, so exact data on a coarsely sampled curve still scores above
//! zero.

use nalgebra::Point3;
use rstar::RTree;

/// Nearest-neighbour distance lookup.
pub trait NearestNeighborQuery {
    /// Distance from `p` to the closest indexed point, `None` when empty.
    fn nearest_distance(&self, p: &Point3<f64>) -> Option<f64>;
}

/// R-tree over the samples of a fitted curve.
pub struct CurveIndex {
    tree: RTree<[f64; 3]>,
}

impl CurveIndex {
    pub fn new(curve: &[Point3<f64>]) -> Self {
        let samples = curve.iter().map(|p| [p.x, p.y, p.z]).collect();
        Self {
            tree: RTree::bulk_load(samples),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl NearestNeighborQuery for CurveIndex {
    fn nearest_distance(&self, p: &Point3<f64>) -> Option<f64> {
        let q = [p.x, p.y, p.z];
        self.tree.nearest_neighbor(&q).map(|s| {
            let (dx, dy, dz) = (s[0] - q[0], s[1] - q[1], s[2] - q[2]);
            (dx * dx + dy * dy + dz * dz).sqrt()
        })
    }
}

/// RMS nearest-neighbour distance of `points` against any index.
pub fn rmse_with<Q: NearestNeighborQuery + ?Sized>(index: &Q, points: &[Point3<f64>]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    for p in points {
        let d = index.nearest_distance(p)?;
        sum += d * d;
    }
    Some((sum / points.len() as f64).sqrt())
}

/// RMS distance from each point to its nearest curve sample. `None` when
/// either set is empty.
pub fn curve_rmse(points: &[Point3<f64>], curve: &[Point3<f64>]) -> Option<f64> {
    rmse_with(&CurveIndex::new(curve), points)
}
