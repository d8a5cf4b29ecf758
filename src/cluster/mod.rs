//! Density-based clustering behind a small contract.
//!
//! The segmentation stages only see [`DensityClusterer`]: points in, one
//! label per point out, `-1` for noise. Two implementations cover the two
//! parameter profiles used by the router:
//! - [`Dbscan`]: fixed-radius DBSCAN, the fine-grained per-layer profile.
//! - [`Hdbscan`]: hierarchical DBSCAN with excess-of-mass selection, the
//!   coarse major-group profile.
//!
//! [`labels`] holds the label bookkeeping (distinct ids, densification,
//! per-label index sets) shared by segmentation and batch fitting.

pub mod dbscan;
pub mod hdbscan;
pub mod labels;

pub use dbscan::Dbscan;
pub use hdbscan::{ClusterSelectionMethod, Hdbscan};
pub use labels::{densify, distinct_labels, indices_by_label};

/// Density clustering contract.
///
/// Implementations must return exactly one label per input point, use `-1`
/// for noise and number clusters densely from `0`.
pub trait DensityClusterer {
    /// Cluster 2D feature vectors.
    fn fit_predict(&self, points: &[[f64; 2]]) -> Vec<i32>;

    /// Cluster scalar features. The default embeds them on a line.
    fn fit_predict_1d(&self, values: &[f64]) -> Vec<i32> {
        let embedded: Vec<[f64; 2]> = values.iter().map(|&v| [v, 0.0]).collect();
        self.fit_predict(&embedded)
    }
}
