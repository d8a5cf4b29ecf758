//! Fixed-radius DBSCAN.
//!
//! Semantics follow the usual definition: a point is *core* when at least
//! `min_samples` points (itself included) lie within `eps`; clusters are the
//! connected components of core points, border points join a neighbouring
//! cluster and everything else is noise. Clusters are numbered in order of
//! their first member's index.
//!
//! Scalar features go through an exact sorted sweep in `O(n log n)`; vector
//! features use an R-tree for the radius queries.

use super::labels::relabel_by_first_appearance;
use super::DensityClusterer;
use crate::types::NOISE;
use rstar::primitives::GeomWithData;
use rstar::{Point, RTree};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// DBSCAN parameters (the fine-grained "per-plane" profile by default).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dbscan {
    /// Neighbourhood radius, in input units.
    pub eps: f64,
    /// Minimum neighbourhood size (point itself included) for a core point.
    pub min_samples: usize,
}

impl Default for Dbscan {
    fn default() -> Self {
        Self {
            eps: 0.05,
            min_samples: 5,
        }
    }
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Cluster points of any dimension supported by `rstar`.
    pub fn cluster_points<P>(&self, points: &[P]) -> Vec<i32>
    where
        P: Point<Scalar = f64>,
    {
        let n = points.len();
        let mut labels = vec![NOISE; n];
        if n == 0 {
            return labels;
        }
        let tree = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| GeomWithData::new(p.clone(), i))
                .collect(),
        );
        let eps2 = self.eps * self.eps;
        let neighbours = |p: &P| -> Vec<usize> {
            tree.locate_within_distance(p.clone(), eps2)
                .map(|item| item.data)
                .collect()
        };

        let mut visited = vec![false; n];
        let mut cluster = 0i32;
        for i in 0..n {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            let seeds = neighbours(&points[i]);
            if seeds.len() < self.min_samples {
                continue;
            }
            labels[i] = cluster;
            let mut queue: VecDeque<usize> = seeds.into();
            while let Some(j) = queue.pop_front() {
                if labels[j] == NOISE {
                    labels[j] = cluster;
                }
                if visited[j] {
                    continue;
                }
                visited[j] = true;
                let expansion = neighbours(&points[j]);
                if expansion.len() >= self.min_samples {
                    queue.extend(expansion);
                }
            }
            cluster += 1;
        }
        relabel_by_first_appearance(&mut labels);
        labels
    }

    fn cluster_scalar(&self, values: &[f64]) -> Vec<i32> {
        let n = values.len();
        let mut labels = vec![NOISE; n];
        if n == 0 {
            return labels;
        }
        let eps = self.eps;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

        // Window [lo, hi] holds every value within eps of sorted[k].
        let mut core = vec![false; n];
        let (mut lo, mut hi) = (0usize, 0usize);
        for k in 0..n {
            while sorted[k] - sorted[lo] > eps {
                lo += 1;
            }
            hi = hi.max(k);
            while hi + 1 < n && sorted[hi + 1] - sorted[k] <= eps {
                hi += 1;
            }
            core[k] = hi - lo + 1 >= self.min_samples;
        }

        // Consecutive core points closer than eps share a cluster.
        let mut cluster_of = vec![NOISE; n];
        let mut current = NOISE;
        let mut last_core: Option<usize> = None;
        for k in 0..n {
            if !core[k] {
                continue;
            }
            match last_core {
                Some(prev) if sorted[k] - sorted[prev] <= eps => {}
                _ => current += 1,
            }
            cluster_of[k] = current;
            last_core = Some(k);
        }

        // Border points join the nearest core point within eps.
        let mut next_core: Vec<Option<usize>> = vec![None; n];
        let mut upcoming = None;
        for k in (0..n).rev() {
            if core[k] {
                upcoming = Some(k);
            }
            next_core[k] = upcoming;
        }
        let mut prev_core: Option<usize> = None;
        for k in 0..n {
            if core[k] {
                prev_core = Some(k);
                continue;
            }
            let left = prev_core.map(|c| (sorted[k] - sorted[c], c));
            let right = next_core[k].map(|c| (sorted[c] - sorted[k], c));
            let nearest = match (left, right) {
                (Some(l), Some(r)) => Some(if l.0 <= r.0 { l } else { r }),
                (l, r) => l.or(r),
            };
            if let Some((dist, c)) = nearest {
                if dist <= eps {
                    cluster_of[k] = cluster_of[c];
                }
            }
        }

        for (k, &i) in order.iter().enumerate() {
            labels[i] = cluster_of[k];
        }
        relabel_by_first_appearance(&mut labels);
        labels
    }
}

impl DensityClusterer for Dbscan {
    fn fit_predict(&self, points: &[[f64; 2]]) -> Vec<i32> {
        self.cluster_points(points)
    }

    fn fit_predict_1d(&self, values: &[f64]) -> Vec<i32> {
        self.cluster_scalar(values)
    }
}
