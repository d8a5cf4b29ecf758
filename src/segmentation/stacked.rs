//! Two-stage segmentation for wires arranged in vertical layers.
//!
//! Stage 1 groups points into layers by clustering a vertical cross-section.
//! Stage 2 splits every layer into wires with [`segment_flat`]. Local wire
//! labels are shifted by a running offset so ids never collide across
//! layers; the offset only grows by the number of wires a layer produced.

use super::flat::segment_flat;
use super::CrossSection;
use crate::cluster::{densify, indices_by_label, DensityClusterer};
use crate::types::NOISE;
use log::debug;
use nalgebra::Point3;
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How one layer contributed to the final labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    /// Stage-1 label of the layer.
    pub major_label: i32,
    pub point_count: usize,
    /// Offset added to this layer's local wire labels.
    pub label_offset: i32,
    /// Wires found in the layer.
    pub wire_count: usize,
}

/// Output of [`segment_stacked`].
#[derive(Clone, Debug, PartialEq)]
pub struct StackedLabels {
    pub labels: Vec<i32>,
    pub major_labels: Vec<i32>,
    pub groups: Vec<GroupSummary>,
}

/// Label wires arranged in layers.
pub fn segment_stacked<F, M>(
    points: &[Point3<f64>],
    fine: &F,
    major: &M,
    cross_section: CrossSection,
) -> StackedLabels
where
    F: DensityClusterer + Sync + ?Sized,
    M: DensityClusterer + ?Sized,
{
    let section: Vec<[f64; 2]> = points.iter().map(|p| cross_section.project(p)).collect();
    let major_labels = major.fit_predict(&section);
    let layers: Vec<(i32, Vec<usize>)> = indices_by_label(&major_labels).into_iter().collect();
    debug!(
        "HierarchicalClustering: n={} layers={} stage1_noise={}",
        points.len(),
        layers.len(),
        major_labels.iter().filter(|&&l| l == NOISE).count()
    );

    let split = |(major_label, idx): (i32, Vec<usize>)| {
        let subset: Vec<Point3<f64>> = idx.iter().map(|&i| points[i]).collect();
        let local = segment_flat(&subset, fine);
        (major_label, idx, local)
    };
    #[cfg(feature = "parallel")]
    let split_layers: Vec<_> = layers.into_par_iter().map(split).collect();
    #[cfg(not(feature = "parallel"))]
    let split_layers: Vec<_> = layers.into_iter().map(split).collect();

    // Offsets depend on every earlier layer, so the merge stays sequential.
    let mut labels = vec![NOISE; points.len()];
    let mut groups = Vec::with_capacity(split_layers.len());
    let mut offset = 0i32;
    for (major_label, idx, local) in split_layers {
        let (dense, wire_count) = densify(&local);
        for (&i, &l) in idx.iter().zip(&dense) {
            if l != NOISE {
                labels[i] = l + offset;
            }
        }
        debug!(
            "HierarchicalClustering: layer {} n={} wires={} offset={}",
            major_label,
            idx.len(),
            wire_count,
            offset
        );
        groups.push(GroupSummary {
            major_label,
            point_count: idx.len(),
            label_offset: offset,
            wire_count,
        });
        offset += wire_count as i32;
    }

    StackedLabels {
        labels,
        major_labels,
        groups,
    }
}
