mod common;

use common::synthetic_wires::{assert_one_label_per_wire, flat_scene, stacked_scene};
use nalgebra::Point3;
use std::collections::BTreeSet;
use wire_catenary::cluster::distinct_labels;
use wire_catenary::segmentation::{segment_flat, segment_volumetric, VolumetricParams};
use wire_catenary::{classify_topology, PointCloud, Topology, WireSegmenter, NOISE};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn flat_scene_is_split_into_three_wires() {
    init_logger();
    let cloud = flat_scene();
    let segmenter = WireSegmenter::default();
    assert_eq!(segmenter.classify_topology(&cloud), Topology::Flat);

    let labels = segmenter.segment(&cloud);
    assert_eq!(labels.len(), cloud.len(), "one label per point");
    assert_eq!(distinct_labels(&labels), vec![0, 1, 2]);
    assert_one_label_per_wire(&labels, 3, 200);
}

#[test]
fn stacked_scene_gets_collision_free_labels() {
    init_logger();
    let cloud = stacked_scene();
    let seg = WireSegmenter::default().segment_detailed(&cloud);
    assert_eq!(seg.topology, Topology::Stacked);
    assert_eq!(seg.labels.len(), cloud.len());

    let majors = seg.major_labels.as_ref().expect("stacked scenes keep stage-1 labels");
    assert_eq!(distinct_labels(majors).len(), 2, "expected two layers");
    assert_eq!(seg.groups.len(), 2);
    assert_eq!(seg.groups[0].label_offset, 0);
    assert_eq!(seg.groups[1].label_offset, seg.groups[0].wire_count as i32);

    assert_eq!(seg.wire_count(), 6);
    assert_eq!(distinct_labels(&seg.labels), (0..6).collect::<Vec<_>>());
    assert_one_label_per_wire(&seg.labels, 6, 200);

    // Wires of one layer never share a label with the other layer.
    let lower: BTreeSet<i32> = seg.labels[..600].iter().copied().collect();
    let upper: BTreeSet<i32> = seg.labels[600..].iter().copied().collect();
    assert!(lower.is_disjoint(&upper));
}

#[test]
fn label_sets_partition_the_points() {
    let cloud = flat_scene();
    let labels = WireSegmenter::default().segment(&cloud);
    let mut covered = 0;
    for label in distinct_labels(&labels) {
        covered += labels.iter().filter(|&&l| l == label).count();
    }
    let noise = labels.iter().filter(|&&l| l == NOISE).count();
    assert_eq!(covered + noise, cloud.len());
}

#[test]
fn topology_boundary_is_exclusive_on_the_flat_side() {
    // p5(z) = 0 and p95(z) = 2 for these 21 values.
    let mut z = vec![-5.0, 0.0];
    z.extend(std::iter::repeat(1.0).take(17));
    z.extend([2.0, 9.0]);
    let cloud = PointCloud::new(
        z.iter()
            .enumerate()
            .map(|(i, &z)| Point3::new(i as f64, 0.0, z))
            .collect(),
    );
    assert_eq!(classify_topology(&cloud, 2.0), Topology::Stacked);
    assert_eq!(classify_topology(&cloud, 2.5), Topology::Flat);
}

#[test]
fn flat_strategy_ignores_height() {
    // Same footprint, one wire lifted by 50 units: still one cluster per wire.
    let cloud = flat_scene();
    let mut points = cloud.into_points();
    for p in &mut points[..200] {
        p.z += 50.0;
    }
    let labels = segment_flat(&points, &wire_catenary::cluster::Dbscan::default());
    assert_one_label_per_wire(&labels, 3, 200);
}

#[test]
fn volumetric_strategy_separates_layers() {
    let cloud = stacked_scene();
    let labels = segment_volumetric(cloud.points(), &VolumetricParams::default());
    assert_eq!(labels.len(), cloud.len());
    // Wires of one layer are 0.3 apart, inside eps, so each layer is one cluster.
    let lower: BTreeSet<i32> = labels[..600].iter().copied().collect();
    let upper: BTreeSet<i32> = labels[600..].iter().copied().collect();
    assert_eq!(lower.len(), 1);
    assert_eq!(upper.len(), 1);
    assert_ne!(lower, upper);
}
