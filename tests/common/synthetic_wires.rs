use nalgebra::{Point2, Point3};
use wire_catenary::PointCloud;

/// Deterministic pseudo-random offset in `(-amp, amp)`.
pub fn jitter(i: usize, seed: f64, amp: f64) -> f64 {
    amp * ((i as f64 * 12.9898 + seed * 78.233).sin() * 43758.5453).fract()
}

/// `count` evenly spaced values over `[lo, hi]`.
pub fn span(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    assert!(count >= 2, "need at least two samples");
    let step = (hi - lo) / (count - 1) as f64;
    (0..count).map(|i| lo + step * i as f64).collect()
}

pub fn catenary(x: f64, x0: f64, y0: f64, c: f64) -> f64 {
    y0 + c * (((x - x0) / c).cosh() - 1.0)
}

/// Exact samples of a 2D catenary.
pub fn catenary_2d(x0: f64, y0: f64, c: f64, lo: f64, hi: f64, count: usize) -> Vec<Point2<f64>> {
    span(lo, hi, count)
        .into_iter()
        .map(|x| Point2::new(x, catenary(x, x0, y0, c)))
        .collect()
}

/// Three wires side by side: running along x over `[-5, 5]`, 0.3 apart in y,
/// sagging in z with `c = 8`. 200 points per wire; points of wire `k` occupy
/// indices `200·k .. 200·(k + 1)`.
pub fn flat_scene() -> PointCloud {
    let mut points = Vec::new();
    for wire in 0..3 {
        let y = wire as f64 * 0.3;
        for (i, x) in span(-5.0, 5.0, 200).into_iter().enumerate() {
            points.push(Point3::new(
                x,
                y + jitter(i, wire as f64, 0.005),
                catenary(x, 0.0, 0.0, 8.0) + jitter(i, wire as f64 + 0.5, 0.005),
            ));
        }
    }
    PointCloud::new(points)
}

/// Two layers of three wires each. Wires run along y over `[0, 10]`, 0.3
/// apart in x, sag in z with `c = 10`; layers sit at z = 0 and z = 6.
/// 200 points per wire, wire `k` at indices `200·k .. 200·(k + 1)`, layer 0
/// first.
pub fn stacked_scene() -> PointCloud {
    let mut points = Vec::new();
    for layer in 0..2 {
        for wire in 0..3 {
            let seed = (layer * 3 + wire) as f64;
            let x = wire as f64 * 0.3;
            let base = layer as f64 * 6.0;
            for (i, y) in span(0.0, 10.0, 200).into_iter().enumerate() {
                points.push(Point3::new(
                    x + jitter(i, seed, 0.003),
                    y,
                    base + catenary(y, 5.0, 0.0, 10.0) + jitter(i, seed + 0.5, 0.02),
                ));
            }
        }
    }
    PointCloud::new(points)
}

/// Noiseless catenary in the vertical plane spanned by `(1, 0, 0.3)` and y,
/// with the sag along y: `y = 3·(cosh(s/3) − 1)` for `s ∈ [−3, 3]`.
pub fn tilted_catenary(count: usize) -> Vec<Point3<f64>> {
    let norm = (1.0f64 + 0.09).sqrt();
    span(-3.0, 3.0, count)
        .into_iter()
        .map(|s| Point3::new(s / norm, catenary(s, 0.0, 0.0, 3.0), 0.3 * s / norm))
        .collect()
}

/// Wire along x over `[-half, half]` in the plane y = 2, sagging in z with
/// scale `c` and tilted by `slope_deg`: `z = c·(cosh(x/c) − 1) + x·tan(slope)`.
pub fn sloped_span(c: f64, half: f64, slope_deg: f64, count: usize) -> Vec<Point3<f64>> {
    let tan = slope_deg.to_radians().tan();
    span(-half, half, count)
        .into_iter()
        .map(|x| Point3::new(x, 2.0, catenary(x, 0.0, 0.0, c) + x * tan))
        .collect()
}

/// All points of wire `k` share one non-noise label, and no two wires share
/// a label.
pub fn assert_one_label_per_wire(labels: &[i32], wires: usize, per_wire: usize) {
    let mut seen = Vec::new();
    for k in 0..wires {
        let wire = &labels[k * per_wire..(k + 1) * per_wire];
        assert!(wire[0] >= 0, "wire {k} labelled as noise");
        assert!(
            wire.iter().all(|&l| l == wire[0]),
            "wire {k} split across labels: {:?}",
            wire.iter().collect::<std::collections::BTreeSet<_>>()
        );
        assert!(!seen.contains(&wire[0]), "label {} reused by wire {k}", wire[0]);
        seen.push(wire[0]);
    }
}
