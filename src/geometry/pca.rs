//! Principal-axis decomposition via the symmetric eigen-decomposition of the
//! sample covariance.
//!
//! Axis signs are fixed so that the largest-magnitude component of every axis
//! is positive, which makes projections deterministic. Callers that need a
//! particular orientation (a sagging wire opening upwards) flip axes after
//! the fit.

use nalgebra::{Matrix2, Matrix3, Point2, Point3, SymmetricEigen, Vector2, Vector3};
use std::cmp::Ordering;

/// Best-fit plane of a 3D point set: the centroid plus the two principal
/// axes, ranked by the variance they capture.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    /// Mean of the fitted points.
    pub origin: Point3<f64>,
    /// Orthonormal in-plane basis, first axis = maximum variance.
    pub axes: [Vector3<f64>; 2],
    /// Variance captured by each axis.
    pub variances: [f64; 2],
}

impl Plane {
    /// Fit the plane spanned by the two dominant principal axes.
    ///
    /// Returns `None` for an empty input.
    pub fn fit(points: &[Point3<f64>]) -> Option<Self> {
        let (origin, axes) = principal_axes_3d(points)?;
        Some(Self {
            origin,
            axes: [axes[0].1, axes[1].1],
            variances: [axes[0].0, axes[1].0],
        })
    }

    /// Reverse the second in-plane axis (and with it the normal).
    pub fn flip_secondary(&mut self) {
        self.axes[1] = -self.axes[1];
    }

    /// Unit normal (right-handed with the two in-plane axes).
    pub fn normal(&self) -> Vector3<f64> {
        self.axes[0].cross(&self.axes[1])
    }

    /// Coordinates of `p` in the plane frame (orthogonal projection).
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.origin;
        Point2::new(d.dot(&self.axes[0]), d.dot(&self.axes[1]))
    }

    pub fn project_all(&self, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        points.iter().map(|p| self.project(p)).collect()
    }

    /// Map plane coordinates back into 3D.
    pub fn unproject(&self, q: &Point2<f64>) -> Point3<f64> {
        self.origin + self.axes[0] * q.x + self.axes[1] * q.y
    }

    pub fn unproject_all(&self, points: &[Point2<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|q| self.unproject(q)).collect()
    }
}

/// Centroid and the dominant principal direction of a 3D point set.
pub fn principal_direction(points: &[Point3<f64>]) -> Option<(Point3<f64>, Vector3<f64>)> {
    let (centroid, axes) = principal_axes_3d(points)?;
    Some((centroid, axes[0].1))
}

/// Rotate 2D points onto their principal axes: column 0 of the result is the
/// coordinate along the direction of maximum spread, column 1 along the
/// orthogonal direction. Coordinates are relative to the centroid.
pub fn principal_rotation_2d(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    if points.is_empty() {
        return Vec::new();
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    let centroid = Vector2::new(sx / n, sy / n);

    let mut cov = Matrix2::zeros();
    for p in points {
        let d = Vector2::new(p[0], p[1]) - centroid;
        cov += d * d.transpose();
    }
    cov /= dof(points.len());

    let eig = SymmetricEigen::new(cov);
    let (first, second) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let a0 = orient2(eig.eigenvectors.column(first).into_owned());
    let a1 = orient2(eig.eigenvectors.column(second).into_owned());

    points
        .iter()
        .map(|p| {
            let d = Vector2::new(p[0], p[1]) - centroid;
            [d.dot(&a0), d.dot(&a1)]
        })
        .collect()
}

/// Centroid and all three principal axes as `(variance, axis)` sorted by
/// descending variance.
fn principal_axes_3d(points: &[Point3<f64>]) -> Option<(Point3<f64>, [(f64, Vector3<f64>); 3])> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    let centroid = Point3::from(sum / n);

    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - centroid;
        cov += d * d.transpose();
    }
    cov /= dof(points.len());

    let eig = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(Ordering::Equal)
    });
    let axis = |k: usize| {
        let idx = order[k];
        (
            eig.eigenvalues[idx].max(0.0),
            orient3(eig.eigenvectors.column(idx).into_owned()),
        )
    };
    Some((centroid, [axis(0), axis(1), axis(2)]))
}

fn dof(n: usize) -> f64 {
    if n > 1 {
        (n - 1) as f64
    } else {
        1.0
    }
}

fn orient3(v: Vector3<f64>) -> Vector3<f64> {
    let v = v.normalize();
    if v[v.iamax()] < 0.0 {
        -v
    } else {
        v
    }
}

fn orient2(v: Vector2<f64>) -> Vector2<f64> {
    let v = v.normalize();
    if v[v.iamax()] < 0.0 {
        -v
    } else {
        v
    }
}
