//! Core data types shared by segmentation and fitting.

use crate::error::WireError;
use nalgebra::{DMatrix, Point3};
use serde::{Deserialize, Serialize};

/// Label reserved for points that belong to no wire.
pub const NOISE: i32 = -1;

/// Validated point cloud: `N` finite 3D points.
///
/// Point order has no meaning beyond index correspondence with label arrays.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PointCloud {
    points: Vec<Point3<f64>>,
}

impl PointCloud {
    /// Wrap already-typed points. Non-finite coordinates are not checked here;
    /// use [`PointCloud::try_new`] when the source is untrusted.
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Wrap points, rejecting NaN or infinite coordinates.
    pub fn try_new(points: Vec<Point3<f64>>) -> Result<Self, WireError> {
        check_finite(&points)?;
        Ok(Self { points })
    }

    /// Build from row-major rows that must each hold exactly three values.
    pub fn try_from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, WireError> {
        let mut points = Vec::with_capacity(rows.len());
        for (row, values) in rows.iter().enumerate() {
            match values.as_ref() {
                [x, y, z] => points.push(Point3::new(*x, *y, *z)),
                other => {
                    return Err(WireError::InputShape {
                        row,
                        len: other.len(),
                    })
                }
            }
        }
        Self::try_new(points)
    }

    /// Build from an `N×3` matrix (one point per row).
    pub fn try_from_matrix(matrix: &DMatrix<f64>) -> Result<Self, WireError> {
        if matrix.ncols() != 3 {
            return Err(WireError::MatrixShape {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            });
        }
        let points = matrix
            .row_iter()
            .map(|row| Point3::new(row[0], row[1], row[2]))
            .collect();
        Self::try_new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    /// Values of one coordinate axis (0 = x, 1 = y, 2 = z).
    pub fn axis_values(&self, axis: usize) -> Vec<f64> {
        self.points.iter().map(|p| p[axis]).collect()
    }

    /// Copy of the points at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Vec<Point3<f64>> {
        indices.iter().map(|&i| self.points[i]).collect()
    }
}

impl From<Vec<Point3<f64>>> for PointCloud {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self::new(points)
    }
}

fn check_finite(points: &[Point3<f64>]) -> Result<(), WireError> {
    for (index, p) in points.iter().enumerate() {
        if let Some(axis) = (0..3).find(|&axis| !p[axis].is_finite()) {
            return Err(WireError::NonFinite { index, axis });
        }
    }
    Ok(())
}

/// Vertical arrangement of the wires in a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// All wires at roughly the same height.
    Flat,
    /// Wires arranged in vertical layers.
    Stacked,
}
