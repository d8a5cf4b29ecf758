//! Error types.
//!
//! Two families with different propagation rules:
//! - [`WireError`] covers structural problems with the whole input (shape,
//!   non-finite coordinates, misaligned labels). These are fatal and are
//!   returned to the caller immediately.
//! - [`FitError`] describes why a single wire could not be fitted. The batch
//!   fitter records it next to the wire label and moves on.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal input errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    /// A row did not carry exactly three coordinates.
    #[error("expected an N×3 point array, row {row} has {len} columns")]
    InputShape { row: usize, len: usize },

    /// A matrix input did not have exactly three columns.
    #[error("expected an N×3 point array, got {rows}×{cols}")]
    MatrixShape { rows: usize, cols: usize },

    /// A coordinate was NaN or infinite.
    #[error("coordinate {axis} of point {index} is not finite")]
    NonFinite { index: usize, axis: usize },

    /// The label array is not aligned with the point cloud.
    #[error("label array has {labels} entries for {points} points")]
    LabelMismatch { points: usize, labels: usize },
}

/// Per-wire fitting failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum FitError {
    /// Too few points or degenerate geometry for a stable fit.
    #[error("fit precondition failed: {0}")]
    Precondition(String),

    /// The solver stopped without converging, or converged to an invalid
    /// curve (non-positive curvature scale).
    #[error("fit did not converge: {0}")]
    Convergence(String),
}

impl FitError {
    pub(crate) fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }

    pub(crate) fn convergence(reason: impl Into<String>) -> Self {
        Self::Convergence(reason.into())
    }
}

/// Failure to load a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
