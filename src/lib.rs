#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod catenary;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod segmentation;
pub mod types;

// Building blocks – public, but considered lower-level.
pub mod cluster;
pub mod geometry;
pub mod optimize;

// --- High-level re-exports -------------------------------------------------

// Main entry points: pipeline, inputs and configuration.
pub use crate::config::{load_config, FitMethod, PipelineConfig, SegmentationStrategy};
pub use crate::pipeline::WirePipeline;
pub use crate::types::{PointCloud, Topology, NOISE};

// Errors.
pub use crate::error::{ConfigError, FitError, WireError};

// Per-stage entry points.
pub use crate::catenary::{
    fit_all, fit_catenary_2d, BatchFitReport, CatenaryParams, DirectWireFitter, PlanarWireFitter,
    WireFitFailure, WireFitRecord, WireFitter,
};
pub use crate::diagnostics::{PipelineReport, PipelineStage, TimingBreakdown};
pub use crate::segmentation::{classify_topology, Segmentation, SegmentationParams, WireSegmenter};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use wire_catenary::prelude::*;
///
/// # fn main() -> Result<(), WireError> {
/// let cloud = PointCloud::try_from_rows(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.1]])?;
/// let labels = WireSegmenter::default().segment(&cloud);
/// let report = fit_all(&cloud, &labels, &PlanarWireFitter::default())?;
/// println!("fitted={} failed={}", report.records.len(), report.failures.len());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::catenary::{fit_all, DirectWireFitter, PlanarWireFitter, WireFitter};
    pub use crate::{PipelineConfig, PointCloud, Topology, WireError, WirePipeline, WireSegmenter};
}
