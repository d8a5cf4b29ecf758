//! End-to-end wire extraction: segmentation followed by per-wire fitting.
//!
//! Typical usage:
//! ```no_run
//! use wire_catenary::{PipelineConfig, PointCloud, WirePipeline};
//!
//! # fn example(cloud: PointCloud) -> Result<(), wire_catenary::WireError> {
//! let pipeline = WirePipeline::new(PipelineConfig::default());
//! let report = pipeline.process(&cloud)?;
//! for record in &report.records {
//!     println!("wire {} c={:.3}", record.label, record.params.curvature());
//! }
//! # Ok(())
//! # }
//! ```

use crate::catenary::{fit_all, BatchFitReport, DirectWireFitter, PlanarWireFitter, WireFitter};
use crate::config::{FitMethod, PipelineConfig, SegmentationStrategy};
use crate::diagnostics::{PipelineReport, PipelineStage, TimingBreakdown};
use crate::error::WireError;
use crate::segmentation::{segment_volumetric, Segmentation, WireSegmenter};
use crate::types::{PointCloud, NOISE};
use log::info;
use std::time::Instant;

pub struct WirePipeline {
    config: PipelineConfig,
    segmenter: WireSegmenter,
    planar: PlanarWireFitter,
    direct: DirectWireFitter,
}

impl WirePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            segmenter: WireSegmenter::new(config.segmentation),
            planar: PlanarWireFitter::new(config.planar),
            direct: DirectWireFitter::new(config.direct),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn fitter(&self) -> &dyn WireFitter {
        match self.config.fit_method {
            FitMethod::Planar => &self.planar,
            FitMethod::Direct => &self.direct,
        }
    }

    /// Label every point with the configured strategy.
    pub fn segment(&self, cloud: &PointCloud) -> Segmentation {
        match self.config.strategy {
            SegmentationStrategy::Auto => self.segmenter.segment_detailed(cloud),
            SegmentationStrategy::Volumetric => {
                let labels = segment_volumetric(cloud.points(), &self.config.volumetric);
                Segmentation {
                    topology: self.segmenter.classify_topology(cloud),
                    labels,
                    major_labels: None,
                    groups: Vec::new(),
                }
            }
        }
    }

    /// Fit every labelled wire with the configured method.
    pub fn fit(&self, cloud: &PointCloud, labels: &[i32]) -> Result<BatchFitReport, WireError> {
        fit_all(cloud, labels, self.fitter())
    }

    /// Segment and fit, returning labels, records, failures and timings.
    pub fn process(&self, cloud: &PointCloud) -> Result<PipelineReport, WireError> {
        let total_start = Instant::now();
        let mut timing = TimingBreakdown::default();

        let seg_start = Instant::now();
        let segmentation = self.segment(cloud);
        timing.record(PipelineStage::Segmentation, seg_start, cloud.len());

        let fit_start = Instant::now();
        let batch = self.fit(cloud, &segmentation.labels)?;
        timing.record(PipelineStage::Fitting, fit_start, batch.attempted());
        timing.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;

        let wire_count = segmentation.wire_count();
        let noise_count = segmentation.labels.iter().filter(|&&l| l == NOISE).count();
        info!(
            "WirePipeline: n={} strategy={:?} topology={:?} wires={} noise={} fitted={} failed={} total_ms={:.2}",
            cloud.len(),
            self.config.strategy,
            segmentation.topology,
            wire_count,
            noise_count,
            batch.records.len(),
            batch.failures.len(),
            timing.total_ms
        );

        let topology = match self.config.strategy {
            SegmentationStrategy::Auto => Some(segmentation.topology),
            SegmentationStrategy::Volumetric => None,
        };
        Ok(PipelineReport {
            topology,
            strategy: self.config.strategy,
            fit_method: self.config.fit_method,
            labels: segmentation.labels,
            wire_count,
            noise_count,
            groups: segmentation.groups,
            records: batch.records,
            failures: batch.failures,
            timing,
        })
    }
}

impl Default for WirePipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
