//! Serializable run reports.

use crate::catenary::{WireFitFailure, WireFitRecord};
use crate::config::{FitMethod, SegmentationStrategy};
use crate::segmentation::GroupSummary;
use crate::types::Topology;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Stages a [`crate::WirePipeline`] run goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    /// Labelling points; items are input points.
    Segmentation,
    /// Fitting every labelled wire; items are wires attempted.
    Fitting,
}

/// Wall time and workload of one stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub elapsed_ms: f64,
    pub items: usize,
}

/// Per-stage timings of one run, in execution order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    /// Close a stage that began at `started`.
    pub fn record(&mut self, stage: PipelineStage, started: Instant, items: usize) {
        self.stages.push(StageTiming {
            stage,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            items,
        });
    }

    pub fn stage_ms(&self, stage: PipelineStage) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.elapsed_ms)
    }

    /// Items handled per second by `stage`; `None` if the stage was not
    /// recorded or took no measurable time.
    pub fn throughput(&self, stage: PipelineStage) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .filter(|s| s.elapsed_ms > 0.0)
            .map(|s| s.items as f64 / (s.elapsed_ms / 1000.0))
    }
}

/// Everything one pipeline run produced.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// `None` when the volumetric strategy bypassed the router.
    pub topology: Option<Topology>,
    pub strategy: SegmentationStrategy,
    pub fit_method: FitMethod,
    /// One label per input point.
    pub labels: Vec<i32>,
    pub wire_count: usize,
    pub noise_count: usize,
    /// Layer summaries of a stacked scene.
    pub groups: Vec<GroupSummary>,
    pub records: Vec<WireFitRecord>,
    pub failures: Vec<WireFitFailure>,
    pub timing: TimingBreakdown,
}
