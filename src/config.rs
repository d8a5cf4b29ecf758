//! JSON configuration for the pipeline and the demo binary.
//!
//! Every section is optional; missing keys take their defaults.
//!
//! ```json
//! {
//!   "strategy": "auto",
//!   "segmentation": { "flat_threshold": 2.0, "fine": { "eps": 0.05 } },
//!   "fit_method": "direct",
//!   "direct": { "bounds": { "c": { "lower": 0.01, "upper": 500.0 } } },
//!   "output": { "json_out": "report.json" }
//! }
//! ```

use crate::catenary::{DirectFitParams, PlanarFitParams};
use crate::error::ConfigError;
use crate::segmentation::{SegmentationParams, VolumetricParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Labelling strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationStrategy {
    /// Flat/stacked router.
    #[default]
    Auto,
    /// 3D DBSCAN over the whole cloud.
    Volumetric,
}

/// Per-wire fitting model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    /// Best-fit plane plus 2D catenary.
    #[default]
    Planar,
    /// Bounded 3D catenary along the principal direction.
    Direct,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write the pipeline report as JSON here.
    pub json_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: SegmentationStrategy,
    pub segmentation: SegmentationParams,
    pub volumetric: VolumetricParams,
    pub fit_method: FitMethod,
    pub planar: PlanarFitParams,
    pub direct: DirectFitParams,
    pub output: OutputConfig,
}

pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterSelectionMethod;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "segmentation": { "flat_threshold": 3.5, "major": { "selection_method": "leaf" } },
            "fit_method": "direct",
            "direct": { "sample_count": 100 }
        }"#;
        let cfg: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.segmentation.flat_threshold, 3.5);
        assert_eq!(cfg.segmentation.major.selection_method, ClusterSelectionMethod::Leaf);
        assert_eq!(cfg.segmentation.major.min_cluster_size, 20);
        assert_eq!(cfg.segmentation.fine.eps, 0.05);
        assert_eq!(cfg.fit_method, FitMethod::Direct);
        assert_eq!(cfg.direct.sample_count, 100);
        assert_eq!(cfg.direct.bounds.c.upper, 1000.0);
        assert_eq!(cfg.planar.sample_count, 500);
        assert_eq!(cfg.strategy, SegmentationStrategy::Auto);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/wire-config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
