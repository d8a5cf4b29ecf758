mod common;

use common::synthetic_wires::{flat_scene, stacked_scene};
use std::fs;
use wire_catenary::{
    load_config, FitMethod, PipelineConfig, PipelineStage, SegmentationStrategy, Topology,
    WirePipeline,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn flat_scene_end_to_end() {
    init_logger();
    let cloud = flat_scene();
    let report = WirePipeline::default()
        .process(&cloud)
        .expect("valid cloud");

    assert_eq!(report.topology, Some(Topology::Flat));
    assert_eq!(report.labels.len(), cloud.len());
    assert_eq!(report.wire_count, 3);
    assert_eq!(report.noise_count, 0);
    assert_eq!(report.records.len(), 3, "failures: {:?}", report.failures);
    assert!(report.failures.is_empty());
    for record in &report.records {
        let c = record.params.curvature();
        assert!(
            (c - 8.0).abs() / 8.0 < 0.05,
            "wire {} c={c:.3}, expected about 8",
            record.label
        );
    }
    assert!(report.timing.stage_ms(PipelineStage::Segmentation).is_some());
    assert!(report.timing.stage_ms(PipelineStage::Fitting).is_some());
    assert_eq!(report.timing.stages[0].items, cloud.len());
    assert_eq!(report.timing.stages[1].items, 3);
}

#[test]
fn stacked_scene_end_to_end() {
    init_logger();
    let cloud = stacked_scene();
    let report = WirePipeline::default()
        .process(&cloud)
        .expect("valid cloud");
    assert_eq!(report.topology, Some(Topology::Stacked));
    assert_eq!(report.wire_count, 6);
    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.records.len() + report.failures.len(), 6);
    let labels: Vec<i32> = report
        .records
        .iter()
        .map(|r| r.label)
        .chain(report.failures.iter().map(|f| f.label))
        .collect();
    let mut sorted = labels.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..6).collect::<Vec<_>>());
}

#[test]
fn direct_method_and_volumetric_strategy_are_selectable() {
    init_logger();
    let config = PipelineConfig {
        strategy: SegmentationStrategy::Volumetric,
        fit_method: FitMethod::Direct,
        ..Default::default()
    };
    let cloud = stacked_scene();
    let report = WirePipeline::new(config).process(&cloud).expect("valid cloud");
    assert_eq!(report.topology, None);
    assert_eq!(report.fit_method, FitMethod::Direct);
    assert_eq!(report.wire_count, 2);
    assert_eq!(report.records.len() + report.failures.len(), 2);
}

#[test]
fn report_serializes_to_json() {
    let report = WirePipeline::default().process(&flat_scene()).unwrap();
    let json = serde_json::to_value(&report).expect("report is serializable");
    assert_eq!(json["wireCount"], 3);
    assert_eq!(json["topology"], "flat");
    assert_eq!(json["records"][0]["params"]["model"], "planar");
}

#[test]
fn config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("wire-catenary-config-{}.json", std::process::id()));
    fs::write(
        &path,
        r#"{ "fit_method": "direct", "segmentation": { "flat_threshold": 1.5 } }"#,
    )
    .unwrap();
    let config = load_config(&path).expect("config parses");
    let _ = fs::remove_file(&path);
    assert_eq!(config.fit_method, FitMethod::Direct);
    assert_eq!(config.segmentation.flat_threshold, 1.5);
    assert_eq!(config.planar.sample_count, 500);
}

#[test]
fn malformed_config_is_a_parse_error() {
    let path = std::env::temp_dir().join(format!("wire-catenary-bad-{}.json", std::process::id()));
    fs::write(&path, "{ not json").unwrap();
    let err = load_config(&path).unwrap_err();
    let _ = fs::remove_file(&path);
    assert!(matches!(err, wire_catenary::ConfigError::Parse { .. }));
}
