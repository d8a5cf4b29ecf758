use nalgebra::Point3;
use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use wire_catenary::{load_config, PipelineConfig, PointCloud, WirePipeline};

/// Three side-by-side wires sagging over a 10 m span.
fn synthetic_scene() -> PointCloud {
    let mut points = Vec::new();
    for wire in 0..3 {
        let offset = wire as f64 * 0.3;
        for i in 0..200 {
            let x = -5.0 + i as f64 * 0.05;
            let jitter = ((i as f64 * 12.9898 + offset).sin() * 43758.5453).fract() * 0.005;
            points.push(Point3::new(x, offset + jitter, 8.0 * ((x / 8.0).cosh() - 1.0)));
        }
    }
    PointCloud::new(points)
}

fn main() -> ExitCode {
    env_logger::init();

    // Demo stub: optional JSON config as the only argument, synthetic input.
    let config = match env::args().nth(1) {
        Some(path) => match load_config(Path::new(&path)) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::default(),
    };
    let json_out = config.output.json_out.clone();

    let pipeline = WirePipeline::new(config);
    let report = match pipeline.process(&synthetic_scene()) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("pipeline failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "topology={:?} wires={} noise={} total_ms={:.3}",
        report.topology, report.wire_count, report.noise_count, report.timing.total_ms
    );
    for record in &report.records {
        println!(
            "wire {:>3}: n={:>5} c={:>10.4} rmse={}",
            record.label,
            record.points.len(),
            record.params.curvature(),
            record
                .rmse
                .map(|r| format!("{r:.5}"))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    for failure in &report.failures {
        println!(
            "wire {:>3}: n={:>5} failed: {}",
            failure.label, failure.point_count, failure.error
        );
    }

    if let Some(path) = json_out {
        let written = serde_json::to_string_pretty(&report)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(err) = written {
            eprintln!("failed to write {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
