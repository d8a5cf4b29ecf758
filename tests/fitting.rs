mod common;

use approx::assert_abs_diff_eq;
use common::synthetic_wires::{catenary_2d, flat_scene, sloped_span, tilted_catenary};
use nalgebra::Point3;
use wire_catenary::catenary::CurveParams;
use wire_catenary::catenary::{DirectFitParams, PlanarFitParams};
use wire_catenary::optimize::{LevenbergMarquardt, LmParams};
use wire_catenary::{
    fit_all, fit_catenary_2d, DirectWireFitter, FitError, PlanarWireFitter, PointCloud, NOISE,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn catenary_2d_round_trip() {
    init_logger();
    let points = catenary_2d(1.0, 0.0, 2.0, -5.0, 5.0, 100);
    let fit = fit_catenary_2d(&points, 500, None, &LevenbergMarquardt::default())
        .expect("exact catenary samples must fit");
    assert_abs_diff_eq!(fit.params.x0, 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(fit.params.y0, 0.0, epsilon = 1e-3);
    assert_abs_diff_eq!(fit.params.c, 2.0, epsilon = 1e-3);
    assert!(
        fit.residual_rmse < 1e-6,
        "residual rmse too large: {:.3e}",
        fit.residual_rmse
    );
    assert_eq!(fit.curve.len(), 500);
    assert!(fit.curve.windows(2).all(|w| w[1].x > w[0].x));
}

#[test]
fn batch_reports_failures_without_aborting() {
    init_logger();
    let scene = flat_scene();
    let mut points: Vec<Point3<f64>> = scene.points()[..400].to_vec();
    points.push(Point3::new(20.0, 20.0, 0.0));
    points.push(Point3::new(21.0, 20.0, 0.0));
    points.push(Point3::new(40.0, 40.0, 40.0));
    let mut labels = vec![0; 200];
    labels.extend(vec![1; 200]);
    labels.extend([2, 2, NOISE]);
    let cloud = PointCloud::new(points);

    let report = fit_all(&cloud, &labels, &PlanarWireFitter::default()).expect("labels aligned");
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.records.iter().map(|r| r.label).collect::<Vec<_>>(),
        vec![0, 1]
    );
    let failure = &report.failures[0];
    assert_eq!(failure.label, 2);
    assert_eq!(failure.point_count, 2);
    assert!(matches!(failure.error, FitError::Precondition(_)));
    for record in &report.records {
        assert_eq!(record.points.len(), 200);
        assert_eq!(record.curve.len(), 500);
        let rmse = record.rmse.expect("rmse enabled by default");
        assert!(rmse < 0.05, "wire {} rmse={rmse:.4}", record.label);
    }
}

#[test]
fn planar_and_direct_fits_agree_on_a_clean_wire() {
    init_logger();
    let points = tilted_catenary(300);

    let planar = PlanarWireFitter::default().fit(&points).expect("planar fit");
    let direct = DirectWireFitter::default().fit(&points).expect("direct fit");

    let planar_rmse = planar.rmse.unwrap();
    let direct_rmse = direct.rmse.unwrap();
    assert!(planar_rmse < 0.02, "planar rmse={planar_rmse:.4}");
    assert!(direct_rmse < 0.02, "direct rmse={direct_rmse:.4}");

    let relative = (planar.params.c - direct.params.c).abs() / planar.params.c;
    assert!(
        relative < 0.05,
        "curvature mismatch: planar c={:.4} direct c={:.4}",
        planar.params.c,
        direct.params.c
    );
    assert_abs_diff_eq!(planar.params.c, 3.0, epsilon = 1e-3);
}

#[test]
fn records_expose_tagged_parameters() {
    let points = tilted_catenary(100);
    let labels = vec![4; points.len()];
    let cloud = PointCloud::new(points);

    let planar = fit_all(&cloud, &labels, &PlanarWireFitter::default()).unwrap();
    assert!(matches!(planar.records[0].params, CurveParams::Planar(_)));
    let direct = fit_all(&cloud, &labels, &DirectWireFitter::default()).unwrap();
    assert!(matches!(direct.records[0].params, CurveParams::Spatial(_)));
    assert_eq!(direct.records[0].label, 4);
}

#[test]
fn long_horizontal_spans_keep_their_curvature() {
    init_logger();
    for half in [12.0, 15.0, 25.0] {
        let points = sloped_span(50.0, half, 0.0, 300);
        let fit = PlanarWireFitter::default()
            .fit(&points)
            .unwrap_or_else(|e| panic!("half span {half}: {e}"));
        assert!(
            (fit.params.c - 50.0).abs() < 0.05,
            "half span {half}: c={:.4}",
            fit.params.c
        );
        let rmse = fit.rmse.unwrap();
        assert!(rmse < 0.05, "half span {half}: rmse={rmse:.4}");
    }
}

#[test]
fn sloped_span_fits_in_the_chord_frame() {
    init_logger();
    for slope in [20.0f64, 30.0, 60.0] {
        let half = if slope > 45.0 { 5.0 } else { 10.0 };
        let points = sloped_span(50.0, half, slope, 300);
        let fit = PlanarWireFitter::default()
            .fit(&points)
            .unwrap_or_else(|e| panic!("slope {slope}: {e}"));
        // Curvature seen along the chord: c / cos³(slope).
        let expected = 50.0 / slope.to_radians().cos().powi(3);
        assert!(
            (fit.params.c - expected).abs() / expected < 0.15,
            "slope {slope}: c={:.3}, expected about {expected:.3}",
            fit.params.c
        );
        let rmse = fit.rmse.unwrap();
        assert!(rmse < 0.1, "slope {slope}: rmse={rmse:.4}");
    }
}

#[test]
fn direct_fit_rejects_a_wire_along_y() {
    init_logger();
    let points: Vec<Point3<f64>> = sloped_span(30.0, 8.0, 0.0, 200)
        .into_iter()
        .map(|p| Point3::new(p.y, p.x, p.z))
        .collect();
    let err = DirectWireFitter::default().fit(&points).unwrap_err();
    assert!(matches!(err, FitError::Precondition(_)), "{err}");
}

#[test]
fn unconverged_fits_are_reported_as_failures() {
    init_logger();
    let points = tilted_catenary(150);
    let planar = PlanarWireFitter::new(PlanarFitParams {
        solver: LmParams {
            max_iterations: Some(1),
            ..Default::default()
        },
        ..Default::default()
    });
    let err = planar.fit(&points).unwrap_err();
    assert!(matches!(err, FitError::Convergence(_)), "{err}");

    let mut direct_params = DirectFitParams::default();
    direct_params.minimizer.max_iterations = 1;
    let err = DirectWireFitter::new(direct_params).fit(&points).unwrap_err();
    assert!(matches!(err, FitError::Convergence(_)), "{err}");

    let labels = vec![0; points.len()];
    let report = fit_all(&PointCloud::new(points), &labels, &planar).unwrap();
    assert!(report.records.is_empty());
    assert!(matches!(report.failures[0].error, FitError::Convergence(_)));
}
