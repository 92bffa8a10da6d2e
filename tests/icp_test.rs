use approx::assert_relative_eq;
use nalgebra as na;
use proptest::prelude::*;
use sensor_feature_alignment::optimization::solve_rigid_transform;
use sensor_feature_alignment::{AlignError, ClosestPointAligner, IcpState, Point3D, Transformation};

fn cube() -> Vec<Point3D> {
    let mut points = Vec::new();
    for x in [0.0, 1.0] {
        for y in [0.0, 1.5] {
            for z in [0.0, 2.0] {
                points.push(Point3D::new(x, y, z));
            }
        }
    }
    points
}

fn apply(t: &Transformation, points: &[Point3D]) -> Vec<Point3D> {
    points.iter().map(|p| t.transform_point(p)).collect()
}

#[test]
fn test_identical_sets_converge_in_one_iteration() {
    let points = cube();
    let result = ClosestPointAligner::default().align(&points, &points).unwrap();
    assert_eq!(result.state, IcpState::Converged);
    assert_eq!(result.iterations, 1);
    assert!(result.transform.is_identity(1e-9));
    assert!(result.mean_squared_error < 1e-12);
}

#[test]
fn test_recovers_small_translation() {
    let source = cube();
    let target = apply(&Transformation::from_translation(0.1, 0.05, -0.05), &source);
    let result = ClosestPointAligner::default().align(&source, &target).unwrap();

    assert_eq!(result.state, IcpState::Converged);
    assert_relative_eq!(
        result.transform.translation,
        na::Vector3::new(0.1, 0.05, -0.05),
        epsilon = 1e-9
    );
    assert_relative_eq!(result.transform.rotation, na::Matrix3::identity(), epsilon = 1e-9);
}

#[test]
fn test_recovers_small_rotation() {
    let source = cube();
    let truth = Transformation::from_scaled_axis(
        na::Vector3::new(0.02, -0.03, 0.05),
        na::Vector3::new(0.05, 0.0, 0.1),
    );
    let target = apply(&truth, &source);
    let result = ClosestPointAligner::default().align(&source, &target).unwrap();

    assert_relative_eq!(result.transform.rotation, truth.rotation, epsilon = 1e-9);
    assert_relative_eq!(result.transform.translation, truth.translation, epsilon = 1e-9);
    assert!(result.mean_squared_error < 1e-12);
}

#[test]
fn test_iteration_cap_reports_exhausted() {
    let source = cube();
    let target = apply(&Transformation::from_translation(0.1, 0.05, -0.05), &source);
    let result = ClosestPointAligner::new(1, 1e-6).align(&source, &target).unwrap();
    assert_eq!(result.state, IcpState::Exhausted);
    assert_eq!(result.iterations, 1);
    // one exact step is enough here, the cap only stops the convergence check
    assert_relative_eq!(
        result.transform.translation,
        na::Vector3::new(0.1, 0.05, -0.05),
        epsilon = 1e-9
    );
}

#[test]
fn test_initial_guess_is_part_of_result() {
    let source = cube();
    let truth = Transformation::from_scaled_axis(
        na::Vector3::new(0.0, 0.0, 1.2),
        na::Vector3::new(3.0, -4.0, 1.0),
    );
    let target = apply(&truth, &source);
    let result = ClosestPointAligner::default().align_from(&source, &target, &truth).unwrap();
    assert_eq!(result.state, IcpState::Converged);
    assert_eq!(result.iterations, 1);
    assert_relative_eq!(result.transform.rotation, truth.rotation, epsilon = 1e-9);
    assert_relative_eq!(result.transform.translation, truth.translation, epsilon = 1e-9);
}

#[test]
fn test_empty_input_is_insufficient_data() {
    let aligner = ClosestPointAligner::default();
    let err = aligner.align(&[], &cube()).unwrap_err();
    assert_eq!(
        err,
        AlignError::InsufficientData {
            source_len: 0,
            target_len: 8
        }
    );
    assert!(matches!(aligner.align(&cube(), &[]), Err(AlignError::InsufficientData { .. })));
}

#[test]
fn test_collinear_points_are_degenerate() {
    let line: Vec<Point3D> = (0..5).map(|i| Point3D::new(i as f64, 0.0, 0.0)).collect();
    let err = ClosestPointAligner::default().align(&line, &line).unwrap_err();
    assert!(matches!(err, AlignError::DegenerateGeometry(_)));
}

#[test]
fn test_single_point_is_degenerate() {
    let p = vec![Point3D::new(1.0, 2.0, 3.0)];
    let q = vec![Point3D::new(2.0, 2.0, 3.0)];
    let err = ClosestPointAligner::default().align(&p, &q).unwrap_err();
    assert!(matches!(err, AlignError::DegenerateGeometry(_)));
}

#[test]
fn test_non_finite_point_is_degenerate() {
    let mut source = cube();
    source[0].x = f64::NAN;
    let err = ClosestPointAligner::default().align(&source, &cube()).unwrap_err();
    assert!(matches!(err, AlignError::DegenerateGeometry(_)));
}

#[test]
fn test_tiny_scale_cloud_is_aligned() {
    let source: Vec<Point3D> = cube()
        .iter()
        .map(|p| Point3D::new(p.x * 1e-9, p.y * 1e-9, p.z * 1e-9))
        .collect();
    let target = apply(&Transformation::from_translation(1e-10, 0.0, 0.0), &source);
    let result = ClosestPointAligner::default().align(&source, &target).unwrap();
    assert!(result.transform.is_proper_rotation(1e-9));
    assert_relative_eq!(result.transform.translation.x, 1e-10, epsilon = 1e-15);
}

#[test]
fn test_kabsch_never_returns_reflection() {
    // mirror image across z = 0; the best proper rotation is returned instead
    let source: Vec<na::Vector3<f64>> = cube().iter().map(Point3D::to_na).collect();
    let target: Vec<na::Vector3<f64>> = source
        .iter()
        .map(|p| na::Vector3::new(p.x, p.y, -p.z))
        .collect();
    let t = solve_rigid_transform(&source, &target).unwrap();
    assert!(t.is_proper_rotation(1e-9));
}

fn point_strategy() -> impl Strategy<Value = Point3D> {
    (-10.0..10.0f64, -10.0..10.0f64, -10.0..10.0f64).prop_map(|(x, y, z)| Point3D::new(x, y, z))
}

proptest! {
    #[test]
    fn prop_icp_rotation_is_proper(
        source in prop::collection::vec(point_strategy(), 4..30),
        axis_angle in (-3.0..3.0f64, -3.0..3.0f64, -3.0..3.0f64),
        translation in (-5.0..5.0f64, -5.0..5.0f64, -5.0..5.0f64),
    ) {
        let truth = Transformation::from_scaled_axis(
            na::Vector3::new(axis_angle.0, axis_angle.1, axis_angle.2),
            na::Vector3::new(translation.0, translation.1, translation.2),
        );
        let target = apply(&truth, &source);
        // degenerate correspondence sets are a valid outcome for arbitrary poses
        if let Ok(result) = ClosestPointAligner::new(20, 1e-6).align(&source, &target) {
            prop_assert!(result.transform.is_proper_rotation(1e-6));
            prop_assert!(result.mean_squared_error.is_finite());
        }
    }
}
