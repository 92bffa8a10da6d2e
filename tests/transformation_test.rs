use approx::assert_relative_eq;
use nalgebra as na;
use sensor_feature_alignment::{Point3D, Transformation};

fn rotated(angle: f64, t: (f64, f64, f64)) -> Transformation {
    Transformation::from_scaled_axis(
        na::Vector3::new(0.3, -0.2, 0.9).normalize() * angle,
        na::Vector3::new(t.0, t.1, t.2),
    )
}

#[test]
fn test_identity_is_neutral() {
    let p = Point3D::new(1.5, -2.0, 3.25);
    assert_eq!(Transformation::identity().transform_point(&p), p);
    assert_eq!(Transformation::default(), Transformation::identity());
    assert!(Transformation::identity().is_identity(0.0));
}

#[test]
fn test_transform_point_applies_rotation_then_translation() {
    // 90 degrees around z
    let t = Transformation::from_scaled_axis(
        na::Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        na::Vector3::new(1.0, 2.0, 3.0),
    );
    let q = t.transform_point(&Point3D::new(1.0, 0.0, 0.0));
    assert_relative_eq!(q.x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(q.y, 3.0, epsilon = 1e-12);
    assert_relative_eq!(q.z, 3.0, epsilon = 1e-12);
}

#[test]
fn test_composition_applies_self_first() {
    let a = rotated(0.4, (1.0, 0.0, -2.0));
    let b = rotated(-1.1, (0.5, 3.0, 0.25));
    let c = a.then(&b);

    assert_relative_eq!(c.rotation, b.rotation * a.rotation, epsilon = 1e-12);
    assert_relative_eq!(c.translation, b.rotation * a.translation + b.translation, epsilon = 1e-12);

    let p = Point3D::new(-0.7, 2.2, 4.0);
    let expected = b.transform_point(&a.transform_point(&p));
    let got = c.transform_point(&p);
    assert_relative_eq!(got.to_na(), expected.to_na(), epsilon = 1e-12);
}

#[test]
fn test_inverse_undoes_transform() {
    let t = rotated(2.0, (4.0, -1.0, 0.3));
    let p = Point3D::new(0.1, 0.2, 0.3);
    let back = t.inverse().transform_point(&t.transform_point(&p));
    assert_relative_eq!(back.to_na(), p.to_na(), epsilon = 1e-12);
    assert!(t.then(&t.inverse()).is_identity(1e-12));
}

#[test]
fn test_matrix_and_row_major_forms_agree() {
    let t = rotated(0.8, (1.0, 2.0, 3.0));
    let m = t.to_matrix();
    assert_relative_eq!(m[(3, 3)], 1.0);
    assert_relative_eq!(m.fixed_view::<3, 3>(0, 0).into_owned(), t.rotation);
    assert_relative_eq!(Transformation::from_matrix(&m).translation, t.translation);

    let (r, tr) = t.to_row_major();
    // row-major: second entry is row 0, column 1
    assert_eq!(r[1], t.rotation[(0, 1)]);
    assert_eq!(tr, [1.0, 2.0, 3.0]);
    assert_eq!(Transformation::from_row_major(&r, &tr), t);
}

#[test]
fn test_proper_rotation_check() {
    assert!(rotated(1.3, (0.0, 0.0, 0.0)).is_proper_rotation(1e-9));
    let mirror = Transformation::new(
        na::Matrix3::from_diagonal(&na::Vector3::new(1.0, 1.0, -1.0)),
        na::Vector3::zeros(),
    );
    assert!(!mirror.is_proper_rotation(1e-9));
    let scaled = Transformation::new(na::Matrix3::identity() * 2.0, na::Vector3::zeros());
    assert!(!scaled.is_proper_rotation(1e-9));
}
