use nalgebra as na;

use crate::types::Point3D;

/// Rigid 3D transform: `p' = rotation * p + translation`.
///
/// `rotation` is expected to be orthonormal with determinant +1. Values
/// produced by this crate always satisfy that; values built by hand through
/// [`Transformation::new`] or [`Transformation::from_matrix`] are taken as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation {
    pub rotation: na::Matrix3<f64>,
    pub translation: na::Vector3<f64>,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    pub fn new(rotation: na::Matrix3<f64>, translation: na::Vector3<f64>) -> Transformation {
        Transformation {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Transformation {
        Transformation::new(na::Matrix3::identity(), na::Vector3::zeros())
    }

    pub fn from_translation(x: f64, y: f64, z: f64) -> Transformation {
        Transformation::new(na::Matrix3::identity(), na::Vector3::new(x, y, z))
    }

    /// Rotation given as axis * angle (radians), then translation.
    pub fn from_scaled_axis(
        axis_angle: na::Vector3<f64>,
        translation: na::Vector3<f64>,
    ) -> Transformation {
        let rot = na::Rotation3::from_scaled_axis(axis_angle);
        Transformation::new(rot.into_inner(), translation)
    }

    pub fn transform_point(&self, p: &Point3D) -> Point3D {
        Point3D::from_na(&self.transform_vector(&p.to_na()))
    }

    pub fn transform_vector(&self, v: &na::Vector3<f64>) -> na::Vector3<f64> {
        self.rotation * v + self.translation
    }

    /// Inverse `(R^T, -R^T t)`.
    ///
    /// Only meaningful when `rotation` is orthonormal; for any other matrix the
    /// result is not the inverse map.
    pub fn inverse(&self) -> Transformation {
        let inv_rotation = self.rotation.transpose();
        let inv_translation = -(inv_rotation * self.translation);
        Transformation::new(inv_rotation, inv_translation)
    }

    /// `self` applied first, then `next`.
    ///
    /// Rotation is `next.R * self.R` and translation is `next.R * self.t + next.t`.
    pub fn then(&self, next: &Transformation) -> Transformation {
        Transformation::new(
            next.rotation * self.rotation,
            next.rotation * self.translation + next.translation,
        )
    }

    /// 4x4 homogeneous matrix.
    pub fn to_matrix(&self) -> na::Matrix4<f64> {
        let mut m = na::Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    /// Reads the upper 3x4 block of a homogeneous matrix; the last row is ignored.
    pub fn from_matrix(m: &na::Matrix4<f64>) -> Transformation {
        let rotation: na::Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let translation: na::Vector3<f64> = m.fixed_view::<3, 1>(0, 3).into_owned();
        Transformation::new(rotation, translation)
    }

    /// Rotation as 9 row-major values and translation as 3 values.
    pub fn to_row_major(&self) -> ([f64; 9], [f64; 3]) {
        let r = &self.rotation;
        (
            [
                r[(0, 0)],
                r[(0, 1)],
                r[(0, 2)],
                r[(1, 0)],
                r[(1, 1)],
                r[(1, 2)],
                r[(2, 0)],
                r[(2, 1)],
                r[(2, 2)],
            ],
            [self.translation.x, self.translation.y, self.translation.z],
        )
    }

    pub fn from_row_major(rotation: &[f64; 9], translation: &[f64; 3]) -> Transformation {
        Transformation::new(
            na::Matrix3::from_row_slice(rotation),
            na::Vector3::from_column_slice(translation),
        )
    }

    /// True when `R R^T ≈ I` and `det(R) ≈ +1` within `tolerance`.
    pub fn is_proper_rotation(&self, tolerance: f64) -> bool {
        let orthonormal_err = (self.rotation * self.rotation.transpose() - na::Matrix3::identity())
            .abs()
            .max();
        let det_err = (self.rotation.determinant() - 1.0).abs();
        orthonormal_err < tolerance && det_err < tolerance
    }

    pub fn is_identity(&self, eps: f64) -> bool {
        (self.rotation - na::Matrix3::identity()).abs().max() <= eps
            && self.translation.abs().max() <= eps
    }
}
