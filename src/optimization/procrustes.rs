use nalgebra as na;

use crate::error::{AlignError, Result};
use crate::transformation::Transformation;

/// Relative size of the second singular value below which the
/// cross-covariance is treated as rank deficient (collinear or coincident).
const RANK_EPS: f64 = 1e-10;

pub fn centroid(points: &[na::Vector3<f64>]) -> na::Vector3<f64> {
    if points.is_empty() {
        return na::Vector3::zeros();
    }
    points.iter().sum::<na::Vector3<f64>>() / points.len() as f64
}

/// Least-squares rigid transform taking `source[k]` onto `target[k]` (Kabsch).
///
/// `H = Σ (s - s̄)(t - t̄)^T = U Σ V^T`, `R = V U^T`. When `det(R) < 0` the
/// column of `V` belonging to the smallest singular value is negated so `R`
/// is never a reflection. `t = t̄ - R s̄`.
pub fn solve_rigid_transform(
    source: &[na::Vector3<f64>],
    target: &[na::Vector3<f64>],
) -> Result<Transformation> {
    if source.is_empty() || target.is_empty() {
        return Err(AlignError::InsufficientData {
            source_len: source.len(),
            target_len: target.len(),
        });
    }
    if source.len() != target.len() {
        return Err(AlignError::DegenerateGeometry(format!(
            "paired sets differ in size: {} vs {}",
            source.len(),
            target.len()
        )));
    }

    if source.iter().chain(target).any(|p| !p.iter().all(|c| c.is_finite())) {
        return Err(AlignError::DegenerateGeometry("non-finite point coordinates".to_string()));
    }

    let src_centroid = centroid(source);
    let tgt_centroid = centroid(target);

    let mut h = na::Matrix3::<f64>::zeros();
    for (s, t) in source.iter().zip(target) {
        h += (s - src_centroid) * (t - tgt_centroid).transpose();
    }

    let svd = na::SVD::try_new(h, true, true, f64::EPSILON, 0)
        .ok_or_else(|| AlignError::DegenerateGeometry("svd did not converge".to_string()))?;

    let mut sigma: Vec<f64> = svd.singular_values.iter().copied().collect();
    sigma.sort_by(|a, b| b.total_cmp(a));
    // relative rank test, NaN fails it
    if !(sigma[0] > 0.0 && sigma[1] > RANK_EPS * sigma[0]) {
        return Err(AlignError::DegenerateGeometry(format!(
            "cross-covariance rank deficient, singular values {:?}",
            sigma
        )));
    }

    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(AlignError::DegenerateGeometry("svd returned no basis".to_string()));
    };

    let mut v = v_t.transpose();
    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        let smallest = svd.singular_values.imin();
        v.column_mut(smallest).neg_mut();
        rotation = v * u.transpose();
    }
    let translation = tgt_centroid - rotation * src_centroid;

    Ok(Transformation::new(rotation, translation))
}
