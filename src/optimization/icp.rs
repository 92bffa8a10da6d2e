use log::debug;
use nalgebra as na;

use super::procrustes::solve_rigid_transform;
use crate::error::{AlignError, Result};
use crate::transformation::Transformation;
use crate::types::{Correspondence, Point3D};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcpParams {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
        }
    }
}

/// Terminal state of one ICP run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IcpState {
    /// Error change dropped below tolerance.
    Converged,
    /// Iteration cap reached first. The transform is still the best found.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcpResult {
    pub transform: Transformation,
    pub state: IcpState,
    pub iterations: usize,
    pub mean_squared_error: f64,
}

/// Point-to-point ICP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosestPointAligner {
    pub params: IcpParams,
}

/// Brute-force nearest target for every source point. Ties go to the lowest
/// target index.
pub fn nearest_neighbors(
    source: &[na::Vector3<f64>],
    target: &[na::Vector3<f64>],
) -> Vec<Correspondence> {
    source
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            let mut best: Option<(usize, f64)> = None;
            for (j, t) in target.iter().enumerate() {
                let d = (s - t).norm_squared();
                if best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((j, d));
                }
            }
            best.map(|(j, _)| Correspondence::new(i, j))
        })
        .collect()
}

/// Mean squared distance over `correspondences`, zero when there are none.
pub fn mean_squared_error(
    source: &[na::Vector3<f64>],
    target: &[na::Vector3<f64>],
    correspondences: &[Correspondence],
) -> f64 {
    if correspondences.is_empty() {
        return 0.0;
    }
    let sum: f64 = correspondences
        .iter()
        .map(|c| (source[c.source_index] - target[c.target_index]).norm_squared())
        .sum();
    sum / correspondences.len() as f64
}

impl ClosestPointAligner {
    pub fn new(max_iterations: usize, tolerance: f64) -> ClosestPointAligner {
        ClosestPointAligner {
            params: IcpParams {
                max_iterations,
                tolerance,
            },
        }
    }

    pub fn with_params(params: IcpParams) -> ClosestPointAligner {
        ClosestPointAligner { params }
    }

    /// Estimates the transform taking `source` onto `target`, starting from identity.
    pub fn align(&self, source: &[Point3D], target: &[Point3D]) -> Result<IcpResult> {
        self.align_from(source, target, &Transformation::identity())
    }

    /// Same as [`align`](Self::align) with `initial` applied to `source`
    /// before the first correspondence search. The returned transform
    /// includes `initial`.
    pub fn align_from(
        &self,
        source: &[Point3D],
        target: &[Point3D],
        initial: &Transformation,
    ) -> Result<IcpResult> {
        if source.is_empty() || target.is_empty() {
            return Err(AlignError::InsufficientData {
                source_len: source.len(),
                target_len: target.len(),
            });
        }
        let target: Vec<na::Vector3<f64>> = target.iter().map(Point3D::to_na).collect();
        let mut current: Vec<na::Vector3<f64>> = source
            .iter()
            .map(|p| initial.transform_vector(&p.to_na()))
            .collect();
        let mut cumulative = *initial;

        let mut prev_error = None;
        let mut error = 0.0;
        let mut iterations = 0;
        let mut state = IcpState::Exhausted;

        for iter in 0..self.params.max_iterations {
            iterations = iter + 1;

            let correspondences = nearest_neighbors(&current, &target);
            let prev = match prev_error {
                Some(e) => e,
                None => mean_squared_error(&current, &target, &correspondences),
            };

            let (src, tgt): (Vec<_>, Vec<_>) = correspondences
                .iter()
                .map(|c| (current[c.source_index], target[c.target_index]))
                .unzip();
            let incremental = solve_rigid_transform(&src, &tgt)?;

            for p in current.iter_mut() {
                *p = incremental.transform_vector(p);
            }
            cumulative = cumulative.then(&incremental);

            error = mean_squared_error(&current, &target, &correspondences);
            debug!("icp iteration {}: mse {:.9} (previous {:.9})", iterations, error, prev);
            if (prev - error).abs() < self.params.tolerance {
                state = IcpState::Converged;
                break;
            }
            prev_error = Some(error);
        }
        if iterations == 0 {
            error = mean_squared_error(&current, &target, &nearest_neighbors(&current, &target));
        }
        debug!(
            "icp finished: {:?} after {} iterations, mse {:.9}",
            state, iterations, error
        );

        Ok(IcpResult {
            transform: cumulative,
            state,
            iterations,
            mean_squared_error: error,
        })
    }
}
