use log::{debug, info, warn};
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::AlignerConfig;
use crate::error::{AlignError, Result};
use crate::matcher::FeatureMatcher;
use crate::optimization::{ClosestPointAligner, IcpResult, IcpState, solve_rigid_transform};
use crate::transformation::Transformation;
use crate::types::{Feature, Point3D, SensorMap};

/// How a sensor obtained its transform.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentOutcome {
    /// The sensor defines the reference frame.
    Reference,
    Aligned {
        correspondences: usize,
        iterations: usize,
        state: IcpState,
        mean_squared_error: f64,
    },
    /// Alignment could not be done; the transform is identity.
    Fallback(AlignError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    pub sensor_id: String,
    pub transform: Transformation,
    pub outcome: AlignmentOutcome,
}

impl AlignmentResult {
    fn fallback(sensor_id: &str, err: AlignError) -> AlignmentResult {
        AlignmentResult {
            sensor_id: sensor_id.to_string(),
            transform: Transformation::identity(),
            outcome: AlignmentOutcome::Fallback(err),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, AlignmentOutcome::Fallback(_))
    }
}

/// Aligns every sensor onto the first one and fuses their features.
///
/// Transforms from the last [`align_sensor_data`](Self::align_sensor_data)
/// call are cached and reused by fusion and quality scoring.
#[derive(Debug, Clone, Default)]
pub struct MultiSensorAligner {
    config: AlignerConfig,
    matcher: FeatureMatcher,
    icp: ClosestPointAligner,
    reference: Option<String>,
    results: SensorMap<AlignmentResult>,
}

/// Copies of `features` with positions mapped through `transform`.
pub fn transform_features(features: &[Feature], transform: &Transformation) -> Vec<Feature> {
    features
        .iter()
        .map(|f| Feature {
            position: transform.transform_point(&f.position),
            ..f.clone()
        })
        .collect()
}

/// Up to `sample_size` features drawn without replacement, in their original order.
fn sample_features(features: &[Feature], sample_size: usize, rng: &mut ChaCha8Rng) -> Vec<Feature> {
    if features.len() <= sample_size {
        return features.to_vec();
    }
    let mut indices = rand::seq::index::sample(rng, features.len(), sample_size).into_vec();
    indices.sort_unstable();
    indices.into_iter().map(|i| features[i].clone()).collect()
}

impl MultiSensorAligner {
    pub fn new(config: AlignerConfig) -> MultiSensorAligner {
        MultiSensorAligner {
            matcher: config.matcher(),
            icp: ClosestPointAligner::with_params(config.icp_params()),
            config,
            reference: None,
            results: SensorMap::new(),
        }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    pub fn reference_sensor(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn results(&self) -> &SensorMap<AlignmentResult> {
        &self.results
    }

    pub fn transform(&self, sensor_id: &str) -> Option<&Transformation> {
        self.results.get(sensor_id).map(|r| &r.transform)
    }

    pub fn transforms(&self) -> SensorMap<Transformation> {
        self.results
            .iter()
            .map(|(id, r)| (id.to_string(), r.transform))
            .collect()
    }

    /// Matches `features` against the reference by descriptor, seeds with the
    /// closed-form fit of the matched pairs and refines with ICP.
    fn align_to_reference(
        &self,
        reference: &[Feature],
        features: &[Feature],
    ) -> Result<(usize, IcpResult)> {
        let descriptor_len = |fs: &[Feature]| {
            fs.iter()
                .find(|f| f.has_descriptor())
                .map(|f| f.descriptor.len())
        };
        let lens = (descriptor_len(reference), descriptor_len(features));
        if let (Some(expected), Some(found)) = lens {
            if expected != found {
                return Err(AlignError::DescriptorDimension { expected, found });
            }
        }
        let matches = self.matcher.match_by_descriptor(reference, features);
        if matches.len() < self.config.min_correspondences {
            return Err(AlignError::InsufficientCorrespondences {
                found: matches.len(),
                required: self.config.min_correspondences,
            });
        }
        let (ref_points, sensor_points): (Vec<Point3D>, Vec<Point3D>) = matches
            .iter()
            .map(|c| (reference[c.source_index].position, features[c.target_index].position))
            .unzip();

        let ref_vecs: Vec<na::Vector3<f64>> = ref_points.iter().map(Point3D::to_na).collect();
        let sensor_vecs: Vec<na::Vector3<f64>> = sensor_points.iter().map(Point3D::to_na).collect();
        let initial = solve_rigid_transform(&sensor_vecs, &ref_vecs)?;

        let result = self.icp.align_from(&sensor_points, &ref_points, &initial)?;
        Ok((matches.len(), result))
    }

    /// Computes one transform per sensor mapping it into the first sensor's frame.
    ///
    /// Never fails: a sensor that cannot be aligned gets identity and the
    /// reason is kept in [`results`](Self::results).
    pub fn align_sensor_data(
        &mut self,
        sensor_features: &SensorMap<Vec<Feature>>,
    ) -> SensorMap<Transformation> {
        self.reference = None;
        self.results.clear();
        let Some((reference_id, reference_features)) = sensor_features.first() else {
            return SensorMap::new();
        };

        let this = &*self;
        let others: Vec<(&str, &Vec<Feature>)> = sensor_features.iter().skip(1).collect();
        let attempts: Vec<(&str, Result<(usize, IcpResult)>)> = if self.config.parallel {
            others
                .par_iter()
                .map(|(id, features)| (*id, this.align_to_reference(reference_features, features)))
                .collect()
        } else {
            others
                .iter()
                .map(|(id, features)| (*id, this.align_to_reference(reference_features, features)))
                .collect()
        };

        let mut results = SensorMap::new();
        results.insert(
            reference_id,
            AlignmentResult {
                sensor_id: reference_id.to_string(),
                transform: Transformation::identity(),
                outcome: AlignmentOutcome::Reference,
            },
        );
        for (sensor_id, attempt) in attempts {
            let result = match attempt {
                Ok((correspondences, icp)) => {
                    info!(
                        "{} aligned to {}: {} matches, {:?} after {} iterations, mse {:.6}",
                        sensor_id,
                        reference_id,
                        correspondences,
                        icp.state,
                        icp.iterations,
                        icp.mean_squared_error
                    );
                    AlignmentResult {
                        sensor_id: sensor_id.to_string(),
                        transform: icp.transform,
                        outcome: AlignmentOutcome::Aligned {
                            correspondences,
                            iterations: icp.iterations,
                            state: icp.state,
                            mean_squared_error: icp.mean_squared_error,
                        },
                    }
                }
                Err(err @ AlignError::InsufficientCorrespondences { .. }) => {
                    warn!("{}: {}, using identity", sensor_id, err);
                    AlignmentResult::fallback(sensor_id, err)
                }
                Err(err) => {
                    warn!("aligning {} failed: {}, using identity", sensor_id, err);
                    AlignmentResult::fallback(sensor_id, err)
                }
            };
            results.insert(sensor_id, result);
        }

        self.reference = Some(reference_id.to_string());
        self.results = results;
        self.transforms()
    }

    /// Concatenates every sensor's features mapped through `transforms`.
    /// Sensors without a transform pass through unchanged.
    pub fn fuse_with_transforms(
        sensor_features: &SensorMap<Vec<Feature>>,
        transforms: &SensorMap<Transformation>,
    ) -> Vec<Feature> {
        let mut fused = Vec::with_capacity(sensor_features.values().map(Vec::len).sum());
        for (sensor_id, features) in sensor_features.iter() {
            match transforms.get(sensor_id) {
                Some(t) => fused.extend(transform_features(features, t)),
                None => {
                    debug!("no transform for {}, fusing untransformed", sensor_id);
                    fused.extend(features.iter().cloned());
                }
            }
        }
        fused
    }

    /// Fuses with the cached transforms, aligning first when none are cached.
    pub fn fuse_aligned_features(
        &mut self,
        sensor_features: &SensorMap<Vec<Feature>>,
    ) -> Vec<Feature> {
        if self.results.is_empty() {
            self.align_sensor_data(sensor_features);
        }
        Self::fuse_with_transforms(sensor_features, &self.transforms())
    }

    /// Mean residual against the reference sensor's features per non-reference sensor.
    ///
    /// Up to `sample_size` features of each sensor are transformed and matched
    /// by proximity within `quality_radius`. Sensors without a cached transform
    /// or without any match score `f64::INFINITY`.
    pub fn evaluate_alignment_quality(
        &self,
        sensor_features: &SensorMap<Vec<Feature>>,
        sample_size: usize,
    ) -> SensorMap<f64> {
        let mut quality = SensorMap::new();
        let cached_reference = self
            .reference
            .as_deref()
            .filter(|r| sensor_features.contains_key(r));
        let reference_id = match cached_reference {
            Some(r) => r,
            None => match sensor_features.first() {
                Some((r, _)) => r,
                None => return quality,
            },
        };
        let reference_features = sensor_features
            .get(reference_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for (sensor_id, features) in sensor_features.iter() {
            if sensor_id == reference_id {
                continue;
            }
            let Some(transform) = self.transform(sensor_id) else {
                quality.insert(sensor_id, f64::INFINITY);
                continue;
            };
            let mut rng = ChaCha8Rng::seed_from_u64(self.config.sample_seed);
            let sampled = sample_features(features, sample_size, &mut rng);
            let transformed = transform_features(&sampled, transform);
            let matches = self
                .matcher
                .match_by_proximity(&transformed, reference_features, self.config.quality_radius);
            let score = if matches.is_empty() {
                f64::INFINITY
            } else {
                matches
                    .iter()
                    .map(|c| {
                        transformed[c.source_index]
                            .position
                            .distance(&reference_features[c.target_index].position)
                    })
                    .sum::<f64>()
                    / matches.len() as f64
            };
            debug!("{}: {} matches, average error {:.6}", sensor_id, matches.len(), score);
            quality.insert(sensor_id, score);
        }
        quality
    }
}
