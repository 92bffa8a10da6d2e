use nalgebra as na;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::transformation::Transformation;
use crate::types::{Feature, Point3D, SensorMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    /// Landmarks seen by the reference sensor.
    pub landmarks: usize,
    /// How many of them the second sensor also sees.
    pub observed: usize,
    /// Features of a third sensor with no relation to the landmarks.
    pub unrelated: usize,
    pub descriptor_len: usize,
    pub unrelated_descriptor_len: usize,
    pub position_noise: f64,
    pub descriptor_noise: f64,
    /// Second sensor pose in the reference frame as axis * angle.
    pub axis_angle: [f64; 3],
    pub translation: [f64; 3],
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            landmarks: 50,
            observed: 40,
            unrelated: 30,
            descriptor_len: 128,
            unrelated_descriptor_len: 64,
            position_noise: 0.01,
            descriptor_noise: 0.01,
            axis_angle: [0.0, 0.0, 0.05],
            translation: [0.5, -0.3, 0.1],
        }
    }
}

pub struct SyntheticData {
    pub sensors: SensorMap<Vec<Feature>>,
    /// Transform taking each sensor into the reference frame.
    pub ground_truth: SensorMap<Transformation>,
}

fn random_landmark(rng: &mut ChaCha8Rng, scale: f64) -> Point3D {
    Point3D::new(
        rng.random_range(-10.0..10.0) * scale,
        rng.random_range(-5.0..5.0) * scale,
        rng.random_range(0.0..20.0) * scale,
    )
}

fn jitter(rng: &mut ChaCha8Rng, amount: f64) -> f64 {
    if amount > 0.0 {
        rng.random_range(-amount..amount)
    } else {
        0.0
    }
}

/// Generates `camera` (reference), `lidar` (same landmarks under a known pose)
/// and `radar` (unrelated) feature sets.
pub fn generate_sample_data(config: &SyntheticConfig) -> SyntheticData {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let lidar_to_camera = Transformation::from_scaled_axis(
        na::Vector3::from_column_slice(&config.axis_angle),
        na::Vector3::from_column_slice(&config.translation),
    );
    let camera_to_lidar = lidar_to_camera.inverse();

    let camera: Vec<Feature> = (0..config.landmarks)
        .map(|i| {
            let descriptor: Vec<f64> = (0..config.descriptor_len)
                .map(|_| rng.random::<f64>())
                .collect();
            Feature::new(random_landmark(&mut rng, 1.0), descriptor, i as f64 * 0.1, "camera")
        })
        .collect();

    let observed = config.observed.min(camera.len());
    let mut picked = rand::seq::index::sample(&mut rng, camera.len(), observed).into_vec();
    picked.sort_unstable();
    let lidar: Vec<Feature> = picked
        .iter()
        .enumerate()
        .map(|(k, &i)| {
            let p = camera_to_lidar.transform_point(&camera[i].position);
            let position = Point3D::new(
                p.x + jitter(&mut rng, config.position_noise),
                p.y + jitter(&mut rng, config.position_noise),
                p.z + jitter(&mut rng, config.position_noise),
            );
            let descriptor: Vec<f64> = camera[i]
                .descriptor
                .iter()
                .map(|d| d + jitter(&mut rng, config.descriptor_noise))
                .collect();
            Feature::new(position, descriptor, k as f64 * 0.1, "lidar")
        })
        .collect();

    let radar: Vec<Feature> = (0..config.unrelated)
        .map(|i| {
            let descriptor: Vec<f64> = (0..config.unrelated_descriptor_len)
                .map(|_| rng.random::<f64>())
                .collect();
            Feature::new(random_landmark(&mut rng, 1.5), descriptor, i as f64 * 0.1, "radar")
        })
        .collect();

    let mut sensors = SensorMap::new();
    sensors.insert("camera", camera);
    sensors.insert("lidar", lidar);
    sensors.insert("radar", radar);

    let mut ground_truth = SensorMap::new();
    ground_truth.insert("camera", Transformation::identity());
    ground_truth.insert("lidar", lidar_to_camera);

    SyntheticData { sensors, ground_truth }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_data() {
        let a = generate_sample_data(&SyntheticConfig::default());
        let b = generate_sample_data(&SyntheticConfig::default());
        assert_eq!(a.sensors, b.sensors);
    }

    #[test]
    fn sizes_follow_config() {
        let data = generate_sample_data(&SyntheticConfig::default());
        assert_eq!(data.sensors.get("camera").unwrap().len(), 50);
        assert_eq!(data.sensors.get("lidar").unwrap().len(), 40);
        assert_eq!(data.sensors.get("radar").unwrap()[0].descriptor.len(), 64);
    }
}
