use serde::{Deserialize, Serialize};

use crate::matcher::FeatureMatcher;
use crate::optimization::IcpParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Nearest / second-nearest descriptor distance ratio.
    pub ratio_threshold: f64,
    pub max_matches: usize,
    /// Matches needed before a rigid fit is attempted.
    pub min_correspondences: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Radius used when scoring alignment quality.
    pub quality_radius: f64,
    /// Default radius of spatial matching.
    pub proximity_radius: f64,
    pub sample_seed: u64,
    /// Align sensors on the rayon pool.
    pub parallel: bool,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: 0.7,
            max_matches: 1000,
            min_correspondences: 3,
            max_iterations: 50,
            tolerance: 1e-6,
            quality_radius: 2.0,
            proximity_radius: 5.0,
            sample_seed: 42,
            parallel: true,
        }
    }
}

impl AlignerConfig {
    pub fn matcher(&self) -> FeatureMatcher {
        FeatureMatcher::new(self.ratio_threshold, self.max_matches)
            .with_max_distance(self.proximity_radius)
    }

    pub fn icp_params(&self) -> IcpParams {
        IcpParams {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: AlignerConfig = serde_json::from_str(r#"{"max_iterations": 10}"#).unwrap();
        assert_eq!(cfg.max_iterations, 10);
        assert_eq!(cfg.min_correspondences, 3);
        assert_eq!(cfg.tolerance, 1e-6);
    }
}
