use log::trace;

use crate::types::{Correspondence, Feature};

/// Pairs features between two sets without assuming any known transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMatcher {
    pub ratio_threshold: f64,
    pub max_matches: usize,
    /// Radius used by [`match_nearby`](Self::match_nearby).
    pub max_distance: f64,
}

impl Default for FeatureMatcher {
    fn default() -> Self {
        Self {
            ratio_threshold: 0.7,
            max_matches: 1000,
            max_distance: 5.0,
        }
    }
}

fn descriptor_distance(d0: &[f64], d1: &[f64]) -> f64 {
    d0.iter()
        .zip(d1)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt()
}

impl FeatureMatcher {
    pub fn new(ratio_threshold: f64, max_matches: usize) -> FeatureMatcher {
        FeatureMatcher {
            ratio_threshold,
            max_matches,
            ..Default::default()
        }
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> FeatureMatcher {
        self.max_distance = max_distance;
        self
    }

    /// Descriptor matching with the nearest / second-nearest ratio test.
    ///
    /// Only features carrying a descriptor take part, and only descriptors of
    /// equal length are compared. Returned indices point
    /// into `features1` and `features2` themselves, sources ascending,
    /// truncated to `max_matches`.
    ///
    /// When only one candidate exists in `features2` there is no second
    /// distance, so the match is kept when `best < ratio_threshold`, an
    /// absolute distance. This fallback is intentional.
    pub fn match_by_descriptor(
        &self,
        features1: &[Feature],
        features2: &[Feature],
    ) -> Vec<Correspondence> {
        let candidates: Vec<(usize, &[f64])> = features2
            .iter()
            .enumerate()
            .filter(|(_, f)| f.has_descriptor())
            .map(|(j, f)| (j, f.descriptor.as_slice()))
            .collect();
        if candidates.is_empty() || !features1.iter().any(Feature::has_descriptor) {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (i, f1) in features1.iter().enumerate() {
            if matches.len() >= self.max_matches {
                break;
            }
            if !f1.has_descriptor() {
                continue;
            }
            let mut dists: Vec<(usize, f64)> = candidates
                .iter()
                .filter(|(_, d)| d.len() == f1.descriptor.len())
                .map(|(j, d)| (*j, descriptor_distance(&f1.descriptor, d)))
                .collect();
            if dists.is_empty() {
                continue;
            }
            // stable sort keeps the lower index first on ties
            dists.sort_by(|a, b| a.1.total_cmp(&b.1));

            let (best_j, best_dist) = dists[0];
            let accepted = match dists.get(1) {
                Some(&(_, second_dist)) => best_dist < self.ratio_threshold * second_dist,
                None => best_dist < self.ratio_threshold,
            };
            if accepted {
                matches.push(Correspondence::new(i, best_j));
            }
        }
        trace!(
            "descriptor matching: {} x {} -> {} matches",
            features1.len(),
            features2.len(),
            matches.len()
        );
        matches
    }

    /// Nearest target by position, kept only when strictly closer than
    /// `max_distance`.
    ///
    /// Several sources may claim the same target.
    pub fn match_by_proximity(
        &self,
        features1: &[Feature],
        features2: &[Feature],
        max_distance: f64,
    ) -> Vec<Correspondence> {
        let mut matches = Vec::new();
        for (i, f1) in features1.iter().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (j, f2) in features2.iter().enumerate() {
                let dist = f1.position.distance(&f2.position);
                if dist < max_distance && best.is_none_or(|(_, d)| dist < d) {
                    best = Some((j, dist));
                }
            }
            if let Some((j, _)) = best {
                matches.push(Correspondence::new(i, j));
            }
        }
        trace!(
            "proximity matching within {}: {} -> {} matches",
            max_distance,
            features1.len(),
            matches.len()
        );
        matches
    }

    /// [`match_by_proximity`](Self::match_by_proximity) with the configured radius.
    pub fn match_nearby(
        &self,
        features1: &[Feature],
        features2: &[Feature],
    ) -> Vec<Correspondence> {
        self.match_by_proximity(features1, features2, self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3D;

    fn feat(x: f64, desc: Vec<f64>) -> Feature {
        Feature::new(Point3D::new(x, 0.0, 0.0), desc, 0.0, "s")
    }

    #[test]
    fn descriptor_distance_is_euclidean() {
        assert!((descriptor_distance(&[0.0, 3.0], &[4.0, 0.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn ambiguous_match_is_rejected() {
        let matcher = FeatureMatcher::default();
        let f1 = vec![feat(0.0, vec![0.5, 0.5])];
        let f2 = vec![feat(0.0, vec![0.0, 0.5]), feat(1.0, vec![1.0, 0.5])];
        assert!(matcher.match_by_descriptor(&f1, &f2).is_empty());
    }

    #[test]
    fn proximity_tie_takes_lowest_index() {
        let matcher = FeatureMatcher::default();
        let f1 = vec![feat(0.0, vec![])];
        let f2 = vec![feat(1.0, vec![]), feat(-1.0, vec![])];
        let m = matcher.match_by_proximity(&f1, &f2, 5.0);
        assert_eq!(m, vec![Correspondence::new(0, 0)]);
    }
}
