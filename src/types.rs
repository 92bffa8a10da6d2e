use nalgebra as na;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Point3D {
        Point3D { x, y, z }
    }

    pub fn to_na(&self) -> na::Vector3<f64> {
        na::Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_na(v: &na::Vector3<f64>) -> Point3D {
        Point3D::new(v.x, v.y, v.z)
    }

    pub fn distance(&self, other: &Point3D) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Point3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

impl From<na::Vector3<f64>> for Point3D {
    fn from(v: na::Vector3<f64>) -> Self {
        Point3D::from_na(&v)
    }
}

impl From<Point3D> for na::Vector3<f64> {
    fn from(p: Point3D) -> Self {
        p.to_na()
    }
}

/// A labeled observation coming from one sensor.
///
/// `descriptor` may be empty, in which case the feature only takes part in
/// spatial matching.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    pub position: Point3D,
    #[serde(default)]
    pub descriptor: Vec<f64>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub sensor_id: String,
}

impl Feature {
    pub fn new(
        position: Point3D,
        descriptor: Vec<f64>,
        timestamp: f64,
        sensor_id: &str,
    ) -> Feature {
        Feature {
            position,
            descriptor,
            timestamp,
            sensor_id: sensor_id.to_string(),
        }
    }

    pub fn has_descriptor(&self) -> bool {
        !self.descriptor.is_empty()
    }
}

/// `source_index` in the first set matches `target_index` in the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Correspondence {
    pub source_index: usize,
    pub target_index: usize,
}

impl Correspondence {
    pub fn new(source_index: usize, target_index: usize) -> Correspondence {
        Correspondence {
            source_index,
            target_index,
        }
    }
}

impl From<(usize, usize)> for Correspondence {
    fn from((source_index, target_index): (usize, usize)) -> Self {
        Correspondence::new(source_index, target_index)
    }
}

/// Insertion-ordered mapping keyed by sensor id.
///
/// The first inserted sensor is the implicit reference frame and the
/// iteration order decides the order of fused output.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for SensorMap<V> {
    fn default() -> Self {
        SensorMap {
            entries: Vec::new(),
        }
    }
}

impl<V> SensorMap<V> {
    pub fn new() -> SensorMap<V> {
        Self::default()
    }

    /// Inserts or replaces. A replaced entry keeps its original position.
    pub fn insert(&mut self, sensor_id: &str, value: V) -> Option<V> {
        match self.entries.iter_mut().find(|(k, _)| k == sensor_id) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.entries.push((sensor_id.to_string(), value));
                None
            }
        }
    }

    pub fn get(&self, sensor_id: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == sensor_id)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, sensor_id: &str) -> bool {
        self.get(sensor_id).is_some()
    }

    pub fn first(&self) -> Option<(&str, &V)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V> FromIterator<(String, V)> for SensorMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = SensorMap::new();
        for (k, v) in iter {
            map.insert(&k, v);
        }
        map
    }
}

impl<V> IntoIterator for SensorMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_map_keeps_insertion_order() {
        let mut map = SensorMap::new();
        map.insert("lidar", 1);
        map.insert("camera", 2);
        map.insert("radar", 3);
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["lidar", "camera", "radar"]);
        assert_eq!(map.first(), Some(("lidar", &1)));
    }

    #[test]
    fn sensor_map_replace_keeps_position() {
        let mut map = SensorMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.insert("a", 10), Some(1));
        assert_eq!(map.len(), 2);
        assert_eq!(map.first(), Some(("a", &10)));
    }

    #[test]
    fn point_distance() {
        let p0 = Point3D::new(0.0, 0.0, 0.0);
        let p1 = Point3D::new(1.0, 2.0, 2.0);
        assert!((p0.distance(&p1) - 3.0).abs() < 1e-12);
    }
}
