use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::io::{object_from_json, object_to_json};
use crate::types::{Feature, SensorMap};

/// One sensor's feature list as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub sensor_id: String,
    pub features: Vec<Feature>,
}

/// On-disk dataset. Sensors are kept in file order; the first is the reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorDataset {
    pub sensors: Vec<SensorRecord>,
}

impl SensorDataset {
    /// Features with an empty `sensor_id` inherit the id of their sensor.
    pub fn into_sensor_map(self) -> Result<SensorMap<Vec<Feature>>, DataError> {
        let mut map = SensorMap::new();
        for record in self.sensors {
            if map.contains_key(&record.sensor_id) {
                return Err(DataError::DuplicateSensor(record.sensor_id));
            }
            let features: Vec<Feature> = record
                .features
                .into_iter()
                .map(|mut f| {
                    if f.sensor_id.is_empty() {
                        f.sensor_id = record.sensor_id.clone();
                    }
                    f
                })
                .collect();
            map.insert(&record.sensor_id, features);
        }
        Ok(map)
    }

    pub fn from_sensor_map(sensor_features: &SensorMap<Vec<Feature>>) -> SensorDataset {
        SensorDataset {
            sensors: sensor_features
                .iter()
                .map(|(id, features)| SensorRecord {
                    sensor_id: id.to_string(),
                    features: features.clone(),
                })
                .collect(),
        }
    }
}

pub fn load_sensor_features<P: AsRef<Path>>(
    file_path: P,
) -> Result<SensorMap<Vec<Feature>>, DataError> {
    let dataset: SensorDataset = object_from_json(&file_path)?;
    log::trace!(
        "loaded {} sensors from {}",
        dataset.sensors.len(),
        file_path.as_ref().display()
    );
    dataset.into_sensor_map()
}

pub fn save_sensor_features<P: AsRef<Path>>(
    file_path: P,
    sensor_features: &SensorMap<Vec<Feature>>,
) -> Result<(), DataError> {
    object_to_json(file_path, &SensorDataset::from_sensor_map(sensor_features))
}
