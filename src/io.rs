use std::io::Write;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::aligner::{AlignmentOutcome, AlignmentResult};
use crate::error::DataError;
use crate::optimization::IcpState;
use crate::transformation::Transformation;
use crate::types::SensorMap;

const ROTATION_TOLERANCE: f64 = 1e-6;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize, P: AsRef<Path>>(
    output_path: P,
    object: &T,
) -> Result<(), DataError> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T, DataError> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// On-disk form of one sensor's transform. Rotation rows are row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRecord {
    pub sensor_id: String,
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl TransformationRecord {
    pub fn new(sensor_id: &str, transformation: &Transformation) -> TransformationRecord {
        let (r, t) = transformation.to_row_major();
        TransformationRecord {
            sensor_id: sensor_id.to_string(),
            rotation: [[r[0], r[1], r[2]], [r[3], r[4], r[5]], [r[6], r[7], r[8]]],
            translation: t,
        }
    }

    pub fn to_transformation(&self) -> Transformation {
        let r = &self.rotation;
        Transformation::from_row_major(
            &[
                r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
            ],
            &self.translation,
        )
    }
}

pub fn save_transformation<P: AsRef<Path>>(
    sensor_id: &str,
    transformation: &Transformation,
    file_path: P,
) -> Result<(), DataError> {
    object_to_json(&file_path, &TransformationRecord::new(sensor_id, transformation))?;
    info!("transformation for {} saved to {}", sensor_id, file_path.as_ref().display());
    Ok(())
}

/// Loads a transform and checks that its rotation is proper.
pub fn load_transformation<P: AsRef<Path>>(
    file_path: P,
) -> Result<(String, Transformation), DataError> {
    let record: TransformationRecord = object_from_json(file_path)?;
    let transformation = record.to_transformation();
    if !transformation.is_proper_rotation(ROTATION_TOLERANCE) {
        return Err(DataError::InvalidRotation(record.sensor_id));
    }
    Ok((record.sensor_id, transformation))
}

#[derive(Debug, Serialize)]
struct AlignmentReport {
    reference_sensor: Option<String>,
    sensors: Vec<SensorReport>,
    aligned_count: usize,
    fallback_count: usize,
}

#[derive(Debug, Serialize)]
struct SensorReport {
    sensor_id: String,
    status: &'static str,
    rotation: [[f64; 3]; 3],
    translation: [f64; 3],
    correspondences: Option<usize>,
    iterations: Option<usize>,
    icp_state: Option<IcpState>,
    mean_squared_error: Option<f64>,
    fallback_reason: Option<String>,
    /// `None` when the sensor could not be scored.
    average_error: Option<f64>,
}

impl SensorReport {
    fn new(result: &AlignmentResult, quality: Option<f64>) -> SensorReport {
        let record = TransformationRecord::new(&result.sensor_id, &result.transform);
        let mut report = SensorReport {
            sensor_id: result.sensor_id.clone(),
            status: "reference",
            rotation: record.rotation,
            translation: record.translation,
            correspondences: None,
            iterations: None,
            icp_state: None,
            mean_squared_error: None,
            fallback_reason: None,
            average_error: quality.filter(|q| q.is_finite()),
        };
        match &result.outcome {
            AlignmentOutcome::Reference => {}
            AlignmentOutcome::Aligned {
                correspondences,
                iterations,
                state,
                mean_squared_error,
            } => {
                report.status = "aligned";
                report.correspondences = Some(*correspondences);
                report.iterations = Some(*iterations);
                report.icp_state = Some(*state);
                report.mean_squared_error = Some(*mean_squared_error);
            }
            AlignmentOutcome::Fallback(err) => {
                report.status = "fallback";
                report.fallback_reason = Some(err.to_string());
            }
        }
        report
    }
}

/// Writes per-sensor transforms, alignment outcomes and quality scores as JSON.
pub fn write_alignment_report<P: AsRef<Path>>(
    output_path: P,
    reference_sensor: Option<&str>,
    results: &SensorMap<AlignmentResult>,
    quality: &SensorMap<f64>,
) -> Result<(), DataError> {
    let sensors: Vec<_> = results
        .values()
        .map(|r| SensorReport::new(r, quality.get(&r.sensor_id).copied()))
        .collect();
    let fallback_count = results.values().filter(|r| r.is_fallback()).count();
    let aligned_count = sensors.iter().filter(|s| s.status == "aligned").count();

    let report = AlignmentReport {
        reference_sensor: reference_sensor.map(str::to_string),
        sensors,
        aligned_count,
        fallback_count,
    };
    object_to_json(output_path, &report)
}
