//! Rigid alignment of feature sets coming from several sensors.
//!
//! One sensor is taken as the reference frame. Every other sensor is matched
//! against it by descriptor, aligned with point-to-point ICP and its features
//! are mapped into the reference frame for fusion.

pub mod aligner;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod io;
pub mod matcher;
pub mod optimization;
pub mod synthetic;
pub mod transformation;
pub mod types;

pub use aligner::{AlignmentOutcome, AlignmentResult, MultiSensorAligner, transform_features};
pub use config::AlignerConfig;
pub use error::{AlignError, DataError};
pub use matcher::FeatureMatcher;
pub use optimization::{ClosestPointAligner, IcpParams, IcpResult, IcpState};
pub use transformation::Transformation;
pub use types::{Correspondence, Feature, Point3D, SensorMap};
