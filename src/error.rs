use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlignError>;

/// Failures local to one alignment attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("insufficient data: source has {source_len} points, target has {target_len} points")]
    InsufficientData { source_len: usize, target_len: usize },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("insufficient correspondences: found {found}, need at least {required}")]
    InsufficientCorrespondences { found: usize, required: usize },

    #[error("descriptor length {found} does not match reference length {expected}")]
    DescriptorDimension { expected: usize, found: usize },
}

/// Failures at the persistence and dataset boundary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("rotation of {0} is not a proper rotation")]
    InvalidRotation(String),

    #[error("sensor {0} listed more than once")]
    DuplicateSensor(String),
}
