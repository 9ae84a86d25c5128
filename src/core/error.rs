use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{EvolvedCategory, LandCode, UnitId};

/// Fatal configuration problems, raised before any phase runs
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("SSI weights must sum to 1.0, got {sum:.6}")]
    WeightSum { sum: f64 },

    #[error("SSI weight '{name}' is negative ({value})")]
    NegativeWeight { name: &'static str, value: f64 },

    #[error("phase ratio sequence is empty")]
    NoPhases,

    #[error("phase '{phase}': {field} ratio {value} is outside [0, 1]")]
    RatioOutOfRange {
        phase: String,
        field: &'static str,
        value: f64,
    },

    #[error("phase '{phase}': {field} ratio {value} decreases from previous {previous}")]
    RatioDecreasing {
        phase: String,
        field: &'static str,
        value: f64,
        previous: f64,
    },

    #[error("malformed code table: {0}")]
    MalformedTable(String),

    #[error("evolved category {0} has no representative code")]
    MissingRepresentativeCode(EvolvedCategory),

    #[error("source rule for code {code} references unconfigured category {category}")]
    UnknownCategory {
        code: LandCode,
        category: EvolvedCategory,
    },

    #[error("failed to read config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure reported by a geometry collaborator
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("parcel {0} has degenerate geometry")]
    DegenerateGeometry(UnitId),

    #[error("zone {0} has no centroid")]
    NoCentroid(crate::core::types::ZoneId),

    #[error("geometry operation '{operation}' failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },
}

/// Failure reported by a feature store collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("feature set '{0}' not found")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failure inside one phase invocation
#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("unit {0} appears more than once in the phase input")]
    DuplicateUnit(UnitId),

    #[error("{field} ratio {value} is outside [0, 1]")]
    InvalidRatio { field: &'static str, value: f64 },

    #[error("{field} ratio {value} is below the previous phase's {previous}")]
    RatioRegression {
        field: &'static str,
        value: f64,
        previous: f64,
    },
}

#[derive(Error, Debug)]
pub enum GacError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Phase error: {0}")]
    PhaseFailed(#[from] PhaseError),

    #[error("phase '{phase}' aborted: {source}")]
    Phase {
        phase: String,
        #[source]
        source: Box<GacError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl GacError {
    /// Attach the identity of the phase that was running when this error surfaced
    pub fn in_phase(self, phase: impl Into<String>) -> Self {
        GacError::Phase {
            phase: phase.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, GacError>;
