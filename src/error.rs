//! Error types shared across the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration could not be read or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Reference tables could not be loaded. Always fatal.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse reference table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("reference record {index} has an empty label")]
    EmptyLabel { index: usize },
    #[error("reference record '{label}' has non-positive density {density}")]
    InvalidDensity { label: String, density: f64 },
    #[error("reference record '{label}' has invalid value {value} for nutrient '{nutrient}'")]
    InvalidNutrient {
        label: String,
        nutrient: String,
        value: f64,
    },
    #[error("duplicate reference label '{0}'")]
    DuplicateLabel(String),
    #[error("reference table is empty")]
    Empty,
}

/// Failure reported by a frame source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source cannot be opened at all.
    #[error("frame source could not be opened: {0}")]
    Open(String),
    /// A single frame is unreadable; the stream can continue.
    #[error("frame {frame_index} is corrupt: {reason}")]
    Corrupt { frame_index: u64, reason: String },
    /// The stream broke; no further frames will arrive.
    #[error("frame decoding failed: {0}")]
    Decode(String),
}

/// Errors that stop the whole pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}
