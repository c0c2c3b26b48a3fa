use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building, writing or reading a genre dataset.
///
/// Every variant is fatal to a build run. Segments whose frame count does not
/// match the expected count are not errors unless
/// [`LengthMismatchPolicy::Abort`](crate::config::LengthMismatchPolicy) is set.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Invalid extraction configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Dataset root does not exist
    #[error("dataset root not found: {0}")]
    RootNotFound(PathBuf),

    /// Dataset root exists but is not a directory
    #[error("dataset root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory traversal failed
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Audio file could not be opened or decoded
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Segment frame count mismatch under the abort policy
    #[error("{path}: segment {segment} has {actual} frames, expected {expected}")]
    LengthMismatch {
        path: PathBuf,
        segment: usize,
        expected: usize,
        actual: usize,
    },

    /// Filesystem error on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Loaded dataset breaks one of its invariants
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
