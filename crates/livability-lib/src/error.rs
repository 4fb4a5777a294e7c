use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the livability library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The region has no stored graph or feature table.
    #[error("region data unavailable at {path}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    /// The stored region data is present but malformed.
    #[error("invalid region dataset: {message}")]
    InvalidDataset { message: String },

    /// Caller supplied malformed input (coordinates, limits, ...).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Caller requested a traversal mode that is not recognised.
    #[error("unknown transportation mode '{mode}'; expected one of: drive, walk, bike, all")]
    InvalidMode { mode: String },

    /// Nearest-node lookups need at least one node.
    #[error("road network has no nodes")]
    NoNodes,

    /// A node identifier was not present in the road network.
    #[error("node {id} not found in road network")]
    NodeNotFound { id: i64 },

    /// Livability weights do not line up with the metric set or do not sum to 1.0.
    #[error("livability weight mismatch: {message}")]
    WeightMismatch { message: String },

    /// Unexpected internal fault while computing a path or a score.
    #[error("computation failed: {message}")]
    ComputationFailure { message: String },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for CSV parsing errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Wrapper for JSON parsing errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_dataset(message: impl Into<String>) -> Self {
        Self::InvalidDataset {
            message: message.into(),
        }
    }

    pub(crate) fn weight_mismatch(message: impl Into<String>) -> Self {
        Self::WeightMismatch {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput { .. } | Error::InvalidMode { .. })
    }
}
