//! Error types for peddi-tooling core operations

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git subprocess failure
    #[error("git error: {0}")]
    Git(String),

    /// Cache layer failure
    #[error("cache error: {0}")]
    Cache(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
