//! Error types for georeference extraction and injection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;

/// Result type for georeference operations.
pub type GeorefResult<T> = Result<T, GeorefError>;

/// Errors that can occur while extracting or injecting georeferencing.
#[derive(Debug, Error)]
pub enum GeorefError {
    /// Input path does not exist.
    #[error("input path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// The document's format tag is missing or not ours.
    #[error("unsupported georeference document format: {found:?}")]
    UnsupportedFormat { found: String },

    /// The raster engine rejected an operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Failed to read a file.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The document is not valid JSON for a georeference record.
    #[error("invalid georeference document {}: {source}", .path.display())]
    InvalidDocument {
        path: PathBuf,
        source: serde_json::Error,
    },
}
