//! Error types for the pipeline orchestrator.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::engine::EngineError;
use crate::georef::GeorefError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can abort a pipeline run.
///
/// Exactly one of these surfaces per failed run; partial tile output is
/// left in place for the tiling tool's resume mode to pick up.
#[derive(Debug)]
pub enum PipelineError {
    /// A run is already active; concurrent runs are rejected, not queued.
    AlreadyRunning,

    /// The configured zoom range is unusable.
    InvalidZoomRange { min_zoom: u8, max_zoom: u8 },

    /// Source raster validation or extraction failed.
    Georef(GeorefError),

    /// The engine or an external tool failed.
    Engine(EngineError),

    /// Failed to create a directory.
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to write the preview page.
    PageWriteFailed { path: PathBuf, source: io::Error },

    /// The worker thread terminated abnormally.
    WorkerPanicked,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::AlreadyRunning => {
                write!(f, "a pipeline run is already active")
            }
            PipelineError::InvalidZoomRange { min_zoom, max_zoom } => {
                write!(f, "invalid zoom range {}-{}", min_zoom, max_zoom)
            }
            PipelineError::Georef(e) => {
                write!(f, "source raster rejected: {}", e)
            }
            PipelineError::Engine(e) => {
                write!(f, "raster engine failed: {}", e)
            }
            PipelineError::CreateDirFailed { path, source } => {
                write!(f, "failed to create directory {}: {}", path.display(), source)
            }
            PipelineError::PageWriteFailed { path, source } => {
                write!(f, "failed to write preview page {}: {}", path.display(), source)
            }
            PipelineError::WorkerPanicked => {
                write!(f, "pipeline worker terminated abnormally")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Georef(e) => Some(e),
            PipelineError::Engine(e) => Some(e),
            PipelineError::CreateDirFailed { source, .. } => Some(source),
            PipelineError::PageWriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<GeorefError> for PipelineError {
    fn from(e: GeorefError) -> Self {
        PipelineError::Georef(e)
    }
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        PipelineError::Engine(e)
    }
}
