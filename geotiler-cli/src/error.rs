//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use geotiler::engine::EngineError;
use geotiler::georef::GeorefError;
use geotiler::pipeline::PipelineError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// The raster engine could not be resolved or failed
    Engine(EngineError),
    /// Georeference extraction or injection failed
    Georef(GeorefError),
    /// The tiling pipeline failed
    Pipeline(PipelineError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Engine(EngineError::Unavailable(_)) = self {
            eprintln!();
            eprintln!("GeoTiler drives the GDAL command-line tools. Make sure:");
            eprintln!("  1. GDAL is installed (e.g. apt install gdal-bin python3-gdal)");
            eprintln!("  2. gdalinfo, gdalwarp and gdal2tiles.py are on the PATH");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Engine(e) => write!(f, "{}", e),
            CliError::Georef(e) => write!(f, "{}", e),
            CliError::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}

impl From<GeorefError> for CliError {
    fn from(e: GeorefError) -> Self {
        CliError::Georef(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}
