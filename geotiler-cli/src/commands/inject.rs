//! Inject command - apply a georeference document to a raster copy.

use std::path::{Path, PathBuf};

use geotiler::engine::GdalToolsEngine;
use geotiler::georef;

use crate::error::CliError;

/// Arguments for the inject command.
pub struct InjectArgs {
    /// Georeference document produced by the extract command.
    pub georef: PathBuf,
    /// Raster whose pixel data is final.
    pub raster: PathBuf,
    /// Output path; `<stem>_georef.<ext>` next to the raster when unset.
    pub output: Option<PathBuf>,
}

/// Default output path next to the target raster.
fn default_output(raster: &Path) -> PathBuf {
    let stem = raster
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match raster.extension() {
        Some(ext) => format!("{}_georef.{}", stem, ext.to_string_lossy()),
        None => format!("{}_georef.tif", stem),
    };
    raster.with_file_name(name)
}

/// Run the inject command.
pub fn run(args: InjectArgs) -> Result<(), CliError> {
    let engine = GdalToolsEngine::discover()?;
    tracing::info!(version = engine.version(), "raster engine ready");

    let output = args.output.unwrap_or_else(|| default_output(&args.raster));
    georef::apply_document(&engine, &args.georef, &args.raster, &output)?;
    println!("Georeferenced raster written to {}", output.display());
    Ok(())
}
