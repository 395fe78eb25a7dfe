//! Extract command - read georeferencing from a raster into a document.

use std::path::{Path, PathBuf};

use geotiler::engine::GdalToolsEngine;
use geotiler::georef;

use crate::error::CliError;

/// Arguments for the extract command.
pub struct ExtractArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

/// Default document path: the input path with `.georef.json` appended.
fn default_output(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".georef.json");
    PathBuf::from(name)
}

/// Run the extract command.
pub fn run(args: ExtractArgs) -> Result<(), CliError> {
    let engine = GdalToolsEngine::discover()?;
    tracing::info!(version = engine.version(), "raster engine ready");

    let record = georef::extract(&engine, &args.input)?;
    print!("{}", record.preview_text());

    let output = args.output.unwrap_or_else(|| default_output(&args.input));
    record.write(&output)?;
    println!("Georeference document written to {}", output.display());
    Ok(())
}
