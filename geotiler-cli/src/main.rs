//! GeoTiler CLI - Command-line interface
//!
//! This binary drives the GeoTiler library: extracting and injecting
//! georeferencing, and running the full reproject-tile-preview pipeline.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::extract::ExtractArgs;
use commands::inject::InjectArgs;
use commands::tiles::TilesArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "geotiler")]
#[command(about = "Prepare georeferenced rasters for web tile publishing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract georeferencing from a raster into a JSON document
    Extract {
        /// Source raster
        input: PathBuf,

        /// Document path (default: <input>.georef.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Inject a georeference document into a copy of a raster
    Inject {
        /// Georeference document produced by `extract`
        georef: PathBuf,

        /// Raster whose pixel data is final
        raster: PathBuf,

        /// Output raster (default: <raster-stem>_georef.<ext>)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Reproject a raster, render XYZ tiles and generate a preview page
    Tiles {
        /// Source raster
        input: PathBuf,

        /// Output directory for tiles and the preview page
        output_dir: PathBuf,

        /// Minimum zoom level
        #[arg(long, default_value_t = 0)]
        min_zoom: u8,

        /// Maximum zoom level
        #[arg(long, default_value_t = 18)]
        max_zoom: u8,

        /// Keep the reprojected intermediate file
        #[arg(long)]
        keep_intermediate: bool,

        /// Preview page title (default: source filename)
        #[arg(long)]
        title: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let _logging_guard = match geotiler::logging::init_logging("logs", "geotiler.log") {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let result = match cli.command {
        Command::Extract { input, output } => {
            commands::extract::run(ExtractArgs { input, output })
        }
        Command::Inject {
            georef,
            raster,
            output,
        } => commands::inject::run(InjectArgs {
            georef,
            raster,
            output,
        }),
        Command::Tiles {
            input,
            output_dir,
            min_zoom,
            max_zoom,
            keep_intermediate,
            title,
        } => commands::tiles::run(TilesArgs {
            input,
            output_dir,
            min_zoom,
            max_zoom,
            keep_intermediate,
            title,
        }),
    };

    if let Err(e) = result {
        e.exit();
    }
}
