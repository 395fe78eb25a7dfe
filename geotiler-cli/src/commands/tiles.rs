//! Tiles command - run the full publishing pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use geotiler::config::PipelineConfig;
use geotiler::engine::GdalToolsEngine;
use geotiler::pipeline::{PipelineEvent, PipelineRun, PipelineWorker};

use crate::error::CliError;

/// How often the controlling thread drains the worker's event queue.
const POLL_INTERVAL: Duration = Duration::from_millis(120);

/// Arguments for the tiles command.
pub struct TilesArgs {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub keep_intermediate: bool,
    pub title: Option<String>,
}

/// Run the tiles command.
pub fn run(args: TilesArgs) -> Result<(), CliError> {
    let engine = GdalToolsEngine::discover()?;
    tracing::info!(version = engine.version(), "raster engine ready");

    let mut config = PipelineConfig::new(&args.input, &args.output_dir)
        .with_zoom_range(args.min_zoom, args.max_zoom)
        .with_keep_intermediate(args.keep_intermediate);
    if let Some(title) = args.title {
        config = config.with_title(title);
    }

    let worker = PipelineWorker::new();
    let run = worker.start(Arc::new(engine), config)?;

    let suggested = pump_events(&run);
    let report = run.wait()?;

    if let Some(zoom) = suggested {
        println!("Suggested max zoom for this raster: {}", zoom);
    }
    println!("Preview page: {}", report.page_path.display());
    Ok(())
}

/// Drain events on a fixed polling interval until the worker finishes,
/// printing log lines as they arrive. Returns the last zoom suggestion.
fn pump_events(run: &PipelineRun) -> Option<u8> {
    let mut suggested = None;
    loop {
        let finished = run.is_finished();
        while let Some(event) = run.try_next_event() {
            match event {
                PipelineEvent::Log(line) => println!("{}", line),
                PipelineEvent::SuggestedMaxZoom(zoom) => suggested = Some(zoom),
            }
        }
        if finished {
            return suggested;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
