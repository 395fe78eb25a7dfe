//! Pipeline orchestration.
//!
//! Sequences the full publishing run: validate and extract the source
//! raster, reproject it into Web Mercator through the engine, render the
//! tile pyramid, derive preview metadata, locate the pyramid layout, and
//! generate the preview page. The run executes on one dedicated worker
//! thread; progress flows back to the controlling thread through an
//! order-preserving event queue, and the final result-or-error comes from
//! joining the worker. At most one run is active at a time.

mod error;
mod run;
mod worker;

pub use error::{PipelineError, PipelineResult};
pub use run::{run, PipelineEvent, PipelineReport, CACHE_DIR_NAME, WARPED_FILENAME};
pub use worker::{PipelineRun, PipelineWorker};
