//! Raster and coordinate engine abstraction
//!
//! This module provides the capability interface the rest of the library
//! depends on for raster access: reading georeferencing, writing it back,
//! transforming coordinates between reference systems, and invoking the
//! external reprojection and tiling tools.
//!
//! The core never talks to a raster library directly. A concrete adapter
//! ([`GdalToolsEngine`]) binds whichever GDAL installation is on the PATH,
//! resolved once at startup via [`GdalToolsEngine::discover`].

mod gdal_tools;

pub use gdal_tools::GdalToolsEngine;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::georef::GroundControlPoint;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while driving the raster engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input path does not exist.
    #[error("input path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// The engine could not open the file as a raster.
    #[error("cannot open {} as a raster: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    /// An external tool completed with a non-zero exit status.
    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailure {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// The engine produced output the adapter could not interpret.
    #[error("unexpected {tool} output: {reason}")]
    MalformedOutput { tool: String, reason: String },

    /// No usable engine installation was found.
    #[error("raster engine unavailable: {0}")]
    Unavailable(String),

    /// Failed to write a file.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Everything the engine can report about a raster in one read-only open.
#[derive(Debug, Clone, Default)]
pub struct RasterDescription {
    /// Raster width in pixels.
    pub width: u32,

    /// Raster height in pixels.
    pub height: u32,

    /// Affine transform, absent when the raster carries none.
    pub geotransform: Option<[f64; 6]>,

    /// Projection WKT, empty when the raster reports none.
    pub projection_wkt: String,

    /// Projection WKT of the GCP set, empty when none.
    pub gcp_projection_wkt: String,

    /// Ground control points in raster order.
    pub gcps: Vec<GroundControlPoint>,

    /// Default-domain metadata items.
    pub metadata: BTreeMap<String, String>,
}

/// Capability interface over a raster/coordinate engine.
///
/// Implementations must request the traditional GIS axis convention
/// (x/longitude first) on both ends of [`transform_points`], regardless of
/// what the underlying reference-system registry defaults to.
///
/// [`transform_points`]: RasterEngine::transform_points
pub trait RasterEngine: Send + Sync {
    /// Open a raster read-only and describe its georeferencing.
    fn describe(&self, path: &Path) -> EngineResult<RasterDescription>;

    /// Write an affine transform into the raster at `path`.
    fn write_geotransform(&self, path: &Path, transform: [f64; 6]) -> EngineResult<()>;

    /// Write a projection WKT into the raster at `path`.
    fn write_projection(&self, path: &Path, wkt: &str) -> EngineResult<()>;

    /// Write a GCP set, paired with its projection WKT (which may be empty),
    /// into the raster at `path`.
    fn write_gcps(
        &self,
        path: &Path,
        gcps: &[GroundControlPoint],
        gcp_wkt: &str,
    ) -> EngineResult<()>;

    /// Transform `points` from `src_srs` to `dst_srs`.
    ///
    /// Input and output pairs are (x, y) in traditional GIS order.
    fn transform_points(
        &self,
        src_srs: &str,
        dst_srs: &str,
        points: &[(f64, f64)],
    ) -> EngineResult<Vec<(f64, f64)>>;

    /// Reproject `src` into `target_srs`, writing the result to `dst`.
    ///
    /// Diagnostic lines from the external tool are forwarded to `log`.
    fn warp(
        &self,
        src: &Path,
        dst: &Path,
        target_srs: &str,
        log: &dyn Fn(&str),
    ) -> EngineResult<()>;

    /// Render a web tile pyramid from `src` into `out_dir` across the given
    /// zoom range. Re-running with pre-existing output resumes rather than
    /// regenerates.
    fn tile(
        &self,
        src: &Path,
        out_dir: &Path,
        min_zoom: u8,
        max_zoom: u8,
        log: &dyn Fn(&str),
    ) -> EngineResult<()>;
}
