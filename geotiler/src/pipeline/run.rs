//! The pipeline run sequence.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{PipelineError, PipelineResult};
use crate::config::PipelineConfig;
use crate::engine::{EngineError, RasterEngine};
use crate::georef;
use crate::layout::{self, TileLayout};
use crate::page::PreviewPage;
use crate::preview::{self, PreviewInfo, WEB_MERCATOR_SRS};

/// Cache subdirectory holding the reprojected intermediate.
pub const CACHE_DIR_NAME: &str = "_geotiler_cache";

/// Filename of the reprojected intermediate inside the cache directory.
pub const WARPED_FILENAME: &str = "warped_3857.tif";

/// Zoom levels beyond this cannot be located afterwards, so runs that
/// request them are rejected up front.
const MAX_TILE_ZOOM: u8 = 30;

/// Progress emitted by a run, in order, while it executes.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A diagnostic line, either ours or an external tool's.
    Log(String),

    /// The deriver's zoom suggestion, reported before tiling begins.
    SuggestedMaxZoom(u8),
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub preview: PreviewInfo,
    pub layout: TileLayout,
    pub page_path: PathBuf,
}

/// Execute the full pipeline, emitting progress through `emit`.
///
/// Any failure in extraction, reprojection, or tiling aborts the run and
/// surfaces as one error; tiles already written stay in place because the
/// tiling tool resumes from pre-existing output on the next run with the
/// same configuration.
pub fn run(
    engine: &dyn RasterEngine,
    config: &PipelineConfig,
    emit: &dyn Fn(PipelineEvent),
) -> PipelineResult<PipelineReport> {
    let log = |line: &str| emit(PipelineEvent::Log(line.to_string()));

    if config.min_zoom > config.max_zoom || config.max_zoom > MAX_TILE_ZOOM {
        return Err(PipelineError::InvalidZoomRange {
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        });
    }

    info!(
        source = %config.source.display(),
        output = %config.output_dir.display(),
        min_zoom = config.min_zoom,
        max_zoom = config.max_zoom,
        "pipeline run starting"
    );

    log("Reading and validating source raster...");
    let record = georef::extract(engine, &config.source)?;
    if record.geotransform.is_none() && record.gcps.is_empty() {
        return Err(PipelineError::Engine(EngineError::Open {
            path: config.source.clone(),
            reason: "raster has neither an affine transform nor ground control points"
                .to_string(),
        }));
    }
    if record.projection_wkt.is_empty() {
        log("Warning: source raster reports no projection; the engine will have to guess");
    }

    let cache_dir = config.output_dir.join(CACHE_DIR_NAME);
    fs::create_dir_all(&cache_dir).map_err(|e| PipelineError::CreateDirFailed {
        path: cache_dir.clone(),
        source: e,
    })?;
    let warped_path = cache_dir.join(WARPED_FILENAME);

    log(&format!("Reprojecting into {}...", WEB_MERCATOR_SRS));
    engine.warp(&config.source, &warped_path, WEB_MERCATOR_SRS, &log)?;

    let preview = preview::derive_preview(engine, &warped_path)?;
    if let Some(zoom) = preview.suggested_max_zoom {
        log(&format!("Suggested max zoom: {}", zoom));
        emit(PipelineEvent::SuggestedMaxZoom(zoom));
    }

    log(&format!(
        "Generating XYZ tiles for zoom {}-{}...",
        config.min_zoom, config.max_zoom
    ));
    engine.tile(
        &warped_path,
        &config.output_dir,
        config.min_zoom,
        config.max_zoom,
        &log,
    )?;

    let layout = layout::locate(&config.output_dir, &config.tile_extension);
    log(&format!("Tile URL template: {}", layout.url_template));
    if let Some(sample) = &layout.sample_tile {
        let shown = sample
            .strip_prefix(&config.output_dir)
            .unwrap_or(sample.as_path());
        log(&format!("Sample tile: {}", shown.display()));
    }

    log("Generating preview page...");
    let page = PreviewPage {
        title: config.page_title(),
        min_zoom: config.min_zoom,
        max_zoom: config.max_zoom,
        center_lat: preview.center_lat,
        center_lng: preview.center_lng,
        bounds_sw_lat: preview.bounds_sw_lat,
        bounds_sw_lng: preview.bounds_sw_lng,
        bounds_ne_lat: preview.bounds_ne_lat,
        bounds_ne_lng: preview.bounds_ne_lng,
        tiles_url_template: layout.url_template.clone(),
    };
    let page_path =
        page.write_to_dir(&config.output_dir)
            .map_err(|e| PipelineError::PageWriteFailed {
                path: config.output_dir.join(crate::page::PAGE_FILENAME),
                source: e,
            })?;

    if !config.keep_intermediate {
        cleanup_intermediate(&warped_path);
    }

    log("Done. Open index.html in the output directory to preview.");
    info!(page = %page_path.display(), "pipeline run complete");

    Ok(PipelineReport {
        preview,
        layout,
        page_path,
    })
}

/// Best-effort removal of the intermediate file and its cache directory.
///
/// The two steps are caught independently so a failure to unlink the file
/// still lets the directory attempt run (and vice versa); neither failure
/// ever fails the run.
fn cleanup_intermediate(warped_path: &Path) {
    if let Err(e) = fs::remove_file(warped_path) {
        debug!(
            path = %warped_path.display(),
            error = %e,
            "leaving intermediate file behind"
        );
    }

    if let Some(cache_dir) = warped_path.parent() {
        // Only removes an empty directory.
        if let Err(e) = fs::remove_dir(cache_dir) {
            debug!(
                path = %cache_dir.display(),
                error = %e,
                "leaving cache directory behind"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{MockEngine, TransformMode};
    use crate::engine::RasterDescription;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn collecting_emitter(events: &Mutex<Vec<PipelineEvent>>) -> impl Fn(PipelineEvent) + '_ {
        move |event| events.lock().unwrap().push(event)
    }

    fn georeferenced_source(dir: &TempDir, engine: &MockEngine) -> PathBuf {
        let source = dir.path().join("scene.tif");
        std::fs::write(&source, b"source raster").unwrap();
        engine.register(
            &source,
            RasterDescription {
                width: 1000,
                height: 1000,
                geotransform: Some([0.0, 10.0, 0.0, 0.0, 0.0, -10.0]),
                projection_wkt: "PROJCS[\"UTM 33N\"]".to_string(),
                ..RasterDescription::default()
            },
        );
        source
    }

    #[test]
    fn test_run_produces_page_layout_and_preview() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::with_transform_mode(TransformMode::MercatorToGeographic);
        let source = georeferenced_source(&dir, &engine);
        let out_dir = dir.path().join("out");

        let events = Mutex::new(Vec::new());
        let config = PipelineConfig::new(&source, &out_dir).with_zoom_range(1, 3);
        let report = run(&engine, &config, &collecting_emitter(&events)).unwrap();

        assert_eq!(report.page_path, out_dir.join("index.html"));
        assert!(report.page_path.is_file());
        assert_eq!(report.layout.url_template, "./{z}/{x}/{y}.png");
        assert_eq!(report.preview.suggested_max_zoom, Some(14));

        let events = events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::SuggestedMaxZoom(14))));
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Log(line) if line.contains("Tile URL template"))));
    }

    #[test]
    fn test_run_cleans_up_intermediate_by_default() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::with_transform_mode(TransformMode::MercatorToGeographic);
        let source = georeferenced_source(&dir, &engine);
        let out_dir = dir.path().join("out");

        let config = PipelineConfig::new(&source, &out_dir).with_zoom_range(0, 1);
        run(&engine, &config, &|_| {}).unwrap();

        let cache_dir = out_dir.join(CACHE_DIR_NAME);
        assert!(!cache_dir.join(WARPED_FILENAME).exists());
        assert!(!cache_dir.exists());
    }

    #[test]
    fn test_run_keeps_intermediate_when_asked() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::with_transform_mode(TransformMode::MercatorToGeographic);
        let source = georeferenced_source(&dir, &engine);
        let out_dir = dir.path().join("out");

        let config = PipelineConfig::new(&source, &out_dir)
            .with_zoom_range(0, 1)
            .with_keep_intermediate(true);
        run(&engine, &config, &|_| {}).unwrap();

        assert!(out_dir.join(CACHE_DIR_NAME).join(WARPED_FILENAME).is_file());
    }

    #[test]
    fn test_run_rejects_inverted_zoom_range() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let config =
            PipelineConfig::new(dir.path().join("a.tif"), dir.path().join("out"))
                .with_zoom_range(9, 3);

        let result = run(&engine, &config, &|_| {});
        assert!(matches!(
            result,
            Err(PipelineError::InvalidZoomRange { .. })
        ));
    }

    #[test]
    fn test_run_rejects_ungeoreferenced_source() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let source = dir.path().join("bare.tif");
        std::fs::write(&source, b"bytes").unwrap();
        engine.register(
            &source,
            RasterDescription {
                width: 8,
                height: 8,
                ..RasterDescription::default()
            },
        );

        let config = PipelineConfig::new(&source, dir.path().join("out"));
        let result = run(&engine, &config, &|_| {});
        assert!(matches!(
            result,
            Err(PipelineError::Engine(EngineError::Open { .. }))
        ));
    }

    #[test]
    fn test_run_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let config =
            PipelineConfig::new(dir.path().join("absent.tif"), dir.path().join("out"));

        let result = run(&engine, &config, &|_| {});
        assert!(matches!(
            result,
            Err(PipelineError::Georef(crate::georef::GeorefError::NotFound(_)))
        ));
    }

    #[test]
    fn test_cleanup_failure_is_silent() {
        // Nothing to remove; both steps fail and neither panics.
        cleanup_intermediate(Path::new("/nonexistent/cache/warped_3857.tif"));
    }
}
