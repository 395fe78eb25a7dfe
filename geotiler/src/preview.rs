//! Preview metadata derivation for reprojected rasters.
//!
//! Given a raster already warped into Web Mercator, derives the geographic
//! bounds, center point, and a suggested maximum web zoom for a map
//! preview. Coordinate transformation goes through the engine with the
//! traditional (longitude-first) axis convention requested on both ends;
//! a defensive component swap catches any axis-order leakage a registry
//! still manages to introduce.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::{EngineError, EngineResult, RasterEngine};

/// Web Mercator ground resolution at the equator for zoom 0, metres/pixel.
pub const WEB_MERCATOR_BASE_RESOLUTION: f64 = 156543.03392804097;

/// Upper bound for suggested web zoom levels.
pub const MAX_SUGGESTED_ZOOM: u8 = 22;

/// Reference system the pipeline warps into.
pub const WEB_MERCATOR_SRS: &str = "EPSG:3857";

/// Geographic reference system used for preview bounds.
pub const GEOGRAPHIC_SRS: &str = "EPSG:4326";

/// Map-preview metadata for one reprojected raster.
///
/// Derived per pipeline run; not persisted.
#[derive(Debug, Clone)]
pub struct PreviewInfo {
    /// The reprojected raster the metadata was derived from.
    pub raster_path: PathBuf,

    pub center_lat: f64,
    pub center_lng: f64,
    pub bounds_sw_lat: f64,
    pub bounds_sw_lng: f64,
    pub bounds_ne_lat: f64,
    pub bounds_ne_lng: f64,

    /// Suggested maximum web zoom, absent when the transform is degenerate.
    pub suggested_max_zoom: Option<u8>,
}

/// Map a pixel/line position to projected coordinates.
pub fn apply_geotransform(transform: &[f64; 6], pixel: f64, line: f64) -> (f64, f64) {
    let x = transform[0] + pixel * transform[1] + line * transform[2];
    let y = transform[3] + pixel * transform[4] + line * transform[5];
    (x, y)
}

/// Correct a coordinate pair expected to be (latitude, longitude).
///
/// If the first component's magnitude exceeds 90 while the second's does
/// not, the first cannot be a latitude and the pair is swapped. Pairs
/// where neither or both components exceed 90 pass through unchanged.
pub fn correct_axis_order(first: f64, second: f64) -> (f64, f64) {
    if first.abs() > 90.0 && second.abs() <= 90.0 {
        (second, first)
    } else {
        (first, second)
    }
}

/// Suggest a maximum web zoom for the given pixel resolution in
/// metres/pixel.
///
/// At zoom `z` the standard web-tile scheme resolves
/// [`WEB_MERCATOR_BASE_RESOLUTION`]` / 2^z` metres per pixel, so the
/// suggestion is `ceil(log2(base / resolution))` clamped to
/// `0..=`[`MAX_SUGGESTED_ZOOM`]. Non-positive or non-finite resolutions
/// yield `None`, never an error.
pub fn suggest_max_zoom(pixel_resolution: f64) -> Option<u8> {
    if !pixel_resolution.is_finite() || pixel_resolution <= 0.0 {
        return None;
    }

    let zoom = (WEB_MERCATOR_BASE_RESOLUTION / pixel_resolution).log2().ceil();
    if !zoom.is_finite() {
        return None;
    }

    Some(zoom.clamp(0.0, f64::from(MAX_SUGGESTED_ZOOM)) as u8)
}

/// Derive preview metadata from a raster already warped into Web Mercator.
///
/// The only failure mode is being unable to open the raster or read its
/// transform; the zoom suggestion degrades to `None` rather than failing.
pub fn derive_preview(engine: &dyn RasterEngine, path: &Path) -> EngineResult<PreviewInfo> {
    let description = engine.describe(path)?;
    let transform = description.geotransform.ok_or_else(|| EngineError::Open {
        path: path.to_path_buf(),
        reason: "reprojected raster has no affine transform".to_string(),
    })?;

    let width = f64::from(description.width);
    let height = f64::from(description.height);
    let corners = [
        apply_geotransform(&transform, 0.0, 0.0),
        apply_geotransform(&transform, width, 0.0),
        apply_geotransform(&transform, width, height),
        apply_geotransform(&transform, 0.0, height),
    ];

    let geographic = engine.transform_points(WEB_MERCATOR_SRS, GEOGRAPHIC_SRS, &corners)?;

    let mut lats = Vec::with_capacity(geographic.len());
    let mut lngs = Vec::with_capacity(geographic.len());
    for (x, y) in geographic {
        // The engine hands back (lon, lat); correct the pair with latitude
        // first so an axis-swapped registry result is caught here.
        let (lat, lng) = correct_axis_order(y, x);
        lats.push(lat);
        lngs.push(lng);
    }

    let min_lat = lats.iter().copied().fold(f64::INFINITY, f64::min);
    let max_lat = lats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_lng = lngs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_lng = lngs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let suggested_max_zoom = suggest_max_zoom(transform[1].abs());
    debug!(
        path = %path.display(),
        ?suggested_max_zoom,
        "derived preview metadata"
    );

    Ok(PreviewInfo {
        raster_path: path.to_path_buf(),
        center_lat: (min_lat + max_lat) / 2.0,
        center_lng: (min_lng + max_lng) / 2.0,
        bounds_sw_lat: min_lat,
        bounds_sw_lng: min_lng,
        bounds_ne_lat: max_lat,
        bounds_ne_lng: max_lng,
        suggested_max_zoom,
    })
}
