//! Georeference extraction.

use std::path::Path;

use tracing::debug;

use super::{GeorefError, GeorefRecord, GeorefResult, FORMAT_TAG};
use crate::engine::RasterEngine;

/// Extract a raster's georeferencing into an interchange record.
///
/// The raster is opened read-only through the engine. An absent affine
/// transform yields a record with no transform, not an error; projection
/// strings default to empty. GCPs are transcribed verbatim in raster
/// order.
pub fn extract(engine: &dyn RasterEngine, path: &Path) -> GeorefResult<GeorefRecord> {
    if !path.exists() {
        return Err(GeorefError::NotFound(path.to_path_buf()));
    }

    let description = engine.describe(path)?;
    debug!(
        path = %path.display(),
        width = description.width,
        height = description.height,
        gcps = description.gcps.len(),
        has_transform = description.geotransform.is_some(),
        "extracted georeferencing"
    );

    Ok(GeorefRecord {
        format: FORMAT_TAG.to_string(),
        source_file: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        raster_size: [description.width, description.height],
        geotransform: description.geotransform,
        projection_wkt: description.projection_wkt,
        gcp_projection_wkt: description.gcp_projection_wkt,
        gcps: description.gcps,
        metadata: description.metadata,
    })
}
