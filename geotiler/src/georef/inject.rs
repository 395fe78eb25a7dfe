//! Georeference injection.

use std::fs::{self, File};
use std::path::Path;

use tracing::debug;

use super::{GeorefError, GeorefRecord, GeorefResult};
use crate::engine::RasterEngine;

/// Apply a record's georeferencing to a copy of `raster_path` at
/// `output_path`.
///
/// The input raster is never mutated: its bytes are duplicated to the
/// output path first, and only the copy is opened for update. The format
/// tag is checked before anything is written, so a mismatched record
/// produces no output file. The affine transform is written only when
/// present, the projection only when non-empty, and GCPs only when the
/// list is non-empty (always paired with the GCP projection string, which
/// may itself be empty). The record's metadata map is never written back;
/// callers that need metadata propagation must do it themselves.
pub fn inject(
    engine: &dyn RasterEngine,
    record: &GeorefRecord,
    raster_path: &Path,
    output_path: &Path,
) -> GeorefResult<()> {
    record.ensure_format()?;

    if !raster_path.is_file() {
        return Err(GeorefError::NotFound(raster_path.to_path_buf()));
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| GeorefError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::copy(raster_path, output_path).map_err(|e| GeorefError::WriteFailed {
        path: output_path.to_path_buf(),
        source: e,
    })?;

    if let Some(transform) = record.geotransform {
        engine.write_geotransform(output_path, transform)?;
    }

    if !record.projection_wkt.is_empty() {
        engine.write_projection(output_path, &record.projection_wkt)?;
    }

    if !record.gcps.is_empty() {
        engine.write_gcps(output_path, &record.gcps, &record.gcp_projection_wkt)?;
    }

    // Make the copy durable before reporting success.
    let written = File::open(output_path).map_err(|e| GeorefError::WriteFailed {
        path: output_path.to_path_buf(),
        source: e,
    })?;
    written.sync_all().map_err(|e| GeorefError::WriteFailed {
        path: output_path.to_path_buf(),
        source: e,
    })?;

    debug!(
        output = %output_path.display(),
        gcps = record.gcps.len(),
        "georeferencing injected"
    );
    Ok(())
}

/// Read a georeference document and inject it into a copy of `raster_path`.
pub fn apply_document(
    engine: &dyn RasterEngine,
    document_path: &Path,
    raster_path: &Path,
    output_path: &Path,
) -> GeorefResult<()> {
    let record = GeorefRecord::read(document_path)?;
    inject(engine, &record, raster_path, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::MockEngine;
    use crate::engine::RasterDescription;
    use crate::georef::{extract, GroundControlPoint, FORMAT_TAG};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_raster(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn georeferenced_record() -> GeorefRecord {
        GeorefRecord {
            format: FORMAT_TAG.to_string(),
            source_file: "a.tif".to_string(),
            raster_size: [100, 100],
            geotransform: Some([399960.0, 10.0, 0.0, 4700040.0, 0.0, -10.0]),
            projection_wkt: "PROJCS[\"UTM 33N\"]".to_string(),
            gcp_projection_wkt: "GEOGCS[\"WGS 84\"]".to_string(),
            gcps: vec![GroundControlPoint {
                id: "1".to_string(),
                info: "corner".to_string(),
                pixel: 0.0,
                line: 0.0,
                x: 10.0,
                y: 47.0,
                z: 0.0,
            }],
            metadata: BTreeMap::from([("TIFFTAG_SOFTWARE".to_string(), "editor".to_string())]),
        }
    }

    #[test]
    fn test_inject_writes_only_to_the_copy() {
        let dir = TempDir::new().unwrap();
        let source = write_raster(&dir, "edited.tif", b"edited pixel bytes");
        let output = dir.path().join("edited_georef.tif");

        let engine = MockEngine::new();
        engine.register(&output, RasterDescription::default());

        inject(&engine, &georeferenced_record(), &source, &output).unwrap();

        // Source bytes untouched, output is a byte-for-byte copy.
        assert_eq!(std::fs::read(&source).unwrap(), b"edited pixel bytes");
        assert_eq!(std::fs::read(&output).unwrap(), b"edited pixel bytes");

        let written = engine.description(&output).unwrap();
        assert_eq!(
            written.geotransform,
            Some([399960.0, 10.0, 0.0, 4700040.0, 0.0, -10.0])
        );
        assert_eq!(written.projection_wkt, "PROJCS[\"UTM 33N\"]");
        assert_eq!(written.gcps.len(), 1);
        assert_eq!(written.gcp_projection_wkt, "GEOGCS[\"WGS 84\"]");
    }

    #[test]
    fn test_inject_skips_absent_fields() {
        let dir = TempDir::new().unwrap();
        let source = write_raster(&dir, "bare.tif", b"bytes");
        let output = dir.path().join("bare_georef.tif");

        let engine = MockEngine::new();
        let preexisting = RasterDescription {
            projection_wkt: "PROJCS[\"existing\"]".to_string(),
            ..RasterDescription::default()
        };
        engine.register(&output, preexisting);

        let record = GeorefRecord {
            geotransform: None,
            projection_wkt: String::new(),
            gcps: Vec::new(),
            ..georeferenced_record()
        };
        inject(&engine, &record, &source, &output).unwrap();

        // Nothing was written: the copy keeps whatever it already had.
        let written = engine.description(&output).unwrap();
        assert_eq!(written.geotransform, None);
        assert_eq!(written.projection_wkt, "PROJCS[\"existing\"]");
        assert!(written.gcps.is_empty());
    }

    #[test]
    fn test_inject_never_propagates_metadata() {
        let dir = TempDir::new().unwrap();
        let source = write_raster(&dir, "m.tif", b"bytes");
        let output = dir.path().join("m_georef.tif");

        let engine = MockEngine::new();
        engine.register(&output, RasterDescription::default());

        inject(&engine, &georeferenced_record(), &source, &output).unwrap();

        let written = engine.description(&output).unwrap();
        assert!(written.metadata.is_empty());
    }

    #[test]
    fn test_inject_format_gate_produces_no_output() {
        let dir = TempDir::new().unwrap();
        let source = write_raster(&dir, "gate.tif", b"bytes");
        let output = dir.path().join("gate_georef.tif");

        let engine = MockEngine::new();
        let record = GeorefRecord {
            format: "geotiler_georef_v0".to_string(),
            ..georeferenced_record()
        };

        let result = inject(&engine, &record, &source, &output);
        assert!(matches!(
            result,
            Err(GeorefError::UnsupportedFormat { .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_inject_missing_raster_is_not_found() {
        let engine = MockEngine::new();
        let result = inject(
            &engine,
            &georeferenced_record(),
            Path::new("/nowhere/pixels.tif"),
            Path::new("/nowhere/out.tif"),
        );
        assert!(matches!(result, Err(GeorefError::NotFound(_))));
    }

    #[test]
    fn test_round_trip_between_unrelated_rasters() {
        let dir = TempDir::new().unwrap();
        let raster_a = write_raster(&dir, "a.tif", b"raster a");
        let raster_b = write_raster(&dir, "b.tif", b"raster b, different pixels");
        let output = dir.path().join("b_georef.tif");

        let engine = MockEngine::new();
        engine.register(
            &raster_a,
            RasterDescription {
                width: 100,
                height: 100,
                geotransform: Some([399960.0, 10.0, 0.0, 4700040.0, 0.0, -10.0]),
                projection_wkt: "PROJCS[\"UTM 33N\"]".to_string(),
                gcp_projection_wkt: "GEOGCS[\"WGS 84\"]".to_string(),
                gcps: vec![GroundControlPoint {
                    id: "7".to_string(),
                    info: "tie".to_string(),
                    pixel: 12.5,
                    line: 99.0,
                    x: 10.123456789,
                    y: 47.987654321,
                    z: 1.5,
                }],
                metadata: BTreeMap::from([("SOURCE".to_string(), "survey".to_string())]),
            },
        );
        engine.register(&output, RasterDescription::default());

        let original = extract(&engine, &raster_a).unwrap();
        inject(&engine, &original, &raster_b, &output).unwrap();
        let reextracted = extract(&engine, &output).unwrap();

        assert_eq!(reextracted.geotransform, original.geotransform);
        assert_eq!(reextracted.projection_wkt, original.projection_wkt);
        assert_eq!(reextracted.gcps, original.gcps);
        assert_eq!(reextracted.gcp_projection_wkt, original.gcp_projection_wkt);
        // Metadata is intentionally excluded from the round trip.
        assert!(reextracted.metadata.is_empty());
    }

    #[test]
    fn test_apply_document_end_to_end() {
        let dir = TempDir::new().unwrap();
        let document = dir.path().join("a.georef.json");
        let raster = write_raster(&dir, "pixels.tif", b"pixels");
        let output = dir.path().join("pixels_georef.tif");

        georeferenced_record().write(&document).unwrap();

        let engine = MockEngine::new();
        engine.register(&output, RasterDescription::default());

        apply_document(&engine, &document, &raster, &output).unwrap();
        let written = engine.description(&output).unwrap();
        assert!(written.geotransform.is_some());
    }

    #[test]
    fn test_apply_document_missing_document_is_not_found() {
        let dir = TempDir::new().unwrap();
        let raster = write_raster(&dir, "pixels.tif", b"pixels");

        let engine = MockEngine::new();
        let result = apply_document(
            &engine,
            Path::new("/nowhere/doc.json"),
            &raster,
            &dir.path().join("out.tif"),
        );
        assert!(matches!(result, Err(GeorefError::NotFound(_))));
    }
}
