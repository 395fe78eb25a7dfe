//! The georeference interchange record and its JSON document form.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{GeorefError, GeorefResult};

/// Fixed format tag carried by every interchange document.
///
/// The injector fails closed on anything else.
pub const FORMAT_TAG: &str = "geotiler_georef_v1";

/// Longest WKT prefix shown by [`GeorefRecord::preview_text`].
const PREVIEW_WKT_LIMIT: usize = 800;

/// A pixel/line to map-space correspondence.
///
/// Immutable once read; order within a record is preserved end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundControlPoint {
    pub id: String,
    pub info: String,
    pub pixel: f64,
    pub line: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Complete georeferencing of one raster, independent of its container
/// format.
///
/// Projection fields default to the empty string rather than null so the
/// serialized document stays uniform. When `gcps` is non-empty,
/// `gcp_projection_wkt` is expected (though not required) to be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeorefRecord {
    /// Format tag; must equal [`FORMAT_TAG`] to be accepted by the injector.
    pub format: String,

    /// Basename of the raster the record was extracted from. Informational.
    pub source_file: String,

    /// Raster width and height in pixels.
    pub raster_size: [u32; 2],

    /// Affine transform, absent when the source raster carried none.
    pub geotransform: Option<[f64; 6]>,

    /// Projection WKT; empty when the raster reports none.
    #[serde(default)]
    pub projection_wkt: String,

    /// Projection WKT of the GCP set; empty when none.
    #[serde(default)]
    pub gcp_projection_wkt: String,

    /// Ground control points in raster order.
    #[serde(default)]
    pub gcps: Vec<GroundControlPoint>,

    /// Default-domain metadata of the source raster. Carried for reference
    /// only; the injector never writes it back.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl GeorefRecord {
    /// Whether the record carries our format tag.
    pub fn has_expected_format(&self) -> bool {
        self.format == FORMAT_TAG
    }

    /// Fail with [`GeorefError::UnsupportedFormat`] unless the tag matches.
    pub fn ensure_format(&self) -> GeorefResult<()> {
        if self.has_expected_format() {
            Ok(())
        } else {
            Err(GeorefError::UnsupportedFormat {
                found: self.format.clone(),
            })
        }
    }

    /// Read a record from a JSON document, enforcing the format tag.
    pub fn read(path: &Path) -> GeorefResult<Self> {
        if !path.is_file() {
            return Err(GeorefError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| GeorefError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let record: GeorefRecord = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            GeorefError::InvalidDocument {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        record.ensure_format()?;
        Ok(record)
    }

    /// Write the record as a pretty-printed JSON document.
    ///
    /// Parent directories are created as needed.
    pub fn write(&self, path: &Path) -> GeorefResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| GeorefError::WriteFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let file = File::create(path).map_err(|e| GeorefError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| GeorefError::WriteFailed {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| GeorefError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(())
    }

    /// Human-readable summary of the record for terminal display.
    pub fn preview_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Source file: {}", self.source_file);
        let _ = writeln!(
            out,
            "Raster size: {} x {}",
            self.raster_size[0], self.raster_size[1]
        );
        match self.geotransform {
            Some(gt) => {
                let _ = writeln!(out, "GeoTransform: {:?}", gt);
            }
            None => {
                let _ = writeln!(out, "GeoTransform: (none)");
            }
        }
        let _ = writeln!(out, "Projection WKT:");
        let _ = writeln!(out, "{}", shorten_wkt(&self.projection_wkt));
        let _ = writeln!(out, "GCP count: {}", self.gcps.len());
        if !self.gcps.is_empty() {
            for (index, gcp) in self.gcps.iter().take(5).enumerate() {
                let _ = writeln!(
                    out,
                    "{}. pixel/line=({}, {}) -> x/y/z=({}, {}, {}) id={}",
                    index + 1,
                    gcp.pixel,
                    gcp.line,
                    gcp.x,
                    gcp.y,
                    gcp.z,
                    gcp.id
                );
            }
            let _ = writeln!(out, "GCP projection WKT:");
            let _ = writeln!(out, "{}", shorten_wkt(&self.gcp_projection_wkt));
        }
        out
    }
}

fn shorten_wkt(wkt: &str) -> String {
    let wkt = wkt.trim();
    if wkt.is_empty() {
        return "(empty)".to_string();
    }
    if wkt.len() <= PREVIEW_WKT_LIMIT {
        return wkt.to_string();
    }
    let mut cut = PREVIEW_WKT_LIMIT;
    while !wkt.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated)", &wkt[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record() -> GeorefRecord {
        GeorefRecord {
            format: FORMAT_TAG.to_string(),
            source_file: "scene.tif".to_string(),
            raster_size: [4096, 2048],
            geotransform: Some([399960.0, 10.0, 0.0, 4700040.0, 0.0, -10.0]),
            projection_wkt: "PROJCS[\"WGS 84 / UTM zone 33N\"]".to_string(),
            gcp_projection_wkt: String::new(),
            gcps: Vec::new(),
            metadata: BTreeMap::from([("AREA_OR_POINT".to_string(), "Area".to_string())]),
        }
    }

    #[test]
    fn test_record_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.georef.json");

        let record = sample_record();
        record.write(&path).unwrap();
        let restored = GeorefRecord::read(&path).unwrap();

        assert_eq!(restored, record);
    }

    #[test]
    fn test_record_document_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        for field in [
            "format",
            "source_file",
            "raster_size",
            "geotransform",
            "projection_wkt",
            "gcp_projection_wkt",
            "gcps",
            "metadata",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(json["format"], FORMAT_TAG);
    }

    #[test]
    fn test_absent_geotransform_serializes_as_null() {
        let mut record = sample_record();
        record.geotransform = None;
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["geotransform"].is_null());
    }

    #[test]
    fn test_read_rejects_foreign_format_tag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.json");
        let mut record = sample_record();
        record.format = "someone_elses_georef".to_string();
        // Write without the gate to simulate a foreign producer.
        std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

        let result = GeorefRecord::read(&path);
        assert!(matches!(
            result,
            Err(GeorefError::UnsupportedFormat { found }) if found == "someone_elses_georef"
        ));
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let result = GeorefRecord::read(Path::new("/no/such/file.json"));
        assert!(matches!(result, Err(GeorefError::NotFound(_))));
    }

    #[test]
    fn test_read_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = GeorefRecord::read(&path);
        assert!(matches!(result, Err(GeorefError::InvalidDocument { .. })));
    }

    #[test]
    fn test_gcp_order_preserved_through_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gcps.json");

        let mut record = sample_record();
        record.geotransform = None;
        record.gcp_projection_wkt = "GEOGCS[\"WGS 84\"]".to_string();
        record.gcps = (0..10)
            .map(|i| GroundControlPoint {
                id: format!("{}", i),
                info: String::new(),
                pixel: f64::from(i),
                line: 0.0,
                x: 10.0 + f64::from(i) * 0.001,
                y: 47.0,
                z: 0.0,
            })
            .collect();

        record.write(&path).unwrap();
        let restored = GeorefRecord::read(&path).unwrap();

        let ids: Vec<&str> = restored.gcps.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
    }

    #[test]
    fn test_preview_text_mentions_size_and_gcps() {
        let mut record = sample_record();
        record.gcps.push(GroundControlPoint {
            id: "7".to_string(),
            info: "corner".to_string(),
            pixel: 1.5,
            line: 2.5,
            x: 10.0,
            y: 47.0,
            z: 0.0,
        });

        let text = record.preview_text();
        assert!(text.contains("4096 x 2048"));
        assert!(text.contains("GCP count: 1"));
        assert!(text.contains("id=7"));
    }

    #[test]
    fn test_preview_text_truncates_long_wkt() {
        let mut record = sample_record();
        record.projection_wkt = "X".repeat(2000);
        let text = record.preview_text();
        assert!(text.contains("(truncated)"));
    }
}
