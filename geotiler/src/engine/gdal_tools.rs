//! GDAL command-line adapter for the raster engine interface.
//!
//! Binds the GDAL tools installed on the PATH (`gdalinfo`, `gdal_edit.py`,
//! `gdaltransform`, `gdalwarp`, `gdal2tiles.py`, plus the Python binding
//! for GCP writes). Each operation is a single short-lived child process;
//! long-running tools stream their diagnostic lines back through the
//! caller-supplied log sink.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::debug;

use super::{EngineError, EngineResult, RasterDescription, RasterEngine};
use crate::georef::GroundControlPoint;

const GDALINFO: &str = "gdalinfo";
const GDAL_EDIT: &str = "gdal_edit.py";
const GDALTRANSFORM: &str = "gdaltransform";
const GDALWARP: &str = "gdalwarp";
const GDAL2TILES: &str = "gdal2tiles.py";
const PYTHON: &str = "python3";

/// Python snippet applying a GCP set through the GDAL binding.
///
/// `gdal_edit.py`'s `-gcp` flag cannot carry the id and info labels, so
/// GCP writes go through `SetGCPs`, which preserves them. The GCP list
/// and its projection arrive as JSON on stdin; the raster path is the
/// single argument.
const SET_GCPS_SCRIPT: &str = r#"
import json, sys
from osgeo import gdal
gdal.UseExceptions()
data = json.load(sys.stdin)
ds = gdal.Open(sys.argv[1], gdal.GA_Update)
gcps = [
    gdal.GCP(g['x'], g['y'], g['z'], g['pixel'], g['line'], g['id'], g['info'])
    for g in data['gcps']
]
ds.SetGCPs(gcps, data['gcp_projection_wkt'])
ds.FlushCache()
ds = None
"#;

/// Raster engine backed by the GDAL command-line tools.
///
/// Created through [`discover`], which probes the installation once and
/// fails fast with a diagnostic when no usable toolchain is present.
///
/// [`discover`]: GdalToolsEngine::discover
pub struct GdalToolsEngine {
    version: String,
}

impl GdalToolsEngine {
    /// Locate the GDAL tools and return an engine bound to them.
    pub fn discover() -> EngineResult<Self> {
        let output = Command::new(GDALINFO)
            .arg("--version")
            .output()
            .map_err(|e| {
                EngineError::Unavailable(format!(
                    "{} not found on PATH ({}); install GDAL with its Python utilities",
                    GDALINFO, e
                ))
            })?;

        if !output.status.success() {
            return Err(EngineError::Unavailable(format!(
                "{} --version exited with {}",
                GDALINFO,
                output.status.code().unwrap_or(-1)
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(version = %version, "raster engine resolved");
        Ok(Self { version })
    }

    /// Version string reported by the installation.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Coordinate-data environment applied to every child process.
    ///
    /// Computed once per process; values already present in the caller's
    /// environment are left untouched. Forcing the traditional GIS axis
    /// mapping keeps registries that default to latitude-first from leaking
    /// reversed pairs into transform output.
    fn runtime_env() -> &'static [(String, String)] {
        static ENV: OnceLock<Vec<(String, String)>> = OnceLock::new();
        ENV.get_or_init(|| {
            let defaults = [
                ("OSR_DEFAULT_AXIS_MAPPING_STRATEGY", "TRADITIONAL_GIS_ORDER"),
                ("GTIFF_SRS_SOURCE", "EPSG"),
                ("OSR_USE_NON_DEPRECATED", "YES"),
            ];
            defaults
                .iter()
                .filter(|(key, _)| std::env::var_os(key).is_none())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect()
        })
    }

    fn command(tool: &str) -> Command {
        let mut cmd = Command::new(tool);
        for (key, value) in Self::runtime_env() {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run a tool to completion and return its stdout.
    fn run(tool: &str, cmd: &mut Command) -> EngineResult<Vec<u8>> {
        let output = cmd.output().map_err(|e| {
            EngineError::Unavailable(format!("{} not found on PATH ({})", tool, e))
        })?;

        if !output.status.success() {
            return Err(EngineError::ToolFailure {
                tool: tool.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Run a tool to completion, feeding `input` to its stdin.
    fn run_with_input(tool: &str, cmd: &mut Command, input: &[u8]) -> EngineResult<Vec<u8>> {
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            EngineError::Unavailable(format!("{} not found on PATH ({})", tool, e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .map_err(|e| EngineError::ToolFailure {
                    tool: tool.to_string(),
                    code: -1,
                    stderr: e.to_string(),
                })?;
        }

        let output = child.wait_with_output().map_err(|e| EngineError::ToolFailure {
            tool: tool.to_string(),
            code: -1,
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(EngineError::ToolFailure {
                tool: tool.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Run a tool, forwarding each stdout line to `log` as it appears.
    fn run_streaming(tool: &str, cmd: &mut Command, log: &dyn Fn(&str)) -> EngineResult<()> {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            EngineError::Unavailable(format!("{} not found on PATH ({})", tool, e))
        })?;

        let stderr = child.stderr.take();
        let stderr_reader = std::thread::spawn(move || {
            let mut collected = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut collected);
            }
            collected
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) if !line.trim().is_empty() => log(line.trim_end()),
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }

        let status = child.wait().map_err(|e| EngineError::ToolFailure {
            tool: tool.to_string(),
            code: -1,
            stderr: e.to_string(),
        })?;
        let stderr_text = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(EngineError::ToolFailure {
                tool: tool.to_string(),
                code: status.code().unwrap_or(-1),
                stderr: stderr_text.trim().to_string(),
            });
        }

        Ok(())
    }

    fn require_exists(path: &Path) -> EngineResult<()> {
        if !path.exists() {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }
        Ok(())
    }

    /// Run `gdal_edit.py`, mapping failure to an update-mode open error.
    fn edit(path: &Path, args: &[String]) -> EngineResult<()> {
        let mut cmd = Self::command(GDAL_EDIT);
        cmd.args(args).arg(path);
        Self::run(GDAL_EDIT, &mut cmd).map_err(|e| match e {
            EngineError::ToolFailure { stderr, .. } => EngineError::Open {
                path: path.to_path_buf(),
                reason: format!("cannot update georeferencing: {}", stderr),
            },
            other => other,
        })?;
        Ok(())
    }
}

impl RasterEngine for GdalToolsEngine {
    fn describe(&self, path: &Path) -> EngineResult<RasterDescription> {
        Self::require_exists(path)?;

        let mut cmd = Self::command(GDALINFO);
        cmd.arg("-json").arg(path);
        let stdout = Self::run(GDALINFO, &mut cmd).map_err(|e| match e {
            EngineError::ToolFailure { stderr, .. } => EngineError::Open {
                path: path.to_path_buf(),
                reason: stderr,
            },
            other => other,
        })?;

        let report: GdalInfoReport =
            serde_json::from_slice(&stdout).map_err(|e| EngineError::MalformedOutput {
                tool: GDALINFO.to_string(),
                reason: e.to_string(),
            })?;

        report.into_description()
    }

    fn write_geotransform(&self, path: &Path, transform: [f64; 6]) -> EngineResult<()> {
        Self::require_exists(path)?;
        let mut args = vec!["-a_gt".to_string()];
        args.extend(transform.iter().map(|c| format_coefficient(*c)));
        Self::edit(path, &args)
    }

    fn write_projection(&self, path: &Path, wkt: &str) -> EngineResult<()> {
        Self::require_exists(path)?;
        Self::edit(path, &["-a_srs".to_string(), wkt.to_string()])
    }

    fn write_gcps(
        &self,
        path: &Path,
        gcps: &[GroundControlPoint],
        gcp_wkt: &str,
    ) -> EngineResult<()> {
        Self::require_exists(path)?;

        let mut cmd = Self::command(PYTHON);
        cmd.arg("-c").arg(SET_GCPS_SCRIPT).arg(path);
        let payload = gcp_payload(gcps, gcp_wkt);
        Self::run_with_input(PYTHON, &mut cmd, payload.as_bytes()).map_err(|e| match e {
            EngineError::ToolFailure { stderr, .. } => EngineError::Open {
                path: path.to_path_buf(),
                reason: format!("cannot update georeferencing: {}", stderr),
            },
            other => other,
        })?;
        Ok(())
    }

    fn transform_points(
        &self,
        src_srs: &str,
        dst_srs: &str,
        points: &[(f64, f64)],
    ) -> EngineResult<Vec<(f64, f64)>> {
        let mut input = String::new();
        for (x, y) in points {
            input.push_str(&format!("{} {}\n", x, y));
        }

        let mut cmd = Self::command(GDALTRANSFORM);
        cmd.args(["-s_srs", src_srs, "-t_srs", dst_srs, "-output_xy"]);
        let stdout = Self::run_with_input(GDALTRANSFORM, &mut cmd, input.as_bytes())?;

        let text = String::from_utf8_lossy(&stdout);
        let mut transformed = Vec::with_capacity(points.len());
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let mut fields = line.split_whitespace();
            let x = fields.next().and_then(|v| v.parse::<f64>().ok());
            let y = fields.next().and_then(|v| v.parse::<f64>().ok());
            match (x, y) {
                (Some(x), Some(y)) => transformed.push((x, y)),
                _ => {
                    return Err(EngineError::MalformedOutput {
                        tool: GDALTRANSFORM.to_string(),
                        reason: format!("unparseable coordinate line: {:?}", line),
                    })
                }
            }
        }

        if transformed.len() != points.len() {
            return Err(EngineError::MalformedOutput {
                tool: GDALTRANSFORM.to_string(),
                reason: format!(
                    "expected {} coordinate pairs, got {}",
                    points.len(),
                    transformed.len()
                ),
            });
        }

        Ok(transformed)
    }

    fn warp(
        &self,
        src: &Path,
        dst: &Path,
        target_srs: &str,
        log: &dyn Fn(&str),
    ) -> EngineResult<()> {
        Self::require_exists(src)?;

        let mut cmd = Self::command(GDALWARP);
        cmd.args(["-t_srs", target_srs])
            .args(["-r", "bilinear"])
            .arg("-multi")
            .arg("-dstalpha")
            .args(["-wo", "INIT_DEST=NO_DATA"])
            .args(["-co", "TILED=YES"])
            .args(["-co", "COMPRESS=DEFLATE"])
            .args(["-co", "PREDICTOR=2"])
            .args(["-co", "BIGTIFF=IF_SAFER"])
            .arg("-overwrite")
            .arg(src)
            .arg(dst);

        Self::run_streaming(GDALWARP, &mut cmd, log)
    }

    fn tile(
        &self,
        src: &Path,
        out_dir: &Path,
        min_zoom: u8,
        max_zoom: u8,
        log: &dyn Fn(&str),
    ) -> EngineResult<()> {
        Self::require_exists(src)?;

        let mut cmd = Self::command(GDAL2TILES);
        cmd.arg("--profile=mercator")
            .arg(format!("--zoom={}-{}", min_zoom, max_zoom))
            .arg("--xyz")
            .arg("--tiledriver=PNG")
            .arg("--webviewer=none")
            .arg("--resume")
            .arg("--exclude")
            .arg("--resampling=bilinear")
            .arg(src)
            .arg(out_dir);

        Self::run_streaming(GDAL2TILES, &mut cmd, log)
    }
}

/// Format a float so whole numbers keep a trailing `.0`, which the GDAL
/// utilities accept and which keeps logged argv unambiguous.
fn format_coefficient(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// JSON document fed to [`SET_GCPS_SCRIPT`] on stdin.
fn gcp_payload(gcps: &[GroundControlPoint], gcp_wkt: &str) -> String {
    serde_json::json!({
        "gcps": gcps,
        "gcp_projection_wkt": gcp_wkt,
    })
    .to_string()
}

/// `gdalinfo -json` report, reduced to the fields the engine exposes.
#[derive(Debug, Deserialize)]
struct GdalInfoReport {
    size: [u32; 2],
    #[serde(default, rename = "geoTransform")]
    geo_transform: Option<Vec<f64>>,
    #[serde(default, rename = "coordinateSystem")]
    coordinate_system: Option<WktBlock>,
    #[serde(default)]
    gcps: Option<GcpBlock>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct WktBlock {
    #[serde(default)]
    wkt: String,
}

#[derive(Debug, Default, Deserialize)]
struct GcpBlock {
    #[serde(default, rename = "coordinateSystem")]
    coordinate_system: Option<WktBlock>,
    #[serde(default, rename = "gcpList")]
    gcp_list: Vec<GcpEntry>,
}

#[derive(Debug, Deserialize)]
struct GcpEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    info: String,
    pixel: f64,
    line: f64,
    x: f64,
    y: f64,
    #[serde(default)]
    z: f64,
}

impl GdalInfoReport {
    fn into_description(self) -> EngineResult<RasterDescription> {
        let geotransform = match self.geo_transform {
            None => None,
            Some(coefficients) => {
                let array: [f64; 6] =
                    coefficients
                        .try_into()
                        .map_err(|bad: Vec<f64>| EngineError::MalformedOutput {
                            tool: GDALINFO.to_string(),
                            reason: format!("geotransform has {} coefficients", bad.len()),
                        })?;
                Some(array)
            }
        };

        let (gcp_projection_wkt, gcps) = match self.gcps {
            None => (String::new(), Vec::new()),
            Some(block) => (
                block.coordinate_system.unwrap_or_default().wkt,
                block
                    .gcp_list
                    .into_iter()
                    .map(|g| GroundControlPoint {
                        id: g.id,
                        info: g.info,
                        pixel: g.pixel,
                        line: g.line,
                        x: g.x,
                        y: g.y,
                        z: g.z,
                    })
                    .collect(),
            ),
        };

        // Default-domain items only; named domains stay with the raster.
        let metadata = self
            .metadata
            .and_then(|mut domains| domains.remove(""))
            .and_then(|default_domain| match default_domain {
                serde_json::Value::Object(items) => Some(items),
                _ => None,
            })
            .map(|items| {
                items
                    .into_iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(text) => (key, text),
                        other => (key, other.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(RasterDescription {
            width: self.size[0],
            height: self.size[1],
            geotransform,
            projection_wkt: self.coordinate_system.unwrap_or_default().wkt,
            gcp_projection_wkt,
            gcps,
            metadata,
        })
    }
}
