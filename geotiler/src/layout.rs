//! Tile pyramid layout discovery.
//!
//! The external tiling tool normally writes `{z}/{x}/{y}` directly under
//! the output directory, but some environments introduce one extra
//! intermediate directory. This module probes for the actual pyramid root
//! and produces the URL template the preview page should use, relative to
//! the directory that holds the page.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Highest zoom directory name probed for when locating the pyramid root.
const MAX_PROBE_ZOOM: u32 = 30;

/// Discovered tile pyramid layout. Derived and ephemeral.
#[derive(Debug, Clone)]
pub struct TileLayout {
    /// Pyramid root relative to the probed directory; `"."` when the
    /// pyramid sits directly in it.
    pub relative_root: PathBuf,

    /// URL template with `{z}`/`{x}`/`{y}` placeholders, relative to the
    /// probed directory.
    pub url_template: String,

    /// One existing tile file, for diagnostics. Absent when no tile was
    /// found under the root.
    pub sample_tile: Option<PathBuf>,
}

/// Locate the tile pyramid under `out_dir` and build its URL template.
///
/// `extension` is the tile file extension without the leading dot. When no
/// zoom directory is found anywhere, the output directory itself is
/// assumed to be the root; the resulting template may then resolve to
/// nothing, which callers tolerate.
pub fn locate(out_dir: &Path, extension: &str) -> TileLayout {
    let root = find_pyramid_root(out_dir);

    let relative_root = root
        .strip_prefix(out_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from("."));
    let relative_root = if relative_root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative_root
    };

    let prefix = if relative_root == Path::new(".") {
        ".".to_string()
    } else {
        format!("./{}", relative_root.display())
    };
    let url_template = format!("{}/{{z}}/{{x}}/{{y}}.{}", prefix, extension);

    let sample_tile = find_sample_tile(&root, extension);
    debug!(
        out_dir = %out_dir.display(),
        template = %url_template,
        sample = ?sample_tile,
        "located tile layout"
    );

    TileLayout {
        relative_root,
        url_template,
        sample_tile,
    }
}

/// Find the directory that directly contains numeric zoom directories.
fn find_pyramid_root(out_dir: &Path) -> PathBuf {
    // Fast path: zoom directories directly under the output directory.
    if has_zoom_dir(out_dir) {
        return out_dir.to_path_buf();
    }

    // One level deeper, under an unknown intermediate directory.
    if let Ok(entries) = out_dir.read_dir() {
        for entry in entries.flatten() {
            let child = entry.path();
            if child.is_dir() && has_zoom_dir(&child) {
                return child;
            }
        }
    }

    // No evidence either way; assume the output directory and let the
    // template resolve to nothing if it must.
    warn!(
        out_dir = %out_dir.display(),
        "no zoom directories found; assuming tiles at output root"
    );
    out_dir.to_path_buf()
}

fn has_zoom_dir(dir: &Path) -> bool {
    (0..=MAX_PROBE_ZOOM).any(|zoom| dir.join(zoom.to_string()).is_dir())
}

/// Find one `<z>/<x>/<file>.<extension>` tile under `root`.
///
/// The traversal is limited to exactly that shape: numeric zoom directory,
/// numeric column directory, then files. Nothing deeper is visited.
fn find_sample_tile(root: &Path, extension: &str) -> Option<PathBuf> {
    for zoom_dir in numeric_subdirs(root) {
        for column_dir in numeric_subdirs(&zoom_dir) {
            let entries = match column_dir.read_dir() {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let matches_extension = path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case(extension))
                    .unwrap_or(false);
                if path.is_file() && matches_extension {
                    return Some(path);
                }
            }
        }
    }
    None
}

fn numeric_subdirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = match dir.read_dir() {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .map(|name| {
                            let name = name.to_string_lossy();
                            !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
                        })
                        .unwrap_or(false)
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    dirs.sort();
    dirs
}
