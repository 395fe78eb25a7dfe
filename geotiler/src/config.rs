//! Pipeline configuration.

use std::path::PathBuf;

/// Default zoom range when the caller does not specify one.
pub const DEFAULT_MIN_ZOOM: u8 = 0;
pub const DEFAULT_MAX_ZOOM: u8 = 18;

/// Configuration for one tiling pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source raster to publish.
    pub source: PathBuf,

    /// Directory receiving the tile pyramid and the preview page.
    pub output_dir: PathBuf,

    /// Inclusive zoom range handed to the tiling tool.
    pub min_zoom: u8,
    pub max_zoom: u8,

    /// Keep the reprojected intermediate instead of cleaning it up.
    pub keep_intermediate: bool,

    /// Tile file extension, without the leading dot.
    pub tile_extension: String,

    /// Preview page title; the source filename when unset.
    pub title: Option<String>,
}

impl PipelineConfig {
    /// Create a configuration with default zoom range and cleanup policy.
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            keep_intermediate: false,
            tile_extension: "png".to_string(),
            title: None,
        }
    }

    /// Set the inclusive zoom range.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Keep or discard the reprojected intermediate.
    pub fn with_keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    /// Set the preview page title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title to display on the preview page.
    pub fn page_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => self
                .source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "preview".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::new("/in/scene.tif", "/out");
        assert_eq!(config.min_zoom, DEFAULT_MIN_ZOOM);
        assert_eq!(config.max_zoom, DEFAULT_MAX_ZOOM);
        assert!(!config.keep_intermediate);
        assert_eq!(config.tile_extension, "png");
    }

    #[test]
    fn test_page_title_falls_back_to_source_name() {
        let config = PipelineConfig::new("/in/scene.tif", "/out");
        assert_eq!(config.page_title(), "scene.tif");

        let titled = config.with_title("Survey 12");
        assert_eq!(titled.page_title(), "Survey 12");
    }

    #[test]
    fn test_builder_methods_chain() {
        let config = PipelineConfig::new("/in/a.tif", "/out")
            .with_zoom_range(4, 16)
            .with_keep_intermediate(true);
        assert_eq!((config.min_zoom, config.max_zoom), (4, 16));
        assert!(config.keep_intermediate);
    }
}
