//! Static preview page generation.
//!
//! Renders one self-contained Leaflet document that overlays the generated
//! tile pyramid on a satellite base layer and zooms to the derived bounds.
//! Once written, the page has no further dependency on this library.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Filename of the generated preview document.
pub const PAGE_FILENAME: &str = "index.html";

/// Everything the preview page needs to render.
#[derive(Debug, Clone)]
pub struct PreviewPage {
    pub title: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub center_lat: f64,
    pub center_lng: f64,
    pub bounds_sw_lat: f64,
    pub bounds_sw_lng: f64,
    pub bounds_ne_lat: f64,
    pub bounds_ne_lng: f64,
    pub tiles_url_template: String,
}

impl PreviewPage {
    /// Render the page as a complete HTML document.
    pub fn render(&self) -> String {
        let initial_zoom = self
            .max_zoom
            .min(self.min_zoom.saturating_add(2))
            .max(self.min_zoom);

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <style>
        body {{ margin: 0; padding: 0; }}
        #map {{ width: 100%; height: 100vh; }}
    </style>
</head>
<body>
    <div id="map"></div>

    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <script>
        var satellite = L.tileLayer('https://{{s}}.google.com/vt/lyrs=s&x={{x}}&y={{y}}&z={{z}}', {{
            maxZoom: 20,
            subdomains: ['mt0', 'mt1', 'mt2', 'mt3'],
            attribution: 'Satellite imagery'
        }});

        var localTiles = L.tileLayer('{tiles}', {{
            minZoom: {min_zoom},
            maxZoom: {max_zoom},
            tms: false,
            opacity: 1.0,
            attribution: 'Local tiles'
        }});

        var map = L.map('map', {{
            center: [{center_lat}, {center_lng}],
            zoom: {initial_zoom},
            layers: [satellite, localTiles]
        }});

        L.control.layers(
            {{ "Satellite": satellite }},
            {{ "Local tiles": localTiles }}
        ).addTo(map);

        var bounds = L.latLngBounds(
            L.latLng({sw_lat}, {sw_lng}),
            L.latLng({ne_lat}, {ne_lng})
        );
        if (bounds.isValid()) {{
            map.fitBounds(bounds, {{ padding: [20, 20] }});
        }}
    </script>
</body>
</html>
"#,
            title = escape_html(&self.title),
            tiles = self.tiles_url_template,
            min_zoom = self.min_zoom,
            max_zoom = self.max_zoom,
            initial_zoom = initial_zoom,
            center_lat = self.center_lat,
            center_lng = self.center_lng,
            sw_lat = self.bounds_sw_lat,
            sw_lng = self.bounds_sw_lng,
            ne_lat = self.bounds_ne_lat,
            ne_lng = self.bounds_ne_lng,
        )
    }

    /// Write the rendered page into `dir` and return its path.
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(PAGE_FILENAME);
        std::fs::write(&path, self.render())?;
        debug!(path = %path.display(), "preview page written");
        Ok(path)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
