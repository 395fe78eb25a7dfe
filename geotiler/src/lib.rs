//! GeoTiler - georeferenced raster preparation for web tile publishing
//!
//! This library prepares georeferenced imagery for web map viewers and
//! transplants geospatial metadata between raster files. The heavy raster
//! work (reprojection, tile rasterization) is delegated to an external
//! engine behind the [`engine::RasterEngine`] interface; this crate
//! orchestrates it and derives the higher-level metadata: preview bounds
//! and zoom suggestions, tile pyramid layout, and a lossless georeference
//! interchange format.

pub mod config;
pub mod engine;
pub mod georef;
pub mod layout;
pub mod logging;
pub mod page;
pub mod pipeline;
pub mod preview;
