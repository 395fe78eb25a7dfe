//! Georeference interchange between rasters.
//!
//! A [`GeorefRecord`] captures everything that georeferences a raster
//! (affine transform, projection, ground control points) in a container
//! independent of any raster format. The extractor builds a record from a
//! raster; the injector applies a record to a byte-for-byte copy of
//! another raster without touching pixel data. The record round-trips
//! through a JSON document so the two halves can run on different
//! machines.

mod error;
mod extract;
mod inject;
mod record;

pub use error::{GeorefError, GeorefResult};
pub use extract::extract;
pub use inject::{apply_document, inject};
pub use record::{GeorefRecord, GroundControlPoint, FORMAT_TAG};
