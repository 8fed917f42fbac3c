//! # STPGIS Core
//!
//! Core types and I/O for the STPGIS suitability / priority engine.
//!
//! This crate provides:
//! - `Raster<T>`: single-band georeferenced grid
//! - `GeoTransform`: affine georeferencing
//! - `CRS` and `CoordTransform`: CRS identity and pure-Rust reprojection
//! - `FeatureCollection`: boundary / zone polygons with attributes
//! - GeoTIFF and GeoJSON readers and writers that never leave partial files

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::{CoordTransform, CRS};
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{CoordTransform, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
