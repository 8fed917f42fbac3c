//! Error types for STPGIS

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for STPGIS operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced raster or vector file does not exist.
    #[error("Input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// CRS could not be determined, or a layer could not be brought onto the common grid.
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// Number of weights differs from the number of criterion layers.
    #[error("Shape mismatch: {weights} weights for {layers} layers")]
    ShapeMismatch { weights: usize, layers: usize },

    /// A mask, clip or selection left no valid cell or feature.
    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Vector error: {0}")]
    Vector(String),

    /// Linear system without a unique solution (kriging weights).
    #[error("Singular system: {0}")]
    SingularSystem(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Vector(e.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(e: tempfile::PersistError) -> Self {
        Error::Io(e.error)
    }
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for STPGIS operations
pub type Result<T> = std::result::Result<T, Error>;
