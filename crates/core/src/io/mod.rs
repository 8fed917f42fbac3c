//! I/O for rasters, vector layers and derived text products.
//!
//! Every writer goes through a temp file in the destination directory that
//! is persisted only once fully written.

#[cfg(feature = "gdal")]
mod gdal_io;
mod geojson;
mod native;

#[cfg(feature = "gdal")]
pub use gdal_io::{read_geotiff, write_geotiff};

#[cfg(not(feature = "gdal"))]
pub use native::{read_geotiff, write_geotiff};

pub use geojson::{read_geojson, write_geojson};

use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Compression applied to written GeoTIFFs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    None,
    Lzw,
    #[default]
    Deflate,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub compression: TiffCompression,
}

/// 32 lowercase hex digits, fresh on every call
pub fn unique_suffix() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// `<dir>/<stem>_<32 hex>.<ext>`
pub fn unique_output_path(dir: impl AsRef<Path>, stem: &str, ext: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_{}.{}", stem, unique_suffix(), ext))
}

/// `InputNotFound` unless `path` exists
pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::InputNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Run `write` against a temp file next to `path`, then move it into place.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut std::fs::File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Write a text product (CSV, SLD, JSON) atomically.
pub fn write_text(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    write_atomically(path.as_ref(), |f| {
        f.write_all(contents.as_bytes())?;
        Ok(())
    })
}

/// Copy `src` to `dst` atomically; `dst` never holds a partial copy.
pub fn copy_atomically(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    ensure_exists(src)?;
    let mut reader = std::fs::File::open(src)?;
    write_atomically(dst.as_ref(), |f| {
        std::io::copy(&mut reader, f)?;
        Ok(())
    })
}
