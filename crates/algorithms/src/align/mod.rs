//! Common-grid alignment of criterion and constraint layers.
//!
//! Layers arrive with their own CRS, resolution and extent. The aligner
//! projects every layer's bounds into the target CRS, takes their union,
//! and resamples each layer onto one north-up grid covering it.

mod resample;

pub use resample::{resample_to_grid, Resampling};

use std::path::{Path, PathBuf};
use stpgis_core::io::read_geotiff;
use stpgis_core::raster::{GeoTransform, Raster, RasterElement};
use stpgis_core::{CoordTransform, Error, Result, CRS};
use stpgis_parallel::{ParallelStrategy, ProcessingMode};
use tracing::{debug, info};

/// Target grid shared by every aligned layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedGrid {
    pub crs: CRS,
    /// Positive cell size `(res_x, res_y)`
    pub resolution: (f64, f64),
    /// Union extent `(min_x, min_y, max_x, max_y)` in `crs`
    pub bounds: (f64, f64, f64, f64),
    pub rows: usize,
    pub cols: usize,
}

impl AlignedGrid {
    /// Grid over `bounds` with `floor(extent / resolution)` cells per axis.
    pub fn from_bounds(crs: CRS, bounds: (f64, f64, f64, f64), resolution: (f64, f64)) -> Result<Self> {
        let (res_x, res_y) = resolution;
        if !(res_x > 0.0 && res_y > 0.0) {
            return Err(Error::invalid_parameter(
                "resolution",
                format!("{:?}", resolution),
                "cell sizes must be positive",
            ));
        }

        let (min_x, min_y, max_x, max_y) = bounds;
        let width = ((max_x - min_x) / res_x).floor();
        let height = ((max_y - min_y) / res_y).floor();

        if !(width >= 1.0 && height >= 1.0) {
            return Err(Error::Alignment(format!(
                "common extent {:?} holds no {}x{} cell",
                bounds, res_x, res_y
            )));
        }

        Ok(Self {
            crs,
            resolution,
            bounds,
            rows: height as usize,
            cols: width as usize,
        })
    }

    /// North-up transform anchored at the top-left corner of the union extent
    pub fn transform(&self) -> GeoTransform {
        GeoTransform::from_origin(self.bounds.0, self.bounds.3, self.resolution.0, self.resolution.1)
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Zero-filled raster carrying this grid's georeferencing
    pub fn zeros<T: RasterElement>(&self) -> Raster<T> {
        let mut raster = Raster::new(self.rows, self.cols);
        raster.set_transform(self.transform());
        raster.set_crs(Some(self.crs.clone()));
        raster
    }

    /// Whether `raster` sits exactly on this grid
    pub fn matches<T: RasterElement>(&self, raster: &Raster<T>) -> bool {
        raster.shape() == self.shape()
            && *raster.transform() == self.transform()
            && raster.crs().is_some_and(|c| c.is_equivalent(&self.crs))
    }
}

/// Write profile shared by every raster derived from the aligned stack:
/// single band, f32 on disk, the grid's CRS / transform / size and the
/// first layer's nodata value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceProfile {
    pub crs: CRS,
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
    pub nodata: Option<f64>,
}

impl ReferenceProfile {
    pub fn new(grid: &AlignedGrid, nodata: Option<f64>) -> Self {
        Self {
            crs: grid.crs.clone(),
            transform: grid.transform(),
            rows: grid.rows,
            cols: grid.cols,
            nodata,
        }
    }

    /// Stamp the profile's georeferencing and nodata onto a raster.
    pub fn apply(&self, raster: &mut Raster<f64>) -> Result<()> {
        if raster.shape() != (self.rows, self.cols) {
            let (ar, ac) = raster.shape();
            return Err(Error::SizeMismatch {
                er: self.rows,
                ec: self.cols,
                ar,
                ac,
            });
        }
        raster.set_transform(self.transform);
        raster.set_crs(Some(self.crs.clone()));
        raster.set_nodata(self.nodata);
        Ok(())
    }
}

/// Aligned layers in input order, plus the grid and profile they share.
#[derive(Debug, Clone)]
pub struct AlignedStack {
    pub grid: AlignedGrid,
    pub profile: ReferenceProfile,
    pub layers: Vec<Raster<f64>>,
}

impl AlignedStack {
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Read a georeferenced layer for alignment.
///
/// Missing files give `InputNotFound`; unreadable files or files without a
/// CRS give `Alignment`.
pub fn read_layer(path: &Path) -> Result<Raster<f64>> {
    let raster: Raster<f64> = read_geotiff(path, None).map_err(|e| match e {
        Error::InputNotFound { .. } => e,
        other => Error::Alignment(format!("cannot open {}: {}", path.display(), other)),
    })?;

    if raster.crs().is_none() {
        return Err(Error::Alignment(format!(
            "{} has no coordinate reference system",
            path.display()
        )));
    }
    Ok(raster)
}

/// Brings layers onto one grid in a target CRS and resolution.
#[derive(Debug, Clone)]
pub struct GridAligner {
    target_crs: CRS,
    resolution: (f64, f64),
    mode: ProcessingMode,
}

impl GridAligner {
    pub fn new(target_crs: CRS, resolution: (f64, f64)) -> Self {
        Self {
            target_crs,
            resolution,
            mode: ProcessingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn target_crs(&self) -> &CRS {
        &self.target_crs
    }

    /// Union of every layer's bounds projected into the target CRS.
    pub fn common_grid(&self, layers: &[Raster<f64>]) -> Result<AlignedGrid> {
        if layers.is_empty() {
            return Err(Error::Alignment("no layers to align".into()));
        }

        let mut union = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (i, layer) in layers.iter().enumerate() {
            let crs = layer
                .crs()
                .ok_or_else(|| Error::Alignment(format!("layer {} has no CRS", i)))?;
            let to_target = CoordTransform::new(crs, &self.target_crs)?;
            let b = to_target.transform_bounds(layer.bounds());
            debug!("layer {} bounds in {}: {:?}", i, self.target_crs, b);

            union.0 = union.0.min(b.0);
            union.1 = union.1.min(b.1);
            union.2 = union.2.max(b.2);
            union.3 = union.3.max(b.3);
        }

        AlignedGrid::from_bounds(self.target_crs.clone(), union, self.resolution)
    }

    /// Align in-memory layers with bilinear resampling.
    pub fn align_layers(&self, layers: &[Raster<f64>]) -> Result<AlignedStack> {
        let grid = self.common_grid(layers)?;
        info!(
            "Aligning {} layers onto {}x{} grid in {}",
            layers.len(),
            grid.cols,
            grid.rows,
            grid.crs
        );

        let aligned = self
            .mode
            .try_map_ordered(layers, |layer| resample_to_grid(layer, &grid, Resampling::Bilinear))?;

        let nodata = layers.first().and_then(|l| l.nodata());
        let profile = ReferenceProfile::new(&grid, nodata);

        Ok(AlignedStack {
            grid,
            profile,
            layers: aligned,
        })
    }

    /// Read and align raster files, keyed by input order.
    pub fn align_paths<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<AlignedStack> {
        let layers = self
            .mode
            .try_map_ordered(paths, |p| read_layer(p.as_ref()))?;
        self.align_layers(&layers)
    }

    /// Read each path and resample it onto an existing grid.
    pub fn align_to_grid(
        &self,
        paths: &[PathBuf],
        grid: &AlignedGrid,
        method: Resampling,
    ) -> Result<Vec<Raster<f64>>> {
        self.mode.try_map_ordered(paths, |p| {
            let layer = read_layer(p)?;
            resample_to_grid(&layer, grid, method)
        })
    }
}
