//! In-memory grid with georeferencing

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// One band of cells plus where it sits on the ground.
///
/// Cells are indexed `(row, col)`; row 0 is the northern edge on a
/// north-up transform. NaN is always treated as no-data for float cells,
/// in addition to the explicit `nodata` sentinel.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Build from row-major cells. `data.len()` must equal `rows * cols`.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Array2::from_shape_vec((rows, cols), data)
            .map(Self::from_array)
            .map_err(|e| Error::Other(e.to_string()))
    }

    /// Wrap an array with an identity-like transform and no CRS.
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Zeroed raster of any cell type placed on this raster's transform and CRS.
    /// The no-data value is not carried over since `U` may not represent it.
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Copy of the georeferencing and no-data with every cell set to `fill`.
    pub fn like(&self, fill: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill),
            ..self.clone_meta()
        }
    }

    fn clone_meta(&self) -> Self {
        Self {
            data: Array2::zeros((0, 0)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        match self.data.get((row, col)) {
            Some(v) => Ok(*v),
            None => Err(self.out_of_bounds(row, col)),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Ground extent `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Ground position of the centre of `(col, row)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Fractional `(col, row)` of a ground position
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// False for no-data cells and for indices outside the grid.
    pub fn is_valid_at(&self, row: usize, col: usize) -> bool {
        match self.data.get((row, col)) {
            Some(v) => !self.is_nodata(*v),
            None => false,
        }
    }

    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .filter(move |v| !self.is_nodata(**v))
            .filter_map(|v| v.to_f64())
    }

    /// Smallest and largest valid value; `None` on an all-no-data grid.
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        let stats = self.statistics();
        stats.min.zip(stats.max)
    }

    pub fn statistics(&self) -> RasterStatistics {
        let mut stats = RasterStatistics::default();
        let mut sum = 0.0;
        for v in self.valid_values() {
            stats.min = Some(stats.min.map_or(v, |m| m.min(v)));
            stats.max = Some(stats.max.map_or(v, |m| m.max(v)));
            sum += v;
            stats.valid_count += 1;
        }
        if stats.valid_count > 0 {
            stats.mean = Some(sum / stats.valid_count as f64);
        }
        stats.nodata_count = self.len() - stats.valid_count;
        stats
    }

    /// Widen to `f64`; no-data cells become NaN, which is also the new sentinel.
    pub fn to_f64(&self) -> Raster<f64> {
        let data = self.data.mapv(|v| {
            if self.is_nodata(v) {
                f64::NAN
            } else {
                v.to_f64().unwrap_or(f64::NAN)
            }
        });
        Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: Some(f64::NAN),
        }
    }
}

/// Summary over the valid cells of a raster
#[derive(Debug, Clone, Default)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
