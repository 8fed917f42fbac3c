//! Pixel-to-ground affine transform

use serde::{Deserialize, Serialize};

/// Six-coefficient affine transform.
///
/// `(col, row)` maps to ground `(x, y)` as
/// `x = origin_x + col * pixel_width + row * row_rotation` and
/// `y = origin_y + col * col_rotation + row * pixel_height`.
/// The grids this crate produces are north-up: no rotation and a
/// negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

const ROTATION_TOLERANCE: f64 = 1e-10;

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// North-up grid whose top-left corner is `(west, north)`; both
    /// resolutions are given as positive sizes.
    pub fn from_origin(west: f64, north: f64, res_x: f64, res_y: f64) -> Self {
        Self::new(west, north, res_x, -res_y)
    }

    /// From the GDAL coefficient array.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        let [origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height] = coeffs;
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation,
            col_rotation,
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    fn forward(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Ground position of the centre of cell `(col, row)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.forward(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional `(col, row)`; flooring gives the containing cell.
    /// NaN for a singular transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }
        let (dx, dy) = (x - self.origin_x, y - self.origin_y);
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (self.pixel_width * dy - self.col_rotation * dx) / det,
        )
    }

    /// Positive `(res_x, res_y)`
    pub fn resolution(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < ROTATION_TOLERANCE
            && self.col_rotation.abs() < ROTATION_TOLERANCE
            && self.pixel_width > 0.0
            && self.pixel_height < 0.0
    }

    /// Transform for a sub-grid starting at cell `(col_off, row_off)`.
    pub fn window(&self, col_off: usize, row_off: usize) -> Self {
        let (origin_x, origin_y) = self.forward(col_off as f64, row_off as f64);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Envelope `(min_x, min_y, max_x, max_y)` of a `cols` x `rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let (w, h) = (cols as f64, rows as f64);
        [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
            .into_iter()
            .map(|(c, r)| self.forward(c, r))
            .fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |b, (x, y)| (b.0.min(x), b.1.min(y), b.2.max(x), b.3.max(y)),
            )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::from_origin(0.0, 0.0, 1.0, 1.0)
    }
}
