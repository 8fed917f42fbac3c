//! Min-max rescaling of criterion layers.

use ndarray::Array2;
use rayon::prelude::*;
use stpgis_core::raster::Raster;
use stpgis_core::{Error, Result};

/// Added to the denominator of the min-max rescale so constant layers
/// stay finite.
pub const NORMALIZE_EPSILON: f64 = 1e-6;

/// Rescale a criterion layer into `[0, 1]`.
///
/// Negative values are clamped to 0 first, then every cell becomes
/// `(x - min) / (max - min + NORMALIZE_EPSILON)` with `min`/`max` taken
/// over the clamped valid cells. NaN and nodata cells come out as NaN.
/// A constant layer maps to 0 everywhere.
///
/// # Example
/// ```ignore
/// let slope_score = normalize(&aligned.layers[0])?;
/// ```
pub fn normalize(raster: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();

    let clamped = |v: f64| if v < 0.0 { 0.0 } else { v };

    let range = raster
        .valid_values()
        .map(clamped)
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });

    let Some((min, max)) = range else {
        // Nothing valid: the layer is all NaN already
        let mut out = raster.like(f64::NAN);
        out.set_nodata(Some(f64::NAN));
        return Ok(out);
    };
    let denom = max - min + NORMALIZE_EPSILON;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if !raster.is_valid_at(row, col) {
                    continue;
                }
                if let Ok(v) = raster.get(row, col) {
                    *out = (clamped(v) - min) / denom;
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
