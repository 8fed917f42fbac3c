//! Reprojection of one raster onto an aligned grid.

use super::AlignedGrid;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stpgis_core::raster::Raster;
use stpgis_core::{CoordTransform, Error, Result};

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    /// Value of the source cell containing the target centre (binary layers)
    Nearest,
    /// Distance-weighted mean of the four surrounding source centres
    Bilinear,
}

/// Destination value where the source has no data
const FILL: f64 = 0.0;

/// Resample `src` onto `grid`.
///
/// Each destination cell centre is mapped back into the source CRS and
/// sampled there. Cells falling outside the source, or on nodata, keep
/// the fill value 0.
pub fn resample_to_grid(src: &Raster<f64>, grid: &AlignedGrid, method: Resampling) -> Result<Raster<f64>> {
    let src_crs = src
        .crs()
        .ok_or_else(|| Error::Alignment("source raster has no CRS".into()))?;
    let to_src = CoordTransform::new(&grid.crs, src_crs)?;
    let dst_transform = grid.transform();
    let (rows, cols) = grid.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![FILL; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = dst_transform.pixel_to_geo(col, row);
                let (sx, sy) = to_src.transform(x, y);
                let (fc, fr) = src.geo_to_pixel(sx, sy);

                let sample = match method {
                    Resampling::Nearest => sample_nearest(src, fc, fr),
                    Resampling::Bilinear => sample_bilinear(src, fc, fr),
                };
                if let Some(v) = sample {
                    *out = v;
                }
            }
            row_data
        })
        .collect();

    let mut out = grid.zeros::<f64>();
    *out.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(out)
}

fn inside(src: &Raster<f64>, fc: f64, fr: f64) -> bool {
    fc >= 0.0 && fr >= 0.0 && fc < src.cols() as f64 && fr < src.rows() as f64
}

fn sample_nearest(src: &Raster<f64>, fc: f64, fr: f64) -> Option<f64> {
    if !inside(src, fc, fr) {
        return None;
    }
    let (row, col) = (fr.floor() as usize, fc.floor() as usize);
    src.get(row, col).ok().filter(|&v| !src.is_nodata(v))
}

fn sample_bilinear(src: &Raster<f64>, fc: f64, fr: f64) -> Option<f64> {
    if !inside(src, fc, fr) {
        return None;
    }

    // Offsets relative to cell centres
    let px = fc - 0.5;
    let py = fr - 0.5;
    let c0 = px.floor();
    let r0 = py.floor();
    let dx = px - c0;
    let dy = py - r0;

    let taps = [
        (r0, c0, (1.0 - dx) * (1.0 - dy)),
        (r0, c0 + 1.0, dx * (1.0 - dy)),
        (r0 + 1.0, c0, (1.0 - dx) * dy),
        (r0 + 1.0, c0 + 1.0, dx * dy),
    ];

    let mut sum_w = 0.0;
    let mut sum_wv = 0.0;
    for (r, c, w) in taps {
        if r < 0.0 || c < 0.0 || w <= 0.0 {
            continue;
        }
        if let Ok(v) = src.get(r as usize, c as usize) {
            if !src.is_nodata(v) {
                sum_w += w;
                sum_wv += w * v;
            }
        }
    }

    (sum_w > 1e-12).then(|| sum_wv / sum_w)
}
