//! Exact thin plate spline: an affine plane plus `r² ln r` radial terms,
//! one per sample.

use rayon::prelude::*;
use stpgis_core::raster::Raster;
use stpgis_core::{Error, Result};

use super::linalg::LuFactor;
use super::{InterpolationGrid, SamplePoint};

#[inline]
fn tps_kernel(r: f64) -> f64 {
    if r < 1e-15 {
        0.0
    } else {
        r * r * r.ln()
    }
}

/// Thin plate spline through `points`, evaluated on `grid`.
///
/// Coordinates are centred on the sample mean before solving so the
/// affine block stays well conditioned in projected coordinates.
///
/// # Errors
/// - fewer than 3 points
/// - `SingularSystem` for collinear or duplicated points
pub fn tps_interpolation(points: &[SamplePoint], grid: &InterpolationGrid) -> Result<Raster<f64>> {
    let n = points.len();
    if n < 3 {
        return Err(Error::Algorithm(format!(
            "spline needs 3 or more samples, got {}",
            n
        )));
    }

    let cx = points.iter().map(|p| p.x).sum::<f64>() / n as f64;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n as f64;
    let local: Vec<(f64, f64)> = points.iter().map(|p| (p.x - cx, p.y - cy)).collect();

    // [K  P] [w]   [z]
    // [Pᵀ 0] [a] = [0]
    let m = n + 3;
    let mut mat = vec![0.0_f64; m * m];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let r = ((local[i].0 - local[j].0).powi(2) + (local[i].1 - local[j].1).powi(2)).sqrt();
                mat[i * m + j] = tps_kernel(r);
            }
        }
        mat[i * m + n] = 1.0;
        mat[i * m + n + 1] = local[i].0;
        mat[i * m + n + 2] = local[i].1;
        mat[n * m + i] = 1.0;
        mat[(n + 1) * m + i] = local[i].0;
        mat[(n + 2) * m + i] = local[i].1;
    }

    let mut rhs = vec![0.0_f64; m];
    for (r, p) in rhs.iter_mut().zip(points) {
        *r = p.value;
    }
    let coeffs = LuFactor::new(m, mat)?.solve(&rhs);
    let weights = &coeffs[..n];
    let (a1, a2, a3) = (coeffs[n], coeffs[n + 1], coeffs[n + 2]);

    let (rows, cols) = (grid.rows, grid.cols);
    let transform = grid.transform;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = transform.pixel_to_geo(col, row);
                let (x, y) = (x - cx, y - cy);
                let mut val = a1 + a2 * x + a3 * y;
                for (w, &(px, py)) in weights.iter().zip(&local) {
                    let r = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
                    val += w * tps_kernel(r);
                }
                *out = val;
            }
            row_data
        })
        .collect();

    grid.to_raster(data)
}
