//! Shepard inverse-distance surface.
//!
//! A cell takes the mean of its `max_points` nearest samples weighted by
//! `1 / d^power`, or a sample's value outright when one sits on its centre.

use rayon::prelude::*;
use stpgis_core::raster::Raster;
use stpgis_core::{Error, Result};

use super::{InterpolationGrid, SamplePoint};

#[derive(Debug, Clone)]
pub struct IdwParams {
    pub power: f64,
    /// Neighbourhood size, clamped to the sample count
    pub max_points: usize,
    pub snap_distance: f64,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            max_points: 15,
            snap_distance: 1e-10,
        }
    }
}

/// Cells stay NaN only if every neighbour weight underflows.
pub fn idw(points: &[SamplePoint], grid: &InterpolationGrid, params: &IdwParams) -> Result<Raster<f64>> {
    if points.is_empty() {
        return Err(Error::Algorithm("idw needs at least one sample".into()));
    }

    let (rows, cols) = (grid.rows, grid.cols);
    let transform = grid.transform;
    let k = params.max_points.clamp(1, points.len());
    let snap_sq = params.snap_distance * params.snap_distance;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut candidates: Vec<(f64, f64)> = Vec::with_capacity(points.len());

            for (col, out) in row_data.iter_mut().enumerate() {
                let (cx, cy) = transform.pixel_to_geo(col, row);

                candidates.clear();
                candidates.extend(points.iter().map(|pt| (pt.dist_sq(cx, cy), pt.value)));

                if candidates.len() > k {
                    candidates.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
                    candidates.truncate(k);
                }

                if let Some(&(_, v)) = candidates.iter().find(|(dsq, _)| *dsq < snap_sq) {
                    *out = v;
                    continue;
                }

                let mut sum_w = 0.0;
                let mut sum_wz = 0.0;
                for &(dsq, val) in &candidates {
                    let w = 1.0 / dsq.sqrt().powf(params.power);
                    sum_w += w;
                    sum_wz += w * val;
                }

                if sum_w > 0.0 {
                    *out = sum_wz / sum_w;
                }
            }

            row_data
        })
        .collect();

    grid.to_raster(data)
}
