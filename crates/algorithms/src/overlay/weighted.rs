//! Weighted linear combination of aligned criterion layers.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stpgis_core::raster::Raster;
use stpgis_core::{Error, Result};

/// Ordered `(layer id, weight)` pairs.
///
/// Weights are used as given: they need not sum to 1 and the overlay is
/// a raw weighted sum, not a weighted mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    entries: Vec<(String, f64)>,
}

impl WeightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: impl Into<String>, weight: f64) {
        self.entries.push((id.into(), weight));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, w)| *w).collect()
    }

    /// `ShapeMismatch` unless there is exactly one weight per layer.
    pub fn check_len(&self, layers: usize) -> Result<()> {
        if self.len() != layers {
            return Err(Error::ShapeMismatch {
                weights: self.len(),
                layers,
            });
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for WeightSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(id, w)| (id.into(), w)).collect(),
        }
    }
}

/// Cell-wise `Σ weights[i] * rasters[i]`.
///
/// Cells whose sum is NaN (a NaN in any input) are written as 0. The
/// output carries the first raster's georeferencing and no nodata value.
///
/// # Errors
/// * `ShapeMismatch` when `weights.len() != rasters.len()`
/// * `SizeMismatch` when the rasters are not all the same size
/// * `InvalidParameter` when no raster is given
pub fn weighted_overlay(rasters: &[Raster<f64>], weights: &[f64]) -> Result<Raster<f64>> {
    if weights.len() != rasters.len() {
        return Err(Error::ShapeMismatch {
            weights: weights.len(),
            layers: rasters.len(),
        });
    }
    let first = rasters
        .first()
        .ok_or_else(|| Error::invalid_parameter("rasters", 0, "at least one layer is required"))?;

    let (rows, cols) = first.shape();
    for r in &rasters[1..] {
        if r.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: r.rows(),
                ac: r.cols(),
            });
        }
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (raster, &w) in rasters.iter().zip(weights) {
                let src = raster.data().row(row);
                for (acc, &v) in row_data.iter_mut().zip(src.iter()) {
                    *acc += w * v;
                }
            }
            for v in row_data.iter_mut() {
                if v.is_nan() {
                    *v = 0.0;
                }
            }
            row_data
        })
        .collect();

    let mut output = first.with_same_meta::<f64>(rows, cols);
    output.set_nodata(None);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
