//! Binary exclusion masks.
//!
//! A constraint layer allows a cell when its value is at least 1. Masks
//! combine by cell-wise product, so one disqualifying layer zeroes the
//! cell whatever its score.

use crate::align::{AlignedGrid, GridAligner, Resampling};
use ndarray::Zip;
use std::path::PathBuf;
use stpgis_core::raster::Raster;
use stpgis_core::{Error, Result};
use tracing::{debug, warn};

/// Ordered constraint raster paths. Empty means no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    paths: Vec<PathBuf>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Read every constraint, resample it onto `grid` with nearest
    /// neighbour, binarise and AND the results. An empty set yields an
    /// all-ones mask.
    pub fn build_mask(&self, aligner: &GridAligner, grid: &AlignedGrid) -> Result<Raster<u8>> {
        let layers = aligner.align_to_grid(&self.paths, grid, Resampling::Nearest)?;
        let masks: Vec<Raster<u8>> = layers.iter().map(binary_mask).collect();
        let combined = combine_masks(grid, &masks)?;

        debug!(
            "{} constraint layers leave {} of {} cells allowed",
            self.len(),
            count_allowed(&combined),
            combined.len()
        );
        Ok(combined)
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// `1` where `value >= 1`, `0` elsewhere (NaN included).
pub fn binary_mask(layer: &Raster<f64>) -> Raster<u8> {
    let mut mask = layer.with_same_meta::<u8>(layer.rows(), layer.cols());
    Zip::from(mask.data_mut())
        .and(layer.data())
        .par_for_each(|m, &v| *m = u8::from(v >= 1.0));
    mask.set_nodata(None);
    mask
}

/// Logical AND of `masks`, starting from an all-ones mask on `grid`.
pub fn combine_masks(grid: &AlignedGrid, masks: &[Raster<u8>]) -> Result<Raster<u8>> {
    let mut combined = grid.zeros::<u8>();
    combined.data_mut().fill(1);

    for mask in masks {
        if mask.shape() != grid.shape() {
            return Err(Error::SizeMismatch {
                er: grid.rows,
                ec: grid.cols,
                ar: mask.rows(),
                ac: mask.cols(),
            });
        }
        Zip::from(combined.data_mut())
            .and(mask.data())
            .par_for_each(|c, &m| *c *= m);
    }
    Ok(combined)
}

/// Overlay after constraints, with the number of cells the mask allowed.
#[derive(Debug, Clone)]
pub struct ConstrainedOverlay {
    pub raster: Raster<f64>,
    pub allowed_cells: usize,
}

impl ConstrainedOverlay {
    /// No cell survived the constraints.
    pub fn is_empty(&self) -> bool {
        self.allowed_cells == 0
    }
}

/// Multiply the overlay by the combined mask.
///
/// An all-zero mask is not an error: the result is returned with
/// `allowed_cells == 0` and a warning is logged.
pub fn apply_mask(overlay: &Raster<f64>, mask: &Raster<u8>) -> Result<ConstrainedOverlay> {
    if overlay.shape() != mask.shape() {
        return Err(Error::SizeMismatch {
            er: overlay.rows(),
            ec: overlay.cols(),
            ar: mask.rows(),
            ac: mask.cols(),
        });
    }

    let mut raster = overlay.clone();
    Zip::from(raster.data_mut())
        .and(mask.data())
        .par_for_each(|v, &m| *v *= f64::from(m));

    let allowed_cells = count_allowed(mask);
    if allowed_cells == 0 {
        warn!("constraints exclude every cell; overlay is empty");
    }

    Ok(ConstrainedOverlay {
        raster,
        allowed_cells,
    })
}

fn count_allowed(mask: &Raster<u8>) -> usize {
    mask.data().iter().filter(|&&m| m != 0).count()
}
