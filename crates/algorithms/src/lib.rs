//! # STPGIS Algorithms
//!
//! Raster operations behind the suitability / priority engine.
//!
//! - **align**: common grid computation and reprojection (bilinear / nearest)
//! - **overlay**: normalization, weighted overlay, constraint masks
//! - **clip**: polygon masking with crop, basin / unit / town-buffer targets
//! - **classify**: equal-interval breaks, reclassification, per-zone class shares
//! - **interpolation**: IDW, ordinary kriging and thin-plate spline from point samples

pub mod align;
pub mod classify;
pub mod clip;
pub mod interpolation;
pub mod overlay;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::align::{AlignedGrid, AlignedStack, GridAligner, ReferenceProfile, Resampling};
    pub use crate::classify::{reclassify, zone_class_statistics, ClassBreaks, Zone, ZoneStatistic};
    pub use crate::clip::{mask_raster, BoundaryClipper, ClipTarget, Place, TownClass};
    pub use crate::interpolation::{interpolate, interpolate_with_fallback, Method, SamplePoint};
    pub use crate::overlay::{
        apply_mask, normalize, weighted_overlay, ConstrainedOverlay, ConstraintSet, WeightSet,
    };
    pub use stpgis_core::prelude::*;
}
