//! Multi-criteria overlay: min-max normalization, weighted linear
//! combination and binary constraint masks.

mod constraint;
mod normalize;
mod weighted;

pub use constraint::{apply_mask, binary_mask, combine_masks, ConstrainedOverlay, ConstraintSet};
pub use normalize::{normalize, NORMALIZE_EPSILON};
pub use weighted::{weighted_overlay, WeightSet};
