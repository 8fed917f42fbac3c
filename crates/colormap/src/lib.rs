//! # STPGIS Colormap
//!
//! Named colour ramps and the class-break style that accompanies a
//! published suitability or priority raster.
//!
//! ## Usage
//!
//! ```ignore
//! use stpgis_colormap::{style_for_raster, ColorRamp};
//!
//! let style = style_for_raster(&raster, 5, ColorRamp::OrangeToGreen, true)?;
//! std::fs::write("style.sld", style.to_sld())?;
//! ```

mod scheme;
mod style;

pub use scheme::{ColorRamp, Rgb};
pub use style::{
    class_edges, class_label, style_for_raster, write_sld, StyleDescriptor, StyleEntry,
    CLASS_LEVEL_LABELS,
};
