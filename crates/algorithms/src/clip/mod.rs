//! Polygon clipping: basin, administrative unit selection and town buffer.

mod boundary;
mod buffer;
mod mask;

pub use boundary::{BoundaryClipper, ClipTarget, Place, TownClass};
pub use buffer::{buffer_point, BUFFER_SEGMENTS};
pub use mask::{mask_raster, rasterize_polygons};
