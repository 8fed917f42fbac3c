//! Cell value trait for generic rasters

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types that can be stored in a raster cell.
///
/// Criterion and overlay rasters are `f64`, masks and class rasters are `u8`.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Fill used when a source value cannot be represented.
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, `None` when out of range or NaN for integer types
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_raster_element_int {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::MIN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    nodata == Some(*self)
                }
            }
        )*
    };
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::NAN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    if self.is_nan() {
                        return true;
                    }
                    match nodata {
                        Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                        None => false,
                    }
                }
            }
        )*
    };
}

impl_raster_element_int!(u8, u16, i16, i32);
impl_raster_element_float!(f32, f64);
