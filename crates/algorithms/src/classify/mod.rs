//! Equal-interval classification and per-zone class shares.

mod breaks;
mod reclassify;
mod zonal;

pub use breaks::{ClassBreaks, CLASS_LABELS};
pub use reclassify::reclassify;
pub use zonal::{write_zone_csv, zone_class_statistics, Zone, ZoneStatistic, ZONE_CSV_HEADER};
