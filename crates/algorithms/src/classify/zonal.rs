//! Share of each class inside named zones.

use crate::clip::rasterize_polygons;
use geo_types::Polygon;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use stpgis_core::io::write_text;
use stpgis_core::raster::Raster;
use stpgis_core::Result;

/// CSV header of the per-zone class table
pub const ZONE_CSV_HEADER: &str = "Village_Name,Very_Low,Low,Medium,High,Very_High";

/// A named zone, usually one village.
#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    pub polygons: Vec<Polygon<f64>>,
}

/// Percentage of a zone's valid cells in each class, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStatistic {
    #[serde(rename = "Village_Name")]
    pub name: String,
    #[serde(rename = "Very_Low")]
    pub very_low: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Medium")]
    pub medium: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Very_High")]
    pub very_high: f64,
}

impl ZoneStatistic {
    fn from_counts(name: String, counts: [usize; 5]) -> Self {
        let total: usize = counts.iter().sum();
        let pct = |c: usize| {
            if total == 0 {
                0.0
            } else {
                round2(c as f64 / total as f64 * 100.0)
            }
        };
        Self {
            name,
            very_low: pct(counts[0]),
            low: pct(counts[1]),
            medium: pct(counts[2]),
            high: pct(counts[3]),
            very_high: pct(counts[4]),
        }
    }

    /// Percentages, lowest class first
    pub fn percentages(&self) -> [f64; 5] {
        [self.very_low, self.low, self.medium, self.high, self.very_high]
    }
}

/// Two decimals, ties to even.
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

/// Class shares of `classes` (values 1..=5, 0 for nodata) per zone.
///
/// A cell belongs to a zone when its centre lies inside one of the zone's
/// polygons. Zones without any valid cell report 0 for every class.
pub fn zone_class_statistics(classes: &Raster<u8>, zones: &[Zone]) -> Result<Vec<ZoneStatistic>> {
    let (rows, cols) = classes.shape();
    let transform = *classes.transform();

    zones
        .par_iter()
        .map(|zone| {
            let inside = rasterize_polygons(&transform, rows, cols, &zone.polygons)?;
            let mut counts = [0usize; 5];
            for (&class, &hit) in classes.data().iter().zip(inside.iter()) {
                if hit && (1..=5).contains(&class) {
                    counts[usize::from(class) - 1] += 1;
                }
            }
            Ok(ZoneStatistic::from_counts(zone.name.clone(), counts))
        })
        .collect()
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Write the per-zone table as CSV with [`ZONE_CSV_HEADER`].
pub fn write_zone_csv(stats: &[ZoneStatistic], path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::with_capacity(64 * (stats.len() + 1));
    out.push_str(ZONE_CSV_HEADER);
    out.push('\n');
    for s in stats {
        let _ = write!(out, "{}", csv_field(&s.name));
        for p in s.percentages() {
            let _ = write!(out, ",{:?}", p);
        }
        out.push('\n');
    }
    write_text(path, &out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::polygon;
    use stpgis_core::raster::GeoTransform;

    fn classes() -> Raster<u8> {
        // 4x4, unit cells, origin (0, 4)
        #[rustfmt::skip]
        let values = vec![
            1, 1, 2, 2,
            3, 3, 4, 4,
            5, 5, 5, 0,
            0, 0, 0, 0,
        ];
        let mut r = Raster::from_vec(values, 4, 4).unwrap();
        r.set_transform(GeoTransform::from_origin(0.0, 4.0, 1.0, 1.0));
        r.set_nodata(Some(0));
        r
    }

    fn zone(name: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Zone {
        Zone {
            name: name.into(),
            polygons: vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]],
        }
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let stats = zone_class_statistics(&classes(), &[zone("Rampur", 0.0, 0.0, 4.0, 4.0)]).unwrap();
        let s = &stats[0];
        // 11 valid cells: 2, 2, 2, 2, 3
        assert_relative_eq!(s.very_low, 18.18);
        assert_relative_eq!(s.very_high, 27.27);
        let total: f64 = s.percentages().iter().sum();
        assert!((total - 100.0).abs() <= 0.01 + 1e-9, "total {}", total);
    }

    #[test]
    fn test_zone_without_valid_cells() {
        let stats = zone_class_statistics(&classes(), &[zone("Empty", 0.0, 0.0, 4.0, 1.0)]).unwrap();
        assert_eq!(stats[0].percentages(), [0.0; 5]);
    }

    #[test]
    fn test_zones_keep_order() {
        let zones = [zone("Top", 0.0, 3.0, 4.0, 4.0), zone("Middle", 0.0, 2.0, 4.0, 3.0)];
        let stats = zone_class_statistics(&classes(), &zones).unwrap();
        assert_eq!(stats[0].name, "Top");
        assert_relative_eq!(stats[0].very_low, 50.0);
        assert_relative_eq!(stats[0].low, 50.0);
        assert_relative_eq!(stats[1].medium, 50.0);
        assert_relative_eq!(stats[1].high, 50.0);
    }

    #[test]
    fn test_csv_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("village_details.csv");
        let stats = vec![
            ZoneStatistic::from_counts("Rampur".into(), [1, 1, 0, 0, 2]),
            ZoneStatistic::from_counts("Sonpur, East".into(), [0; 5]),
        ];
        write_zone_csv(&stats, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ZONE_CSV_HEADER);
        assert_eq!(lines[1], "Rampur,25.0,25.0,0.0,0.0,50.0");
        assert_eq!(lines[2], "\"Sonpur, East\",0.0,0.0,0.0,0.0,0.0");
    }

    #[test]
    fn test_half_hundredth_rounds_to_even() {
        let s = ZoneStatistic::from_counts("A".into(), [1, 799, 0, 0, 0]);
        assert_eq!(s.very_low, 0.12);
    }

    #[test]
    fn test_statistic_json_field_names() {
        let s = ZoneStatistic::from_counts("A".into(), [1, 0, 0, 0, 0]);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["Village_Name"], "A");
        assert_eq!(json["Very_Low"], 100.0);
    }
}
