//! Villages served by a set of drain catchments.

use crate::config::EngineConfig;
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Intersects};
use geo_types::{Line, LineString, Polygon};
use serde::Serialize;
use std::path::PathBuf;
use stpgis_core::io::{read_geojson, unique_output_path, write_geojson};
use stpgis_core::vector::{AttributeValue, FeatureCollection};
use stpgis_core::{Error, Result, CRS};
use tracing::{debug, info};

/// One village intersecting the selected catchments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchmentVillage {
    pub id: Option<i64>,
    pub village_name: String,
    /// Area in working CRS units squared
    pub area: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatchmentSelection {
    /// `catchment_villages_<hex>.geojson` in the output directory
    pub path: PathBuf,
    pub villages: Vec<CatchmentVillage>,
}

fn load(path: &std::path::Path, crs: &CRS) -> Result<FeatureCollection> {
    read_geojson(path)?.with_default_crs(crs).to_crs(crs)
}

/// Closed rings of at least four finite points, a non-zero area, and no
/// ring crossing itself.
fn is_valid_polygon(polygon: &Polygon<f64>) -> bool {
    let ring_ok = |ring: &LineString<f64>| {
        ring.0.len() >= 4
            && ring.is_closed()
            && ring.0.iter().all(|c| c.x.is_finite() && c.y.is_finite())
            && is_simple_ring(ring)
    };
    ring_ok(polygon.exterior())
        && polygon.interiors().iter().all(ring_ok)
        && polygon.unsigned_area() > 0.0
}

/// Neighbouring segments may only share their common vertex; any other
/// pair of segments must not meet. Repeated vertices are ignored.
fn is_simple_ring(ring: &LineString<f64>) -> bool {
    let segments: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = segments.len();
    for i in 0..n {
        for j in i + 1..n {
            let neighbours = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(segments[i], segments[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) if neighbours => {}
                Some(_) => return false,
            }
        }
    }
    true
}

/// Select catchments whose `Drain_No` is in `drain_nos`, keep every
/// village intersecting their union, and write the selection as GeoJSON.
///
/// Output features carry `village_id` in place of `ID` and drop any
/// `FID` / `fid` column.
pub fn catchment_villages(config: &EngineConfig, drain_nos: &[i64]) -> Result<CatchmentSelection> {
    let crs = config.crs();
    let catchments = load(&config.catchment_path, &crs)?.filter_in("Drain_No", drain_nos);
    if catchments.is_empty() {
        return Err(Error::EmptyResult(format!(
            "no catchment matches drains {:?}",
            drain_nos
        )));
    }
    let catchment_area = catchments.to_multi_polygon();
    debug!(
        "{} catchments, {} polygons",
        catchments.len(),
        catchment_area.0.len()
    );

    let villages = load(&config.villages_path, &crs)?;
    let mut selected = Vec::new();
    let mut records = Vec::new();

    for village in villages.iter() {
        let polygons = village.polygons();
        if polygons.is_empty() || !polygons.iter().all(is_valid_polygon) {
            continue;
        }
        let touches = polygons
            .iter()
            .any(|p| catchment_area.0.iter().any(|c| p.intersects(c)));
        if !touches {
            continue;
        }

        let mut feature = village.clone();
        feature.remove_property("FID");
        feature.remove_property("fid");
        if let Some(id) = feature.remove_property("ID") {
            feature.set_property("village_id", id);
        }

        records.push(CatchmentVillage {
            id: feature
                .get_property("village_id")
                .and_then(AttributeValue::as_i64),
            village_name: feature
                .get_property("Name")
                .map(ToString::to_string)
                .unwrap_or_default(),
            area: polygons.iter().map(|p| p.unsigned_area()).sum(),
        });
        selected.push(feature);
    }

    config.ensure_output_dir()?;
    let path = unique_output_path(&config.output_dir, "catchment_villages", "geojson");
    write_geojson(&FeatureCollection::with_crs(selected, Some(crs)), &path)?;
    info!(
        "{} villages intersect drains {:?} -> {}",
        records.len(),
        drain_nos,
        path.display()
    );

    Ok(CatchmentSelection {
        path,
        villages: records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Geometry};
    use stpgis_core::vector::Feature;

    #[test]
    fn test_validity() {
        let good = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert!(is_valid_polygon(&good));

        let flat = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        assert!(!is_valid_polygon(&flat));

        let nan = polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0)];
        assert!(!is_valid_polygon(&nan));

        // crosses itself but keeps a non-zero signed area
        let bowtie = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0), (x: 0.0, y: 3.0)];
        assert!(bowtie.unsigned_area() > 0.0);
        assert!(!is_valid_polygon(&bowtie));

        let repeated = polygon![
            (x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)
        ];
        assert!(is_valid_polygon(&repeated));

        let spike = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 3.0)];
        assert!(!is_valid_polygon(&spike));
    }

    #[test]
    fn test_selection_renames_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let crs = CRS::from_epsg(32644);
        let square = |x: f64, y: f64, size: f64| {
            Geometry::Polygon(polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
            ])
        };

        let catchments = FeatureCollection::with_crs(
            vec![
                Feature::new(square(0.0, 0.0, 100.0)).with_property("Drain_No", AttributeValue::Int(4)),
                Feature::new(square(1000.0, 0.0, 100.0)).with_property("Drain_No", AttributeValue::Int(5)),
            ],
            Some(crs.clone()),
        );
        let villages = FeatureCollection::with_crs(
            vec![
                Feature::new(square(50.0, 50.0, 100.0))
                    .with_property("ID", AttributeValue::Int(10))
                    .with_property("FID", AttributeValue::Int(0))
                    .with_property("Name", AttributeValue::String("Rampur".into())),
                Feature::new(square(500.0, 0.0, 10.0))
                    .with_property("ID", AttributeValue::Int(11))
                    .with_property("Name", AttributeValue::String("Far".into())),
            ],
            None,
        );

        let config = EngineConfig {
            output_dir: dir.path().join("out"),
            catchment_path: dir.path().join("catchments.geojson"),
            villages_path: dir.path().join("villages.geojson"),
            ..EngineConfig::default()
        };
        write_geojson(&catchments, &config.catchment_path).unwrap();
        write_geojson(&villages, &config.villages_path).unwrap();

        let selection = catchment_villages(&config, &[4]).unwrap();
        assert_eq!(selection.villages.len(), 1);
        assert_eq!(selection.villages[0].id, Some(10));
        assert_eq!(selection.villages[0].village_name, "Rampur");
        assert!((selection.villages[0].area - 10_000.0).abs() < 1e-6);

        let written = read_geojson(&selection.path).unwrap();
        let f = &written.features[0];
        assert!(f.get_property("ID").is_none());
        assert!(f.get_property("FID").is_none());
        assert_eq!(f.get_property("village_id").and_then(AttributeValue::as_i64), Some(10));

        assert!(matches!(
            catchment_villages(&config, &[99]),
            Err(Error::EmptyResult(_))
        ));
    }
}
