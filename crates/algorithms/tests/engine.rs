//! End-to-end runs of the engine stages on GeoTIFF / GeoJSON fixtures
//! generated into a temp directory.

use approx::assert_relative_eq;
use geo_types::{polygon, Geometry, Point};
use std::path::{Path, PathBuf};
use stpgis_algorithms::align::{GridAligner, Resampling};
use stpgis_algorithms::classify::{reclassify, zone_class_statistics, ClassBreaks};
use stpgis_algorithms::clip::{BoundaryClipper, ClipTarget, Place};
use stpgis_algorithms::overlay::{apply_mask, normalize, weighted_overlay, ConstraintSet};
use stpgis_core::io::{read_geotiff, write_geojson, write_geotiff};
use stpgis_core::raster::{GeoTransform, Raster};
use stpgis_core::vector::{AttributeValue, Feature, FeatureCollection};
use stpgis_core::{Error, CRS};
use stpgis_parallel::ProcessingMode;

const WEST: f64 = 500_000.0;
const NORTH: f64 = 3_000_000.0;
const RES: f64 = 30.0;
const SIZE: usize = 40;

fn utm() -> CRS {
    CRS::from_epsg(32644)
}

fn write_layer(dir: &Path, name: &str, f: impl Fn(usize, usize) -> f64) -> PathBuf {
    let mut r = Raster::new(SIZE, SIZE);
    r.set_transform(GeoTransform::from_origin(WEST, NORTH, RES, RES));
    r.set_crs(Some(utm()));
    for row in 0..SIZE {
        for col in 0..SIZE {
            r.set(row, col, f(row, col)).unwrap();
        }
    }
    let path = dir.join(name);
    write_geotiff(&r, &path, None).unwrap();
    path
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
    Geometry::Polygon(polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)])
}

/// Two villages splitting the raster east / west, both in subdistrict 900
fn write_villages(dir: &Path) -> PathBuf {
    let south = NORTH - SIZE as f64 * RES;
    let mid = WEST + SIZE as f64 * RES / 2.0;
    let east = WEST + SIZE as f64 * RES;
    let fc = FeatureCollection::with_crs(
        vec![
            Feature::new(square(WEST, south, mid, NORTH))
                .with_property("ID", AttributeValue::Int(1))
                .with_property("Name", AttributeValue::String("Westpur".into()))
                .with_property("subdis_cod", AttributeValue::Int(900)),
            Feature::new(square(mid, south, east, NORTH))
                .with_property("ID", AttributeValue::Int(2))
                .with_property("Name", AttributeValue::String("Eastpur".into()))
                .with_property("subdis_cod", AttributeValue::Int(900)),
        ],
        Some(utm()),
    );
    let path = dir.join("villages.geojson");
    write_geojson(&fc, &path).unwrap();
    path
}

fn write_towns(dir: &Path) -> PathBuf {
    let centre = Point::new(WEST + 600.0, NORTH - 600.0);
    // No crs member: the working CRS is assumed
    let fc = FeatureCollection::with_crs(
        vec![Feature::new(Geometry::Point(centre))
            .with_property("ID", AttributeValue::Int(11))
            .with_property("class", AttributeValue::Int(3))],
        None,
    );
    let path = dir.join("towns.geojson");
    write_geojson(&fc, &path).unwrap();
    path
}

#[test]
fn aligned_layers_share_one_grid() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_layer(dir.path(), "a.tif", |r, c| (r + c) as f64);

    // Same area at 60 m in geographic coordinates
    let mut b: Raster<f64> = Raster::filled(20, 20, 1.0);
    b.set_transform(GeoTransform::from_origin(81.0, 27.12, 0.0006, 0.0006));
    b.set_crs(Some(CRS::wgs84()));
    let b_path = dir.path().join("b.tif");
    write_geotiff(&b, &b_path, None).unwrap();

    let aligner = GridAligner::new(utm(), (RES, RES)).with_mode(ProcessingMode::Parallel);
    let stack = aligner.align_paths(&[a, b_path]).unwrap();

    assert_eq!(stack.len(), 2);
    for layer in &stack.layers {
        assert_eq!(layer.shape(), stack.grid.shape());
        assert_eq!(layer.transform(), stack.layers[0].transform());
        assert!(layer.crs().unwrap().is_equivalent(&utm()));
    }
    assert!(stack.grid.bounds.0 <= WEST && stack.grid.bounds.3 >= NORTH - 1e-6);
}

#[test]
fn missing_layer_is_input_not_found() {
    let aligner = GridAligner::new(utm(), (RES, RES));
    let err = aligner.align_paths(&[PathBuf::from("/nonexistent/layer.tif")]).unwrap_err();
    assert!(matches!(err, Error::InputNotFound { .. }));
}

#[test]
fn overlay_constraint_clip_classify() {
    let dir = tempfile::tempdir().unwrap();
    let slope = write_layer(dir.path(), "slope.tif", |_, c| c as f64);
    let river = write_layer(dir.path(), "river.tif", |r, _| r as f64);
    // Exclude the top 10 rows
    let floodplain = write_layer(dir.path(), "flood.tif", |r, _| if r < 10 { 0.0 } else { 1.0 });
    let villages = write_villages(dir.path());
    let towns = write_towns(dir.path());

    let aligner = GridAligner::new(utm(), (RES, RES)).with_mode(ProcessingMode::Sequential);
    let stack = aligner.align_paths(&[slope, river]).unwrap();
    assert_eq!(stack.grid.shape(), (SIZE, SIZE));

    let normalized: Vec<Raster<f64>> = stack.layers.iter().map(|l| normalize(l).unwrap()).collect();
    let mut overlay = weighted_overlay(&normalized, &[0.5, 0.5]).unwrap();
    stack.profile.apply(&mut overlay).unwrap();

    let constraints: ConstraintSet = [floodplain].into_iter().collect();
    let mask = constraints.build_mask(&aligner, &stack.grid).unwrap();
    let constrained = apply_mask(&overlay, &mask).unwrap();
    assert_eq!(constrained.allowed_cells, (SIZE - 10) * SIZE);
    assert_relative_eq!(constrained.raster.get(5, 20).unwrap(), 0.0);

    let overlay_path = dir.path().join("overlay.tif");
    write_geotiff(&constrained.raster, &overlay_path, None).unwrap();

    let clipper = BoundaryClipper::new(utm(), &villages, &towns, dir.path());
    let target = ClipTarget::Units {
        place: Place::Village,
        ids: vec![1],
    };
    let clipped_path = clipper.clip_file(&overlay_path, &target).unwrap();
    let name = clipped_path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("unit_clip_") && name.ends_with(".tif"));

    let clipped: Raster<f64> = read_geotiff(&clipped_path, None).unwrap();
    assert_eq!(clipped.shape(), (SIZE, SIZE / 2));

    // Subdistrict selection covers both villages
    let zones = clipper
        .unit_zones(Place::Subdistrict, &[900], &utm())
        .unwrap();
    assert_eq!(zones.len(), 2);

    let breaks = ClassBreaks::from_raster(&constrained.raster, 5).unwrap();
    let classes = reclassify(&constrained.raster, &breaks).unwrap();
    let stats = zone_class_statistics(&classes, &zones).unwrap();
    for s in &stats {
        let total: f64 = s.percentages().iter().sum();
        assert!((total - 100.0).abs() < 0.05, "{}: {}", s.name, total);
    }
    assert_eq!(stats[0].name, "Westpur");
}

#[test]
fn town_buffer_and_empty_selection() {
    let dir = tempfile::tempdir().unwrap();
    let layer = write_layer(dir.path(), "score.tif", |r, c| (r * SIZE + c) as f64);
    let villages = write_villages(dir.path());
    let towns = write_towns(dir.path());
    let clipper = BoundaryClipper::new(utm(), &villages, &towns, dir.path());

    // Class 3 buffer (25 km) swallows the whole 1.2 km raster
    let raster: Raster<f64> = read_geotiff(&layer, None).unwrap();
    let clipped = clipper
        .clip_raster(&raster, &ClipTarget::TownBuffer { ids: vec![11] })
        .unwrap();
    assert_eq!(clipped.shape(), (SIZE, SIZE));
    assert_eq!(clipped.valid_values().count(), SIZE * SIZE);

    let err = clipper
        .clip_raster(&raster, &ClipTarget::Units { place: Place::Village, ids: vec![99] })
        .unwrap_err();
    assert!(matches!(err, Error::EmptyResult(_)));

    let err = clipper
        .clip_raster(&raster, &ClipTarget::TownBuffer { ids: vec![99] })
        .unwrap_err();
    assert!(matches!(err, Error::EmptyResult(_)));
}

#[test]
fn nearest_resampling_keeps_binary_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_layer(dir.path(), "mask.tif", |r, c| ((r + c) % 2) as f64);
    let aligner = GridAligner::new(utm(), (RES, RES));
    let grid = aligner
        .common_grid(&[read_geotiff(&path, None).unwrap()])
        .unwrap();
    let layers = aligner.align_to_grid(&[path], &grid, Resampling::Nearest).unwrap();
    assert!(layers[0].data().iter().all(|&v| v == 0.0 || v == 1.0));
}
