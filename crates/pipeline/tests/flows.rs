//! Priority, suitability and category flows against on-the-fly fixtures
//! and a publisher that only records what it was given.

use geo_types::{polygon, Geometry, Point};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use stpgis_algorithms::clip::Place;
use stpgis_colormap::{ColorRamp, StyleDescriptor};
use stpgis_core::io::{write_geojson, write_geotiff};
use stpgis_core::raster::{GeoTransform, Raster};
use stpgis_core::vector::{AttributeValue, Feature, FeatureCollection};
use stpgis_core::{Error, Result, CRS};
use stpgis_parallel::ProcessingMode;
use stpgis_pipeline::{
    CategoryMapper, CategoryRaster, EngineConfig, PriorityMapper, PriorityRequest, Publisher,
    SuitabilityMapper, SuitabilityRequest, WeightedLayer,
};

const WEST: f64 = 500_000.0;
const NORTH: f64 = 3_000_000.0;
const RES: f64 = 30.0;
const SIZE: usize = 40;

#[derive(Default)]
struct RecordingPublisher {
    rasters: RefCell<Vec<(PathBuf, bool)>>,
    styles: RefCell<Vec<(String, StyleDescriptor)>>,
    fail: bool,
}

impl Publisher for RecordingPublisher {
    fn publish_raster(&self, raster: &Path) -> Result<String> {
        if self.fail {
            return Err(Error::Publish("map server unavailable".into()));
        }
        self.rasters
            .borrow_mut()
            .push((raster.to_path_buf(), raster.exists()));
        let n = self.rasters.borrow().len();
        Ok(format!("layer_{}", n))
    }

    fn apply_style(&self, layer: &str, style: &StyleDescriptor) -> Result<()> {
        self.styles.borrow_mut().push((layer.to_string(), style.clone()));
        Ok(())
    }
}

fn utm() -> CRS {
    CRS::from_epsg(32644)
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
    Geometry::Polygon(polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)])
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

struct Fixture {
    _dir: tempfile::TempDir,
    config: EngineConfig,
    slope: PathBuf,
    river: PathBuf,
    floodplain: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();

    let east = WEST + SIZE as f64 * RES;
    let south = NORTH - SIZE as f64 * RES;
    let mid = WEST + SIZE as f64 * RES / 2.0;

    let basin = FeatureCollection::with_crs(
        vec![Feature::new(square(WEST + 15.0, south + 15.0, east - 15.0, NORTH - 15.0))],
        Some(utm()),
    );
    let villages = FeatureCollection::with_crs(
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
    let towns = FeatureCollection::with_crs(
        vec![Feature::new(Geometry::Point(Point::new(WEST + 600.0, NORTH - 600.0)))
            .with_property("ID", AttributeValue::Int(11))
            .with_property("class", AttributeValue::Int(9))],
        Some(utm()),
    );

    let config = EngineConfig {
        output_dir: dir.path().join("out"),
        basin_path: data.join("basin.geojson"),
        villages_path: data.join("villages.geojson"),
        town_path: data.join("towns.geojson"),
        catchment_path: data.join("catchments.geojson"),
        processing: ProcessingMode::Sequential,
        ..EngineConfig::default()
    };
    write_geojson(&basin, &config.basin_path).unwrap();
    write_geojson(&villages, &config.villages_path).unwrap();
    write_geojson(&towns, &config.town_path).unwrap();

    let slope = write_layer(&data, "slope.tif", |_, c| c as f64);
    let river = write_layer(&data, "river.tif", |r, _| r as f64);
    let floodplain = write_layer(&data, "flood.tif", |r, _| if r < 10 { 0.0 } else { 1.0 });

    Fixture {
        _dir: dir,
        config,
        slope,
        river,
        floodplain,
    }
}

fn output_names(config: &EngineConfig) -> Vec<String> {
    std::fs::read_dir(&config.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn priority_map_publishes_and_cleans_up() {
    let fx = fixture();
    let publisher = RecordingPublisher::default();
    let request = PriorityRequest {
        layers: vec![
            WeightedLayer::new(&fx.slope, 0.6),
            WeightedLayer::new(&fx.river, 0.4),
        ],
        constraints: vec![fx.floodplain.clone()],
        place: Place::Subdistrict,
        clip: vec![900],
    };

    let map = PriorityMapper::new(&fx.config, &publisher)
        .create_priority_map(&request)
        .unwrap();

    assert_eq!(map.layer_name, "layer_1");
    assert_eq!(publisher.rasters.borrow().len(), 1);
    assert!(publisher.rasters.borrow()[0].1, "raster must exist when published");

    // Reversed orange-to-green: deep green first
    assert_eq!(map.style.entries.len(), 5);
    assert_eq!(map.style.entries[0].color.to_hex(), "#006400");
    assert_eq!(publisher.styles.borrow()[0].1, map.style);

    assert_eq!(map.zones.len(), 2);
    assert_eq!(map.zones[0].name, "Westpur");
    for zone in &map.zones {
        let total: f64 = zone.percentages().iter().sum();
        assert!((total - 100.0).abs() < 0.05);
    }
    let csv = map.csv_path.as_ref().unwrap();
    let text = std::fs::read_to_string(csv).unwrap();
    assert!(text.starts_with("Village_Name,Very_Low,Low,Medium,High,Very_High"));

    let names = output_names(&fx.config);
    assert!(map.raster_path.exists());
    assert!(names.iter().all(|n| !n.starts_with("overlay_")
        && !n.starts_with("constraint_")
        && !n.starts_with("stp_priority_")));
}

#[test]
fn priority_rejects_missing_layer() {
    let fx = fixture();
    let publisher = RecordingPublisher::default();
    let request = PriorityRequest {
        layers: vec![
            WeightedLayer::new(&fx.slope, 0.5),
            WeightedLayer::new(fx.config.output_dir.join("nope.tif"), 0.5),
        ],
        ..PriorityRequest::default()
    };
    let err = PriorityMapper::new(&fx.config, &publisher)
        .create_priority_map(&request)
        .unwrap_err();
    assert!(matches!(err, Error::InputNotFound { .. }));
    assert!(publisher.rasters.borrow().is_empty());
}

#[test]
fn suitability_without_clip_keeps_basin_raster() {
    let fx = fixture();
    let publisher = RecordingPublisher::default();
    let request = SuitabilityRequest {
        layers: vec![
            WeightedLayer::new(&fx.slope, 1.0),
            WeightedLayer::new(&fx.river, 1.0),
        ],
        constraints: vec![fx.floodplain.clone()],
        reverse: false,
        ..SuitabilityRequest::default()
    };

    let map = SuitabilityMapper::new(&fx.config, &publisher)
        .create_suitability_map(&request)
        .unwrap();

    let name = map.raster_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("stp_suitability_") && name.ends_with("_map.tif"));
    assert!(map.raster_path.exists());
    assert_eq!(map.style.entries[0].color.to_hex(), "#CC0000");
    assert!(output_names(&fx.config)
        .iter()
        .all(|n| !n.starts_with("overlay_") && !n.starts_with("constraint_")));
}

#[test]
fn intermediates_survive_when_kept() {
    let mut fx = fixture();
    fx.config.keep_intermediates = true;
    let publisher = RecordingPublisher::default();
    let request = SuitabilityRequest {
        layers: vec![WeightedLayer::new(&fx.slope, 1.0)],
        ..SuitabilityRequest::default()
    };
    SuitabilityMapper::new(&fx.config, &publisher)
        .create_suitability_map(&request)
        .unwrap();

    let names = output_names(&fx.config);
    assert!(names.iter().any(|n| n.starts_with("overlay_")));
    assert!(names.iter().any(|n| n.starts_with("constraint_")));
}

#[test]
fn failed_publish_still_removes_intermediates() {
    let fx = fixture();
    let publisher = RecordingPublisher {
        fail: true,
        ..RecordingPublisher::default()
    };
    let request = SuitabilityRequest {
        layers: vec![WeightedLayer::new(&fx.slope, 1.0)],
        clip: vec![1],
        place: Place::Village,
        ..SuitabilityRequest::default()
    };
    let err = SuitabilityMapper::new(&fx.config, &publisher)
        .create_suitability_map(&request)
        .unwrap_err();
    assert!(matches!(err, Error::Publish(_)));
    assert!(output_names(&fx.config)
        .iter()
        .all(|n| !n.starts_with("overlay_") && !n.starts_with("stp_suitability_")));
}

#[test]
fn categories_to_town_get_fresh_style() {
    let fx = fixture();
    let publisher = RecordingPublisher::default();
    let stored = StyleDescriptor::new(0.0, 1.0, 5, ColorRamp::BlueToRed, false);
    let categories = vec![CategoryRaster {
        file_name: "slope_category".into(),
        path: fx.slope.clone(),
        style: stored.clone(),
    }];
    let mapper = CategoryMapper::new(&fx.config, &publisher);

    let town = mapper.clip_categories_to_town(&categories, &[11]).unwrap();
    assert_eq!(town.len(), 1);
    assert_eq!(town[0].file_name, "slope_category");
    let (_, fresh) = publisher.styles.borrow()[0].clone();
    assert_eq!(fresh.ramp, ColorRamp::OrangeToGreen);
    assert!(fresh.reversed);

    let units = mapper
        .clip_categories_to_units(&categories, Place::Village, &[2])
        .unwrap();
    assert_eq!(units[0].layer_name, "layer_2");
    assert_eq!(publisher.styles.borrow()[1].1, stored);

    // Clipped copies are removed once published
    let published: Vec<PathBuf> = publisher.rasters.borrow().iter().map(|(p, _)| p.clone()).collect();
    assert!(published.iter().all(|p| !p.exists()));
}
