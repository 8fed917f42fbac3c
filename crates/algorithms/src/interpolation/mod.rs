//! Criterion rasters from point samples
//!
//! Interpolate scattered point data onto a regular grid around the samples:
//! - IDW: Inverse Distance Weighting over the 15 nearest samples
//! - Ordinary Kriging with a fitted spherical variogram
//! - TPS: Thin Plate Spline
//!
//! Kriging is the primary method; [`interpolate_with_fallback`] drops to
//! IDW only when the kriging system is singular.

mod idw;
mod kriging;
mod linalg;
mod tps;
pub mod variogram;

pub use idw::{idw, IdwParams};
pub use kriging::ordinary_kriging;
pub use tps::tps_interpolation;
pub use variogram::{empirical_variogram, fit_spherical, EmpiricalVariogram, SphericalVariogram};

use geo::Centroid;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stpgis_core::raster::{GeoTransform, Raster};
use stpgis_core::vector::{AttributeValue, FeatureCollection};
use stpgis_core::{Error, Result, CRS};
use tracing::{info, warn};

/// Cells per side of the interpolation grid
pub const GRID_SIZE: usize = 100;

/// Fraction of the sample extent added on every side
pub const GRID_PADDING: f64 = 0.1;

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }
}

/// Samples from the features of `collection`: points as-is, every other
/// geometry by its centroid. Features without geometry are skipped.
///
/// # Errors
/// `InvalidParameter` if `attribute` is missing from every feature or
/// holds a non-numeric value; `EmptyResult` if no feature has geometry.
pub fn samples_from_features(collection: &FeatureCollection, attribute: &str) -> Result<Vec<SamplePoint>> {
    if !collection.iter().any(|f| f.get_property(attribute).is_some()) {
        return Err(Error::invalid_parameter(
            "attribute",
            attribute,
            "not present on any feature",
        ));
    }

    let mut samples = Vec::with_capacity(collection.len());
    for feature in collection.iter() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let point = match geometry {
            Geometry::Point(p) => Some(*p),
            other => other.centroid(),
        };
        let Some(point) = point else { continue };

        let value = feature
            .get_property(attribute)
            .and_then(AttributeValue::as_f64)
            .ok_or_else(|| {
                Error::invalid_parameter(
                    "attribute",
                    attribute,
                    "contains non-numeric values",
                )
            })?;
        samples.push(SamplePoint::new(point.x(), point.y(), value));
    }

    if samples.is_empty() {
        return Err(Error::EmptyResult(
            "no valid geometries found for interpolation".into(),
        ));
    }
    Ok(samples)
}

/// Output grid of an interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationGrid {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
}

impl InterpolationGrid {
    /// `size x size` grid over the samples' bounding box, grown by
    /// [`GRID_PADDING`] of its width and height on each side.
    pub fn around_samples(points: &[SamplePoint], size: usize, crs: Option<CRS>) -> Result<Self> {
        let (min_x, min_y, max_x, max_y) = points.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(a, b, c, d), p| (a.min(p.x), b.min(p.y), c.max(p.x), d.max(p.y)),
        );
        let (w, h) = (max_x - min_x, max_y - min_y);
        if !(w > 0.0 && h > 0.0) || size == 0 {
            return Err(Error::invalid_parameter(
                "samples",
                points.len(),
                "sample extent must have positive width and height",
            ));
        }

        let (min_x, max_x) = (min_x - w * GRID_PADDING, max_x + w * GRID_PADDING);
        let (min_y, max_y) = (min_y - h * GRID_PADDING, max_y + h * GRID_PADDING);
        let res_x = (max_x - min_x) / size as f64;
        let res_y = (max_y - min_y) / size as f64;

        Ok(Self {
            rows: size,
            cols: size,
            transform: GeoTransform::from_origin(min_x, max_y, res_x, res_y),
            crs,
        })
    }

    pub(crate) fn to_raster(&self, data: Vec<f64>) -> Result<Raster<f64>> {
        let mut output = Raster::from_vec(data, self.rows, self.cols)?;
        output.set_transform(self.transform);
        output.set_crs(self.crs.clone());
        output.set_nodata(Some(f64::NAN));
        Ok(output)
    }
}

/// Interpolation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Idw,
    Kriging,
    Spline,
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idw" => Ok(Method::Idw),
            "kriging" => Ok(Method::Kriging),
            "spline" | "tps" => Ok(Method::Spline),
            other => Err(Error::invalid_parameter(
                "method",
                other,
                "expected idw, kriging or spline",
            )),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Idw => "idw",
            Method::Kriging => "kriging",
            Method::Spline => "spline",
        };
        f.write_str(s)
    }
}

/// Run one method.
pub fn interpolate(points: &[SamplePoint], method: Method, grid: &InterpolationGrid) -> Result<Raster<f64>> {
    info!(
        "Interpolating {} samples with {} onto {}x{}",
        points.len(),
        method,
        grid.cols,
        grid.rows
    );
    match method {
        Method::Idw => idw(points, grid, &IdwParams::default()),
        Method::Kriging => ordinary_kriging(points, &fit_spherical(points), grid),
        Method::Spline => tps_interpolation(points, grid),
    }
}

/// Kriging, or IDW when the kriging system is singular. Returns the
/// raster with the method that produced it; any other error propagates.
pub fn interpolate_with_fallback(points: &[SamplePoint], grid: &InterpolationGrid) -> Result<(Raster<f64>, Method)> {
    match interpolate(points, Method::Kriging, grid) {
        Ok(raster) => Ok((raster, Method::Kriging)),
        Err(Error::SingularSystem(reason)) => {
            warn!("kriging system singular ({}), falling back to IDW", reason);
            interpolate(points, Method::Idw, grid).map(|r| (r, Method::Idw))
        }
        Err(e) => Err(e),
    }
}

/// Statistics and grid description of an interpolated raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationSummary {
    pub method: Method,
    pub min_value: f64,
    pub max_value: f64,
    pub mean_value: f64,
    pub std_dev: f64,
    pub resolution_x: f64,
    pub resolution_y: f64,
    pub width: usize,
    pub height: usize,
    pub crs: Option<String>,
}

impl InterpolationSummary {
    pub fn new(raster: &Raster<f64>, method: Method) -> Result<Self> {
        let values: Vec<f64> = raster.valid_values().collect();
        if values.is_empty() {
            return Err(Error::EmptyResult("interpolated raster has no valid cell".into()));
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (res_x, res_y) = raster.transform().resolution();

        Ok(Self {
            method,
            min_value: min,
            max_value: max,
            mean_value: mean,
            std_dev: var.sqrt(),
            resolution_x: res_x,
            resolution_y: res_y,
            width: raster.cols(),
            height: raster.rows(),
            crs: raster.crs().map(CRS::identifier),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{polygon, Point};
    use stpgis_core::vector::Feature;

    fn scattered() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(0.0, 0.0, 1.0),
            SamplePoint::new(100.0, 0.0, 2.0),
            SamplePoint::new(0.0, 50.0, 3.0),
            SamplePoint::new(100.0, 50.0, 4.0),
            SamplePoint::new(40.0, 20.0, 2.5),
            SamplePoint::new(70.0, 35.0, 3.1),
        ]
    }

    #[test]
    fn test_grid_padding() {
        let grid = InterpolationGrid::around_samples(&scattered(), GRID_SIZE, Some(CRS::from_epsg(32644))).unwrap();
        assert_eq!((grid.rows, grid.cols), (100, 100));
        assert_relative_eq!(grid.transform.origin_x, -10.0);
        assert_relative_eq!(grid.transform.origin_y, 55.0);
        assert_relative_eq!(grid.transform.pixel_width, 1.2);
        assert_relative_eq!(grid.transform.pixel_height, -0.6);
    }

    #[test]
    fn test_single_location_rejected() {
        let pts = [SamplePoint::new(1.0, 1.0, 3.0)];
        assert!(InterpolationGrid::around_samples(&pts, GRID_SIZE, None).is_err());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("IDW".parse::<Method>().unwrap(), Method::Idw);
        assert_eq!("kriging".parse::<Method>().unwrap(), Method::Kriging);
        assert_eq!("spline".parse::<Method>().unwrap(), Method::Spline);
        assert!("nearest".parse::<Method>().is_err());
    }

    #[test]
    fn test_samples_use_centroids() {
        let fc = FeatureCollection::with_crs(
            vec![
                Feature::new(Geometry::Point(Point::new(1.0, 2.0)))
                    .with_property("pop", AttributeValue::Int(10)),
                Feature::new(Geometry::Polygon(polygon![
                    (x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)
                ]))
                .with_property("pop", AttributeValue::Float(2.5)),
            ],
            None,
        );
        let s = samples_from_features(&fc, "pop").unwrap();
        assert_eq!(s[0], SamplePoint::new(1.0, 2.0, 10.0));
        assert_relative_eq!(s[1].x, 2.0);
        assert_relative_eq!(s[1].value, 2.5);

        assert!(samples_from_features(&fc, "missing").is_err());
    }

    #[test]
    fn test_non_numeric_attribute() {
        let fc = FeatureCollection::with_crs(
            vec![Feature::new(Geometry::Point(Point::new(1.0, 2.0)))
                .with_property("name", AttributeValue::String("north".into()))],
            None,
        );
        assert!(matches!(
            samples_from_features(&fc, "name"),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_fallback_only_on_singular() {
        let mut pts = scattered();
        pts.push(SamplePoint::new(0.0, 0.0, 9.0));
        let grid = InterpolationGrid::around_samples(&pts, 20, None).unwrap();

        let (raster, method) = interpolate_with_fallback(&pts, &grid).unwrap();
        assert_eq!(method, Method::Idw);
        assert!(raster.data().iter().all(|v| v.is_finite()));

        let grid = InterpolationGrid::around_samples(&scattered(), 20, None).unwrap();
        let (_, method) = interpolate_with_fallback(&scattered(), &grid).unwrap();
        assert_eq!(method, Method::Kriging);
    }

    #[test]
    fn test_summary() {
        let grid = InterpolationGrid::around_samples(&scattered(), 10, Some(CRS::from_epsg(32644))).unwrap();
        let raster = interpolate(&scattered(), Method::Idw, &grid).unwrap();
        let s = InterpolationSummary::new(&raster, Method::Idw).unwrap();

        assert_eq!((s.width, s.height), (10, 10));
        assert!(s.min_value >= 1.0 && s.max_value <= 4.0);
        assert!(s.std_dev > 0.0);
        assert_eq!(s.crs.as_deref(), Some("EPSG:32644"));
    }
}
