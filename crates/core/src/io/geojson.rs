//! GeoJSON FeatureCollection reader/writer.
//!
//! The legacy `crs` member (`EPSG:xxxx`, `urn:ogc:def:crs:EPSG::xxxx`) is
//! honoured; a file without one yields a collection with no CRS.

use super::{ensure_exists, write_atomically};
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crs: Option<GeoJsonCrs>,
    features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonCrs {
    #[serde(rename = "type")]
    kind: String,
    properties: GeoJsonCrsProperties,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonCrsProperties {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonFeature {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

type Position = Vec<f64>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<GeoJsonGeometry> },
}

fn coord(p: &[f64]) -> Result<Coord<f64>> {
    match p {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(Error::Vector(format!("position needs two ordinates, got {}", p.len()))),
    }
}

fn line(ps: &[Position]) -> Result<LineString<f64>> {
    ps.iter().map(|p| coord(p)).collect::<Result<Vec<_>>>().map(LineString)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| line(r));
    let exterior = rings
        .next()
        .ok_or_else(|| Error::Vector("polygon without exterior ring".into()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

impl GeoJsonGeometry {
    fn to_geo(&self) -> Result<Geometry<f64>> {
        Ok(match self {
            GeoJsonGeometry::Point { coordinates } => Geometry::Point(Point(coord(coordinates)?)),
            GeoJsonGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point))
                    .collect::<Result<_>>()?,
            )),
            GeoJsonGeometry::LineString { coordinates } => Geometry::LineString(line(coordinates)?),
            GeoJsonGeometry::MultiLineString { coordinates } => Geometry::MultiLineString(
                MultiLineString(coordinates.iter().map(|l| line(l)).collect::<Result<_>>()?),
            ),
            GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)?),
            GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon(
                coordinates.iter().map(|p| polygon(p)).collect::<Result<_>>()?,
            )),
            GeoJsonGeometry::GeometryCollection { geometries } => {
                Geometry::GeometryCollection(GeometryCollection(
                    geometries.iter().map(|g| g.to_geo()).collect::<Result<_>>()?,
                ))
            }
        })
    }

    fn from_geo(geometry: &Geometry<f64>) -> Result<Self> {
        fn pos(c: Coord<f64>) -> Position {
            vec![c.x, c.y]
        }
        fn ring(l: &LineString<f64>) -> Vec<Position> {
            l.0.iter().copied().map(pos).collect()
        }
        fn rings(p: &Polygon<f64>) -> Vec<Vec<Position>> {
            std::iter::once(ring(p.exterior()))
                .chain(p.interiors().iter().map(ring))
                .collect()
        }

        Ok(match geometry {
            Geometry::Point(p) => GeoJsonGeometry::Point { coordinates: pos(p.0) },
            Geometry::MultiPoint(mp) => GeoJsonGeometry::MultiPoint {
                coordinates: mp.0.iter().map(|p| pos(p.0)).collect(),
            },
            Geometry::LineString(l) => GeoJsonGeometry::LineString { coordinates: ring(l) },
            Geometry::MultiLineString(ml) => GeoJsonGeometry::MultiLineString {
                coordinates: ml.0.iter().map(ring).collect(),
            },
            Geometry::Polygon(p) => GeoJsonGeometry::Polygon { coordinates: rings(p) },
            Geometry::MultiPolygon(mp) => GeoJsonGeometry::MultiPolygon {
                coordinates: mp.0.iter().map(rings).collect(),
            },
            Geometry::Rect(r) => GeoJsonGeometry::Polygon {
                coordinates: rings(&r.to_polygon()),
            },
            Geometry::GeometryCollection(gc) => GeoJsonGeometry::GeometryCollection {
                geometries: gc.0.iter().map(Self::from_geo).collect::<Result<_>>()?,
            },
            other => {
                return Err(Error::Vector(format!(
                    "geometry type not representable in GeoJSON: {:?}",
                    other
                )))
            }
        })
    }
}

/// Read a GeoJSON FeatureCollection.
pub fn read_geojson(path: impl AsRef<Path>) -> Result<FeatureCollection> {
    let path = path.as_ref();
    ensure_exists(path)?;
    let text = std::fs::read_to_string(path)?;
    parse_geojson(&text)
}

fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let doc: GeoJsonCollection = serde_json::from_str(text)?;
    if doc.kind != "FeatureCollection" {
        return Err(Error::Vector(format!(
            "expected FeatureCollection, found {}",
            doc.kind
        )));
    }

    let crs = doc
        .crs
        .as_ref()
        .and_then(|c| CRS::from_user_input(&c.properties.name));

    let features = doc
        .features
        .into_iter()
        .map(|f| {
            let geometry = f.geometry.as_ref().map(GeoJsonGeometry::to_geo).transpose()?;
            let properties = f
                .properties
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, AttributeValue::from(v)))
                .collect();
            let id = f.id.map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            });
            Ok(Feature {
                geometry,
                properties,
                id,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection::with_crs(features, crs))
}

/// Write a FeatureCollection as GeoJSON; appears at `path` only once complete.
pub fn write_geojson(collection: &FeatureCollection, path: impl AsRef<Path>) -> Result<()> {
    let doc = to_document(collection)?;
    write_atomically(path.as_ref(), |file| {
        serde_json::to_writer(&mut *file, &doc)?;
        file.write_all(b"\n")?;
        Ok(())
    })
}

fn to_document(collection: &FeatureCollection) -> Result<GeoJsonCollection> {
    let crs = collection
        .crs
        .as_ref()
        .and_then(CRS::epsg)
        .map(|code| GeoJsonCrs {
            kind: "name".to_string(),
            properties: GeoJsonCrsProperties {
                name: format!("urn:ogc:def:crs:EPSG::{}", code),
            },
        });

    let features = collection
        .iter()
        .map(|f| {
            Ok(GeoJsonFeature {
                kind: "Feature".to_string(),
                id: f.id.clone().map(Value::String),
                geometry: f.geometry.as_ref().map(GeoJsonGeometry::from_geo).transpose()?,
                properties: Some(
                    f.properties
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::from(v)))
                        .collect(),
                ),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GeoJsonCollection {
        kind: "FeatureCollection".to_string(),
        crs,
        features,
    })
}
