//! Vector features: boundary polygons, town points, catchments.

use crate::crs::{CoordTransform, CRS};
use crate::error::{Error, Result};
use geo::{BoundingRect, MapCoords};
use geo_types::{Coord, Geometry, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Integer view. Integral floats and numeric strings are accepted,
    /// since identifier columns arrive in any of those shapes.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
            },
            Value::String(s) => AttributeValue::String(s),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        use serde_json::Value;
        match value {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => Value::from(*i),
            AttributeValue::Float(v) => {
                serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number)
            }
            AttributeValue::String(s) => Value::String(s.clone()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: HashMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    pub fn remove_property(&mut self, key: &str) -> Option<AttributeValue> {
        self.properties.remove(key)
    }

    /// Polygonal parts of the geometry; points and lines contribute nothing.
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        self.geometry.as_ref().map_or_else(Vec::new, polygons_of)
    }
}

fn polygons_of(geometry: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}

/// Collection of features sharing one CRS
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(features: Vec<Feature>, crs: Option<CRS>) -> Self {
        Self { features, crs }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Features whose integer attribute `key` is one of `ids`, in file order.
    pub fn filter_in(&self, key: &str, ids: &[i64]) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .filter(|f| {
                f.get_property(key)
                    .and_then(AttributeValue::as_i64)
                    .is_some_and(|v| ids.contains(&v))
            })
            .cloned()
            .collect();
        FeatureCollection::with_crs(features, self.crs.clone())
    }

    /// Assign `crs` when the collection carries none.
    pub fn with_default_crs(mut self, crs: &CRS) -> Self {
        if self.crs.is_none() {
            self.crs = Some(crs.clone());
        }
        self
    }

    /// Reproject every geometry into `target`.
    pub fn to_crs(&self, target: &CRS) -> Result<FeatureCollection> {
        let source = self
            .crs
            .as_ref()
            .ok_or_else(|| Error::Vector("feature collection has no CRS".into()))?;
        let transform = CoordTransform::new(source, target)?;

        let features = self
            .features
            .iter()
            .map(|f| Feature {
                geometry: f.geometry.as_ref().map(|g| {
                    if transform.is_identity() {
                        g.clone()
                    } else {
                        g.map_coords(move |c: Coord<f64>| {
                            let (x, y) = transform.transform(c.x, c.y);
                            Coord { x, y }
                        })
                    }
                }),
                properties: f.properties.clone(),
                id: f.id.clone(),
            })
            .collect();

        Ok(FeatureCollection::with_crs(features, Some(target.clone())))
    }

    /// All polygonal parts as one multipolygon
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon(self.features.iter().flat_map(Feature::polygons).collect())
    }

    /// Envelope `(min_x, min_y, max_x, max_y)` of every geometry
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .map(|r| (r.min().x, r.min().y, r.max().x, r.max().y))
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
