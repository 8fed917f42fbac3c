//! Coordinate reference systems
//!
//! A CRS is known by EPSG code, by WKT text, or both when read through
//! GDAL. Only EPSG-coded systems can be reprojected (see [`Projection`]).

mod transform;

pub use transform::{CoordTransform, Projection};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    wkt: Option<String>,
    epsg: Option<u32>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// Accepts `EPSG:32644`, `epsg:4326`, `urn:ogc:def:crs:EPSG::32644`
    /// and the CRS84 aliases. Anything else gives `None`.
    pub fn from_user_input(input: &str) -> Option<Self> {
        let text = input.trim().to_ascii_uppercase();
        if text == "OGC:CRS84" || text.ends_with("OGC:1.3:CRS84") {
            return Some(Self::wgs84());
        }

        let (_, tail) = text.rsplit_once("EPSG")?;
        tail.trim_start_matches(|c: char| !c.is_ascii_digit())
            .parse()
            .ok()
            .map(Self::from_epsg)
    }

    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Degrees rather than metres
    pub fn is_geographic(&self) -> bool {
        matches!(Projection::from_crs(self), Ok(Projection::Geographic))
    }

    /// Same EPSG code, or failing that identical WKT.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg, &self.wkt, &other.wkt) {
            (Some(a), Some(b), _, _) => a == b,
            (_, _, Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// `EPSG:<code>`, else a truncated `WKT:` prefix
    pub fn identifier(&self) -> String {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => format!("EPSG:{}", code),
            (None, Some(wkt)) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
            (None, None) => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}
