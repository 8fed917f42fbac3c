//! Pure-Rust coordinate transforms between WGS84, UTM and Web Mercator.
//!
//! UTM formulas follow Snyder 1987 (USGS Prof. Paper 1395, pp. 61-64).
//! Every transform goes through geographic WGS84 coordinates.

use super::CRS;
use crate::error::{Error, Result};
use std::f64::consts::FRAC_PI_4;

const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Points sampled along each edge by [`CoordTransform::transform_bounds`].
pub const DENSIFY_POINTS: usize = 21;

/// Supported map projections
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude / latitude in degrees
    Geographic,
    /// WGS84 / UTM zone
    Utm { zone: u32, north: bool },
    /// Spherical (pseudo) Mercator, EPSG:3857
    WebMercator,
}

impl Projection {
    /// Projection for an EPSG-coded CRS.
    pub fn from_crs(crs: &CRS) -> Result<Self> {
        let epsg = crs
            .epsg()
            .ok_or_else(|| Error::Alignment(format!("CRS {} has no EPSG code", crs)))?;
        Self::from_epsg(epsg)
    }

    pub fn from_epsg(epsg: u32) -> Result<Self> {
        match epsg {
            4326 | 4269 => Ok(Projection::Geographic),
            3857 | 900913 => Ok(Projection::WebMercator),
            _ => parse_utm_epsg(epsg)
                .map(|(zone, north)| Projection::Utm { zone, north })
                .ok_or_else(|| Error::Alignment(format!("unsupported CRS EPSG:{}", epsg))),
        }
    }

    fn to_geographic(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::Utm { zone, north } => utm_to_wgs84(x, y, zone, north),
            Projection::WebMercator => mercator_to_wgs84(x, y),
        }
    }

    fn from_geographic(self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
            Projection::WebMercator => wgs84_to_mercator(lon, lat),
        }
    }
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

/// Point transform from one CRS to another.
#[derive(Debug, Clone, Copy)]
pub struct CoordTransform {
    src: Projection,
    dst: Projection,
    identity: bool,
}

impl CoordTransform {
    /// Fails with `Error::Alignment` when either CRS is not supported.
    /// Equivalent CRSs always give the identity, even unsupported ones.
    pub fn new(src: &CRS, dst: &CRS) -> Result<Self> {
        if src.is_equivalent(dst) {
            return Ok(Self {
                src: Projection::Geographic,
                dst: Projection::Geographic,
                identity: true,
            });
        }
        let src = Projection::from_crs(src)?;
        let dst = Projection::from_crs(dst)?;
        Ok(Self {
            src,
            dst,
            identity: src == dst,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// The transform running the other way
    pub fn inverse(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
            identity: self.identity,
        }
    }

    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        if self.identity {
            return (x, y);
        }
        let (lon, lat) = self.src.to_geographic(x, y);
        self.dst.from_geographic(lon, lat)
    }

    /// Envelope of a bounding box after transformation.
    ///
    /// Each edge is densified with [`DENSIFY_POINTS`] points so curved
    /// edges in the target CRS are enclosed.
    pub fn transform_bounds(
        &self,
        (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
    ) -> (f64, f64, f64, f64) {
        if self.identity {
            return (min_x, min_y, max_x, max_y);
        }

        let mut out = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        let steps = (DENSIFY_POINTS - 1) as f64;

        for i in 0..DENSIFY_POINTS {
            let t = i as f64 / steps;
            let x = min_x + (max_x - min_x) * t;
            let y = min_y + (max_y - min_y) * t;
            for (px, py) in [(x, min_y), (x, max_y), (min_x, y), (max_x, y)] {
                let (tx, ty) = self.transform(px, py);
                out.0 = out.0.min(tx);
                out.1 = out.1.min(ty);
                out.2 = out.2.max(tx);
                out.3 = out.3.max(ty);
            }
        }

        out
    }
}

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// WGS84 (longitude, latitude) in degrees to UTM (easting, northing) in metres.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a * a;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0
        * n
        * (a + (1.0 - t + c) * a2 * a / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

/// UTM (easting, northing) in metres to WGS84 (longitude, latitude) in degrees.
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude (Snyder eq. 3-26)
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d4 = d2 * d2;
    let d6 = d4 * d2;

    // Snyder eq. 8-17 / 8-18
    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d4
                * d
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

fn wgs84_to_mercator(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let lat = lat_deg.clamp(-85.051_128_78, 85.051_128_78).to_radians();
    (A * lon_deg.to_radians(), A * (FRAC_PI_4 + lat / 2.0).tan().ln())
}

fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lat = 2.0 * (y / A).exp().atan() - std::f64::consts::FRAC_PI_2;
    ((x / A).to_degrees(), lat.to_degrees())
}
