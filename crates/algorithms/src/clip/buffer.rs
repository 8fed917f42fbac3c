//! Circular buffers around town locations.

use geo::Centroid;
use geo_types::{Geometry, LineString, Point, Polygon};
use std::f64::consts::PI;

/// Segments used to approximate a circle
pub const BUFFER_SEGMENTS: usize = 64;

/// Polygon approximating a circle of `radius` around `center`.
pub fn buffer_point(center: Point<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(4);
    let r = radius.abs();
    let (cx, cy) = (center.x(), center.y());

    let mut coords: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64;
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect();
    coords.push((cx + r, cy));

    Polygon::new(LineString::from(coords), vec![])
}

/// Point a town is buffered around: the point itself, or the centroid of
/// any other geometry.
pub(crate) fn anchor_point(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        other => other.centroid(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use geo_types::polygon;

    #[test]
    fn test_buffer_area_close_to_circle() {
        let poly = buffer_point(Point::new(0.0, 0.0), 25_000.0, BUFFER_SEGMENTS);
        let expected = PI * 25_000.0 * 25_000.0;
        let err = (poly.unsigned_area() - expected).abs() / expected;
        assert!(err < 0.01, "area error {:.3}%", err * 100.0);
        assert_eq!(poly.exterior().0.len(), BUFFER_SEGMENTS + 1);
    }

    #[test]
    fn test_anchor_of_polygon_is_centroid() {
        let sq = Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)]);
        let p = anchor_point(&sq).unwrap();
        assert!((p.x() - 1.0).abs() < 1e-12 && (p.y() - 1.0).abs() < 1e-12);
    }
}
