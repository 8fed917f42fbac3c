//! Equal-interval class edges.

use serde::{Deserialize, Serialize};
use stpgis_core::raster::{Raster, RasterElement};
use stpgis_core::{Error, Result};

/// Column labels of the five suitability classes, lowest first
pub const CLASS_LABELS: [&str; 5] = ["Very_Low", "Low", "Medium", "High", "Very_High"];

/// `n + 1` ascending edges splitting `[min, max]` into `n` equal bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassBreaks {
    edges: Vec<f64>,
}

impl ClassBreaks {
    /// Linearly spaced edges; the last edge is exactly `max`.
    ///
    /// With `min == max` every edge equals `min`.
    pub fn equal_interval(min: f64, max: f64, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::invalid_parameter("classes", n, "need at least one class"));
        }
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(Error::invalid_parameter(
                "range",
                format!("[{}, {}]", min, max),
                "bounds must be finite and ascending",
            ));
        }

        let step = (max - min) / n as f64;
        let mut edges: Vec<f64> = (0..=n).map(|i| min + i as f64 * step).collect();
        edges[n] = max;
        Ok(Self { edges })
    }

    /// Breaks over the valid-cell range of `raster`.
    pub fn from_raster<T: RasterElement>(raster: &Raster<T>, n: usize) -> Result<Self> {
        let (min, max) = raster
            .valid_range()
            .ok_or_else(|| Error::EmptyResult("raster has no valid cell to classify".into()))?;
        Self::equal_interval(min, max, n)
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn num_classes(&self) -> usize {
        self.edges.len() - 1
    }

    /// Edges strictly between the first and the last
    pub fn interior(&self) -> &[f64] {
        &self.edges[1..self.edges.len() - 1]
    }

    /// Class number in `1..=n`: one plus the count of interior edges `<= value`.
    pub fn classify(&self, value: f64) -> u8 {
        let above = self.interior().iter().filter(|&&e| e <= value).count();
        (above + 1) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equal_interval_edges() {
        let b = ClassBreaks::equal_interval(0.0, 100.0, 5).unwrap();
        let expected = [0.0, 20.0, 40.0, 60.0, 80.0, 100.0];
        for (e, x) in b.edges().iter().zip(expected) {
            assert_relative_eq!(*e, x, epsilon = 1e-12);
        }
        assert_eq!(b.classify(45.0), 3);
        assert_eq!(b.classify(0.0), 1);
        assert_eq!(b.classify(20.0), 2);
        assert_eq!(b.classify(100.0), 5);
    }

    #[test]
    fn test_degenerate_range_collapses() {
        let b = ClassBreaks::equal_interval(7.0, 7.0, 5).unwrap();
        assert!(b.edges().iter().all(|&e| e == 7.0));
        assert_eq!(b.classify(7.0), 5);
    }

    #[test]
    fn test_from_raster_requires_valid_cells() {
        let r = Raster::filled(3, 3, f64::NAN);
        assert!(matches!(ClassBreaks::from_raster(&r, 5), Err(Error::EmptyResult(_))));

        let r = Raster::from_vec(vec![f64::NAN, 2.0, 4.0, 12.0], 2, 2).unwrap();
        let b = ClassBreaks::from_raster(&r, 5).unwrap();
        assert_relative_eq!(b.edges()[0], 2.0);
        assert_relative_eq!(b.edges()[5], 12.0);
    }

    #[test]
    fn test_zero_classes_rejected() {
        assert!(ClassBreaks::equal_interval(0.0, 1.0, 0).is_err());
    }
}
