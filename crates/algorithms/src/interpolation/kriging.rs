//! Ordinary Kriging interpolation
//!
//! Best Linear Unbiased Estimator (BLUE) for spatial data. All samples
//! enter one kriging system, factored once and solved per output cell:
//! ```text
//! [γ(x₁,x₁) ... γ(x₁,xₙ) 1] [w₁]   [γ(x₁,x₀)]
//! [   ...     ...    ...    .]  [. ] = [   ...    ]
//! [γ(xₙ,x₁) ... γ(xₙ,xₙ) 1] [wₙ]   [γ(xₙ,x₀)]
//! [  1       ...    1       0] [μ ]   [    1     ]
//! ```
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use rayon::prelude::*;
use stpgis_core::raster::Raster;
use stpgis_core::{Error, Result};

use super::linalg::LuFactor;
use super::variogram::SphericalVariogram;
use super::{InterpolationGrid, SamplePoint};

/// Ordinary kriging of `points` onto `grid` with a spherical `variogram`.
///
/// # Errors
/// `SingularSystem` when the kriging matrix cannot be factored, e.g.
/// duplicated sample locations or a flat variogram.
pub fn ordinary_kriging(
    points: &[SamplePoint],
    variogram: &SphericalVariogram,
    grid: &InterpolationGrid,
) -> Result<Raster<f64>> {
    let n = points.len();
    if n == 0 {
        return Err(Error::Algorithm("No sample points provided".into()));
    }

    let m = n + 1;
    let mut mat = vec![0.0_f64; m * m];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let h = points[i].dist(points[j].x, points[j].y);
                mat[i * m + j] = variogram.evaluate(h);
            }
        }
        mat[i * m + n] = 1.0;
        mat[n * m + i] = 1.0;
    }
    let lu = LuFactor::new(m, mat)?;

    let (rows, cols) = (grid.rows, grid.cols);
    let transform = grid.transform;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut rhs = vec![1.0_f64; m];

            for (col, out) in row_data.iter_mut().enumerate() {
                let (x0, y0) = transform.pixel_to_geo(col, row);
                for (r, pt) in rhs.iter_mut().zip(points) {
                    *r = variogram.evaluate(pt.dist(x0, y0));
                }
                rhs[n] = 1.0;

                let w = lu.solve(&rhs);
                *out = w[..n].iter().zip(points).map(|(wi, p)| wi * p.value).sum();
            }
            row_data
        })
        .collect();

    grid.to_raster(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stpgis_core::raster::GeoTransform;

    fn grid(n: usize, extent: f64) -> InterpolationGrid {
        let res = extent / n as f64;
        InterpolationGrid {
            rows: n,
            cols: n,
            transform: GeoTransform::new(0.0, extent, res, -res),
            crs: None,
        }
    }

    fn model() -> SphericalVariogram {
        SphericalVariogram {
            nugget: 0.0,
            partial_sill: 10.0,
            range: 50.0,
        }
    }

    #[test]
    fn test_exact_at_samples() {
        // Samples on cell centres of a 10 x 10 grid with 10 m cells
        let pts = vec![
            SamplePoint::new(5.0, 95.0, 1.0),
            SamplePoint::new(95.0, 95.0, 4.0),
            SamplePoint::new(45.0, 45.0, 9.0),
            SamplePoint::new(15.0, 5.0, 2.0),
        ];
        let out = ordinary_kriging(&pts, &model(), &grid(10, 100.0)).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 1.0, epsilon = 1e-8);
        assert_relative_eq!(out.get(5, 4).unwrap(), 9.0, epsilon = 1e-8);
        assert_relative_eq!(out.get(9, 1).unwrap(), 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_constant_field_reproduced() {
        let pts: Vec<SamplePoint> = (0..5)
            .map(|i| SamplePoint::new(10.0 + 20.0 * i as f64, 30.0 + 7.0 * i as f64, 3.5))
            .collect();
        let out = ordinary_kriging(&pts, &model(), &grid(8, 100.0)).unwrap();
        for v in out.data().iter() {
            assert_relative_eq!(*v, 3.5, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_duplicate_locations_are_singular() {
        let pts = vec![
            SamplePoint::new(10.0, 10.0, 1.0),
            SamplePoint::new(10.0, 10.0, 2.0),
            SamplePoint::new(60.0, 40.0, 3.0),
        ];
        let err = ordinary_kriging(&pts, &model(), &grid(4, 100.0)).unwrap_err();
        assert!(matches!(err, Error::SingularSystem(_)));
    }
}
