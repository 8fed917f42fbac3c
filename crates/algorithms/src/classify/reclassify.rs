//! Continuous raster to class raster.

use super::ClassBreaks;
use ndarray::Array2;
use rayon::prelude::*;
use stpgis_core::raster::Raster;
use stpgis_core::{Error, Result};

/// Map each valid cell to its class in `1..=n`; nodata cells become 0,
/// which is also the output's nodata value.
pub fn reclassify(raster: &Raster<f64>, breaks: &ClassBreaks) -> Result<Raster<u8>> {
    let (rows, cols) = raster.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, class) in row_data.iter_mut().enumerate() {
                if raster.is_valid_at(row, col) {
                    if let Ok(v) = raster.get(row, col) {
                        *class = breaks.classify(v);
                    }
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reclassify_with_nodata() {
        let mut r = Raster::from_vec(vec![0.0, 45.0, 100.0, -1.0, f64::NAN, 79.9], 2, 3).unwrap();
        r.set_nodata(Some(-1.0));
        let breaks = ClassBreaks::equal_interval(0.0, 100.0, 5).unwrap();

        let classes = reclassify(&r, &breaks).unwrap();
        let got: Vec<u8> = classes.data().iter().copied().collect();
        assert_eq!(got, vec![1, 3, 5, 0, 0, 4]);
        assert_eq!(classes.nodata(), Some(0));
    }
}
