//! Masking a raster to polygons.

use geo::BoundingRect;
use geo_types::{MultiPolygon, Polygon};
use ndarray::{s, Array2};
use rayon::prelude::*;
use stpgis_core::raster::{GeoTransform, Raster, RasterElement};
use stpgis_core::{Error, Result};

/// Cells whose centre lies inside any of `polygons`.
///
/// Each polygon is scanned with the even-odd rule over all its rings, so
/// holes are excluded; polygons are then OR'ed together. Only north-up
/// transforms are supported.
pub fn rasterize_polygons(
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
    polygons: &[Polygon<f64>],
) -> Result<Array2<bool>> {
    if !transform.is_north_up() {
        return Err(Error::Algorithm(
            "polygon masking needs a north-up raster".into(),
        ));
    }

    let edges: Vec<Vec<(f64, f64, f64, f64)>> = polygons.iter().map(polygon_edges).collect();
    let ox = transform.origin_x;
    let pw = transform.pixel_width;

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            let (_, y) = transform.pixel_to_geo(0, row);
            let mut xs = Vec::new();

            for poly_edges in &edges {
                xs.clear();
                for &(x1, y1, x2, y2) in poly_edges {
                    if (y1 > y) != (y2 > y) {
                        xs.push(x1 + (y - y1) * (x2 - x1) / (y2 - y1));
                    }
                }
                xs.sort_by(|a, b| a.total_cmp(b));

                for pair in xs.chunks_exact(2) {
                    // Columns whose centre x falls in [pair[0], pair[1])
                    let start = ((pair[0] - ox) / pw - 0.5).ceil().clamp(0.0, cols as f64) as usize;
                    let end = ((pair[1] - ox) / pw - 0.5).ceil().clamp(0.0, cols as f64) as usize;
                    for cell in &mut row_data[start..end.max(start)] {
                        *cell = true;
                    }
                }
            }
            row_data
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

fn polygon_edges(polygon: &Polygon<f64>) -> Vec<(f64, f64, f64, f64)> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| ring.lines().map(|l| (l.start.x, l.start.y, l.end.x, l.end.y)))
        .collect()
}

/// Mask `raster` to `polygons`.
///
/// Cells whose centre is outside every polygon become nodata: the
/// raster's own nodata value, or the type's default (NaN for floats)
/// when it has none. With `crop`, the output shrinks to the pixel window
/// covering the polygons' bounding box.
///
/// # Errors
/// `EmptyResult` when no polygon is given, the window misses the raster,
/// or no cell centre falls inside a polygon.
pub fn mask_raster<T: RasterElement>(
    raster: &Raster<T>,
    polygons: &[Polygon<f64>],
    crop: bool,
) -> Result<Raster<T>> {
    let bbox = MultiPolygon(polygons.to_vec())
        .bounding_rect()
        .ok_or_else(|| Error::EmptyResult("no polygon to clip to".into()))?;

    let transform = *raster.transform();
    if !transform.is_north_up() {
        return Err(Error::Algorithm(
            "polygon masking needs a north-up raster".into(),
        ));
    }
    let (rows, cols) = raster.shape();

    let (row_range, col_range) = if crop {
        let (c0, r0) = transform.geo_to_pixel(bbox.min().x, bbox.max().y);
        let (c1, r1) = transform.geo_to_pixel(bbox.max().x, bbox.min().y);
        let clamp = |v: f64, hi: usize| v.clamp(0.0, hi as f64) as usize;
        (
            clamp(r0.floor(), rows)..clamp(r1.ceil(), rows),
            clamp(c0.floor(), cols)..clamp(c1.ceil(), cols),
        )
    } else {
        (0..rows, 0..cols)
    };

    if row_range.is_empty() || col_range.is_empty() {
        return Err(Error::EmptyResult(
            "clip polygons do not overlap the raster".into(),
        ));
    }

    let window = raster
        .data()
        .slice(s![row_range.clone(), col_range.clone()])
        .to_owned();
    let window_transform = transform.window(col_range.start, row_range.start);
    let (out_rows, out_cols) = window.dim();

    let inside = rasterize_polygons(&window_transform, out_rows, out_cols, polygons)?;
    if !inside.iter().any(|&b| b) {
        return Err(Error::EmptyResult(
            "no cell centre falls inside the clip polygons".into(),
        ));
    }

    let fill = raster.nodata().unwrap_or_else(T::default_nodata);
    let mut data = window;
    ndarray::Zip::from(&mut data)
        .and(&inside)
        .for_each(|v, &keep| {
            if !keep {
                *v = fill;
            }
        });

    let mut output = Raster::from_array(data);
    output.set_transform(window_transform);
    output.set_crs(raster.crs().cloned());
    output.set_nodata(Some(fill));
    Ok(output)
}
