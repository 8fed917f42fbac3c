//! GeoTIFF reading and writing using GDAL

use super::{ensure_exists, GeoTiffOptions, TiffCompression};
use crate::crs::CRS;
use crate::error::Result;
use crate::raster::{GeoTransform, Raster, RasterElement};
use gdal::raster::{Buffer, GdalType, RasterCreationOptions};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use std::path::Path;

/// Read a GeoTIFF band (1-indexed, default 1) into a Raster
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement + GdalType + Copy,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_exists(path)?;
    let dataset = Dataset::open(path)?;
    let rasterband = dataset.rasterband(band.unwrap_or(1))?;

    let (cols, rows) = dataset.raster_size();
    let buffer = rasterband.read_as::<T>((0, 0), (cols, rows), (cols, rows), None)?;

    let mut raster = Raster::from_vec(buffer.data().to_vec(), rows, cols)?;

    if let Ok(gt) = dataset.geo_transform() {
        raster.set_transform(GeoTransform::from_gdal(gt));
    }

    if let Ok(srs) = dataset.spatial_ref() {
        let crs = match srs.auth_code() {
            Ok(code) => Some(CRS::from_epsg(code as u32)),
            Err(_) => srs.to_wkt().ok().map(CRS::from_wkt),
        };
        raster.set_crs(crs);
    }

    if let Some(nd) = rasterband.no_data_value() {
        raster.set_nodata(T::from_f64(nd));
    }

    Ok(raster)
}

/// Write a Raster to a GeoTIFF via a temp file persisted on success
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement + GdalType + Copy,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let opts = options.unwrap_or_default();
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (rows, cols) = raster.shape();

    let compress = match opts.compression {
        TiffCompression::None => "NONE",
        TiffCompression::Lzw => "LZW",
        TiffCompression::Deflate => "DEFLATE",
    };
    let mut create_options = RasterCreationOptions::new();
    create_options.set_name_value("COMPRESS", compress)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new().suffix(".tif").tempfile_in(dir)?;

    {
        let mut dataset = driver.create_with_band_type_with_options::<T, _>(
            tmp.path(),
            cols,
            rows,
            1,
            &create_options,
        )?;

        dataset.set_geo_transform(&raster.transform().to_gdal())?;

        if let Some(crs) = raster.crs() {
            let srs = match (crs.epsg(), crs.wkt()) {
                (Some(epsg), _) => Some(SpatialRef::from_epsg(epsg)?),
                (None, Some(wkt)) => Some(SpatialRef::from_wkt(wkt)?),
                _ => None,
            };
            if let Some(srs) = srs {
                dataset.set_spatial_ref(&srs)?;
            }
        }

        let mut band = dataset.rasterband(1)?;
        if let Some(nd) = raster.nodata().and_then(|v| v.to_f64()) {
            band.set_no_data_value(Some(nd))?;
        }

        let mut buffer = Buffer::new((cols, rows), raster.data().iter().copied().collect());
        band.write((0, 0), (cols, rows), &mut buffer)?;
    }

    tmp.persist(path)?;
    Ok(())
}
