//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Georeferencing is carried by ModelPixelScale and
//! ModelTiepoint, the EPSG code by the GeoKeyDirectory, and nodata by the
//! GDAL_NODATA ASCII tag.

use super::{ensure_exists, write_atomically, GeoTiffOptions, TiffCompression};
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::compression::{Compression, Deflate, Lzw, Uncompressed};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn tiff_err(context: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Other(format!("{}: {}", context, e))
}

/// Read band 1 of a GeoTIFF file into a Raster.
pub fn read_geotiff<T, P>(path: P, _band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_exists(path)?;
    let file = File::open(path)?;
    decode_geotiff(file)
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?;

    fn cast_all<S: num_traits::NumCast, T: RasterElement>(buf: Vec<S>) -> Vec<T> {
        buf.into_iter()
            .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
            .collect()
    }

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    // Multi-sample images decode interleaved; only single-band grids are accepted.
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder)? {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(read_nodata::<T, R>(&mut decoder));

    Ok(raster)
}

/// Transform from ModelPixelScale + ModelTiepoint. `None` for an
/// ungeoreferenced image; an image georeferenced only through
/// ModelTransformation is rejected rather than placed on the default grid.
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok();

    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) if scale.len() >= 2 && tiepoint.len() >= 6 => {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            Ok(Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1])))
        }
        _ if decoder.find_tag(tag(MODEL_TRANSFORMATION)).ok().flatten().is_some() => {
            Err(Error::Alignment(
                "georeferencing by ModelTransformationTag is not supported".into(),
            ))
        }
        _ => Ok(None),
    }
}

/// EPSG code from ProjectedCSTypeGeoKey, falling back to GeographicTypeGeoKey.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY)).ok()?;
    if keys.len() < 4 {
        return None;
    }

    let num_keys = keys[3] as usize;
    let entries: Vec<&[u16]> = keys[4..]
        .chunks_exact(4)
        .take(num_keys)
        .collect();

    let lookup = |id: u16| {
        entries
            .iter()
            .find(|e| e[0] == id && e[1] == 0)
            .map(|e| e[3])
            .filter(|&v| v > 0 && v != USER_DEFINED)
    };

    lookup(KEY_PROJECTED_CS_TYPE)
        .or_else(|| lookup(KEY_GEOGRAPHIC_TYPE))
        .map(|code| CRS::from_epsg(code as u32))
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(tag(GDAL_NODATA)).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    T::from_f64(value)
}

/// Write a Raster to a GeoTIFF file as 32-bit float.
///
/// The file appears at `path` only after it is complete.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    write_atomically(path.as_ref(), |file| match opts.compression {
        TiffCompression::None => encode_geotiff(raster, file, Uncompressed),
        TiffCompression::Lzw => encode_geotiff(raster, file, Lzw),
        TiffCompression::Deflate => encode_geotiff(raster, file, Deflate::default()),
    })
}

fn geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let geographic = crs.is_some_and(|c| c.is_geographic());
    let model_type = if geographic { 2 } else { 1 };

    let mut keys: Vec<[u16; 4]> = vec![[KEY_MODEL_TYPE, 0, 1, model_type], [KEY_RASTER_TYPE, 0, 1, 1]];
    if let Some(code) = crs.and_then(|c| c.epsg()).and_then(|e| u16::try_from(e).ok()) {
        let key = if geographic { KEY_GEOGRAPHIC_TYPE } else { KEY_PROJECTED_CS_TYPE };
        keys.push([key, 0, 1, code]);
    }

    // Header: version 1.1.0, key count
    let mut dir = vec![1, 1, 0, keys.len() as u16];
    dir.extend(keys.concat());
    dir
}

fn encode_geotiff<T, W, D>(raster: &Raster<T>, writer: W, compression: D) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
    D: Compression,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image_with_compression::<Gray32Float, D>(cols as u32, rows as u32, compression)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    let keys = geokeys(raster.crs());
    image
        .encoder()
        .write_tag(tag(GEO_KEY_DIRECTORY), keys.as_slice())
        .map_err(tiff_err("Cannot write geokey tag"))?;

    if let Some(nd) = raster.nodata().and_then(|v| v.to_f64()) {
        let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
        image
            .encoder()
            .write_tag(tag(GDAL_NODATA), text.as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;
    }

    image
        .write_data(&data)
        .map_err(tiff_err("Cannot write image data"))?;

    Ok(())
}
