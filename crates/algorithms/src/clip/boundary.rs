//! Boundary selection and the clipper that writes clipped rasters.

use super::buffer::{anchor_point, buffer_point, BUFFER_SEGMENTS};
use super::mask::mask_raster;
use crate::classify::Zone;
use geo_types::Polygon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use stpgis_core::io::{read_geojson, read_geotiff, unique_output_path, write_geotiff};
use stpgis_core::raster::{Raster, RasterElement};
use stpgis_core::vector::{AttributeValue, Feature, FeatureCollection};
use stpgis_core::{Error, Result, CRS};
use tracing::{debug, info};

/// Which administrative layer a list of identifiers refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    /// Filter villages on `ID`
    Village,
    /// Filter villages on `subdis_cod`
    #[default]
    Subdistrict,
}

impl Place {
    /// Attribute holding the identifier for this place kind
    pub fn id_field(self) -> &'static str {
        match self {
            Place::Village => "ID",
            Place::Subdistrict => "subdis_cod",
        }
    }
}

impl FromStr for Place {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "village" => Ok(Place::Village),
            "subdistrict" | "sub_district" | "sub-district" => Ok(Place::Subdistrict),
            other => Err(Error::invalid_parameter(
                "place",
                other,
                "expected `village` or `subdistrict`",
            )),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Village => write!(f, "village"),
            Place::Subdistrict => write!(f, "subdistrict"),
        }
    }
}

/// Population class of a town, which fixes its buffer radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TownClass {
    One,
    Two,
    Three,
    Four,
    Five,
    Unclassified,
}

impl TownClass {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => TownClass::One,
            2 => TownClass::Two,
            3 => TownClass::Three,
            4 => TownClass::Four,
            5 => TownClass::Five,
            _ => TownClass::Unclassified,
        }
    }

    /// Read from a `class` attribute; missing or non-numeric is unclassified.
    /// Fractional codes are truncated toward zero.
    pub fn from_attribute(value: Option<&AttributeValue>) -> Self {
        let code = match value {
            Some(AttributeValue::Float(v)) if v.is_finite() => Some(v.trunc() as i64),
            Some(other) => other.as_i64(),
            None => None,
        };
        code.map_or(TownClass::Unclassified, Self::from_code)
    }

    /// Buffer radius in the working CRS's linear unit
    pub fn buffer_radius(self) -> f64 {
        match self {
            TownClass::One => 35_000.0,
            TownClass::Two => 30_000.0,
            TownClass::Three => 25_000.0,
            TownClass::Four => 20_000.0,
            TownClass::Five => 10_000.0,
            TownClass::Unclassified => 5_000.0,
        }
    }
}

/// What a raster is clipped to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipTarget {
    /// Every feature of a basin boundary file
    Basin { path: PathBuf },
    /// Village or subdistrict selection
    Units { place: Place, ids: Vec<i64> },
    /// Buffer around the first selected town
    TownBuffer { ids: Vec<i64> },
}

impl ClipTarget {
    fn stem(&self) -> &'static str {
        match self {
            ClipTarget::Basin { .. } => "basin_clip",
            ClipTarget::Units { .. } => "unit_clip",
            ClipTarget::TownBuffer { .. } => "town_clip",
        }
    }
}

/// Clips rasters to boundaries held in the working CRS.
#[derive(Debug, Clone)]
pub struct BoundaryClipper {
    working_crs: CRS,
    villages_path: PathBuf,
    town_path: PathBuf,
    output_dir: PathBuf,
}

impl BoundaryClipper {
    pub fn new(
        working_crs: CRS,
        villages_path: impl Into<PathBuf>,
        town_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            working_crs,
            villages_path: villages_path.into(),
            town_path: town_path.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn working_crs(&self) -> &CRS {
        &self.working_crs
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Read a vector layer and bring it into `crs`. A layer without a CRS
    /// is taken to be in the working CRS.
    fn load_layer(&self, path: &Path, crs: &CRS) -> Result<FeatureCollection> {
        read_geojson(path)?
            .with_default_crs(&self.working_crs)
            .to_crs(crs)
    }

    fn select_units(&self, place: Place, ids: &[i64], crs: &CRS) -> Result<FeatureCollection> {
        let selected = self
            .load_layer(&self.villages_path, crs)?
            .filter_in(place.id_field(), ids);
        if selected.is_empty() {
            return Err(Error::EmptyResult(format!(
                "no {} matches ids {:?}",
                place, ids
            )));
        }
        Ok(selected)
    }

    /// Clip polygons for `target`, expressed in `crs`.
    pub fn boundary(&self, target: &ClipTarget, crs: &CRS) -> Result<Vec<Polygon<f64>>> {
        let polygons = match target {
            ClipTarget::Basin { path } => self.load_layer(path, crs)?.to_multi_polygon().0,
            ClipTarget::Units { place, ids } => {
                self.select_units(*place, ids, crs)?.to_multi_polygon().0
            }
            ClipTarget::TownBuffer { ids } => {
                let towns = self.load_layer(&self.town_path, &self.working_crs)?.filter_in("ID", ids);
                let town = towns.iter().next().ok_or_else(|| {
                    Error::EmptyResult(format!("no town matches ids {:?}", ids))
                })?;

                let class = TownClass::from_attribute(town.get_property("class"));
                let radius = class.buffer_radius();
                let center = town
                    .geometry
                    .as_ref()
                    .and_then(anchor_point)
                    .ok_or_else(|| Error::Vector("town feature has no geometry".into()))?;
                debug!("town {:?} class {:?}: buffer radius {}", ids, class, radius);

                // Buffer in the working CRS so the radius keeps its linear unit
                let buffered = FeatureCollection::with_crs(
                    vec![Feature::new(
                        buffer_point(center, radius, BUFFER_SEGMENTS).into(),
                    )],
                    Some(self.working_crs.clone()),
                );
                buffered.to_crs(crs)?.to_multi_polygon().0
            }
        };

        if polygons.is_empty() {
            return Err(Error::EmptyResult("boundary has no polygon".into()));
        }
        Ok(polygons)
    }

    /// Clip an in-memory raster with crop.
    pub fn clip_raster<T: RasterElement>(&self, raster: &Raster<T>, target: &ClipTarget) -> Result<Raster<T>> {
        let crs = raster.crs().cloned().unwrap_or_else(|| self.working_crs.clone());
        let polygons = self.boundary(target, &crs)?;
        mask_raster(raster, &polygons, true)
    }

    /// Clip a raster file and write the result under a fresh unique name
    /// in the output directory.
    pub fn clip_file(&self, input: &Path, target: &ClipTarget) -> Result<PathBuf> {
        let raster: Raster<f64> = read_geotiff(input, None)?;
        let clipped = self.clip_raster(&raster, target)?;

        let out = unique_output_path(&self.output_dir, target.stem(), "tif");
        write_geotiff(&clipped, &out, None)?;
        info!(
            "Clipped {} to {}x{} -> {}",
            input.display(),
            clipped.cols(),
            clipped.rows(),
            out.display()
        );
        Ok(out)
    }

    /// Named zones for a unit selection, in `crs`. Zone names come from
    /// the `Name` attribute.
    pub fn unit_zones(&self, place: Place, ids: &[i64], crs: &CRS) -> Result<Vec<Zone>> {
        let selected = self.select_units(place, ids, crs)?;
        Ok(selected
            .iter()
            .map(|f| Zone {
                name: f
                    .get_property("Name")
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                polygons: f.polygons(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_town_radius_table() {
        assert_eq!(TownClass::from_code(3).buffer_radius(), 25_000.0);
        assert_eq!(TownClass::from_code(1).buffer_radius(), 35_000.0);
        assert_eq!(TownClass::from_code(5).buffer_radius(), 10_000.0);
        assert_eq!(TownClass::from_code(9).buffer_radius(), 5_000.0);
        assert_eq!(TownClass::from_attribute(None).buffer_radius(), 5_000.0);
        assert_eq!(
            TownClass::from_attribute(Some(&AttributeValue::String("2".into()))),
            TownClass::Two
        );
        assert_eq!(
            TownClass::from_attribute(Some(&AttributeValue::String("big".into()))),
            TownClass::Unclassified
        );
        assert_eq!(
            TownClass::from_attribute(Some(&AttributeValue::Float(3.7))).buffer_radius(),
            25_000.0
        );
        assert_eq!(
            TownClass::from_attribute(Some(&AttributeValue::Float(f64::NAN))),
            TownClass::Unclassified
        );
    }

    #[test]
    fn test_place_parsing() {
        assert_eq!("village".parse::<Place>().unwrap(), Place::Village);
        assert_eq!("Subdistrict".parse::<Place>().unwrap(), Place::Subdistrict);
        assert!("district".parse::<Place>().is_err());
        assert_eq!(Place::default().id_field(), "subdis_cod");
        assert_eq!(Place::Village.id_field(), "ID");
    }
}
