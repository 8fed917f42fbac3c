//! Priority map flow: weighted criteria, constraints, basin and unit
//! clips, per-village class statistics, then publishing.

use crate::config::EngineConfig;
use crate::flow::{basin_clip, constrained_overlay, final_clip, publish, scratch_for};
use crate::publish::Publisher;
use crate::WeightedLayer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stpgis_algorithms::classify::{
    reclassify, write_zone_csv, zone_class_statistics, ClassBreaks, ZoneStatistic, CLASS_LABELS,
};
use stpgis_algorithms::clip::{ClipTarget, Place};
use stpgis_colormap::{style_for_raster, StyleDescriptor};
use stpgis_core::io::{read_geotiff, unique_output_path};
use stpgis_core::raster::Raster;
use stpgis_core::Result;
use tracing::info;

/// Inputs of one priority run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityRequest {
    pub layers: Vec<WeightedLayer>,
    #[serde(default)]
    pub constraints: Vec<PathBuf>,
    #[serde(default)]
    pub place: Place,
    /// Unit ids to clip to; empty keeps the whole basin
    #[serde(default)]
    pub clip: Vec<i64>,
}

/// Result of a priority run
#[derive(Debug, Clone, Serialize)]
pub struct PriorityMap {
    pub layer_name: String,
    pub raster_path: PathBuf,
    pub style: StyleDescriptor,
    pub csv_path: Option<PathBuf>,
    pub zones: Vec<ZoneStatistic>,
}

pub struct PriorityMapper<'a> {
    config: &'a EngineConfig,
    publisher: &'a dyn Publisher,
}

impl<'a> PriorityMapper<'a> {
    pub fn new(config: &'a EngineConfig, publisher: &'a dyn Publisher) -> Self {
        Self { config, publisher }
    }

    pub fn create_priority_map(&self, request: &PriorityRequest) -> Result<PriorityMap> {
        let config = self.config;
        config.ensure_output_dir()?;
        let mut scratch = scratch_for(config);
        info!(
            "Priority map: {} layers, {} constraints, {} {} ids",
            request.layers.len(),
            request.constraints.len(),
            request.clip.len(),
            request.place
        );

        let overlay = constrained_overlay(config, &request.layers, &request.constraints, &mut scratch)?;
        let (basin, basin_path) = basin_clip(config, &overlay, "stp_priority", &mut scratch)?;

        // High priority is drawn in the low end of the ramp
        let style = style_for_raster(&basin, config.num_classes, config.color_ramp, true)?;

        let target = (!request.clip.is_empty()).then(|| ClipTarget::Units {
            place: request.place,
            ids: request.clip.clone(),
        });
        let raster_path = final_clip(config, &basin_path, target.as_ref(), &mut scratch)?;

        let (csv_path, zones) = if request.clip.is_empty() {
            (None, Vec::new())
        } else {
            let (path, zones) = self.zone_details(&raster_path, request.place, &request.clip)?;
            (Some(path), zones)
        };

        let layer_name = publish(self.publisher, &raster_path, &style)?;

        Ok(PriorityMap {
            layer_name,
            raster_path,
            style,
            csv_path,
            zones,
        })
    }

    /// Five-class breakdown of `raster` per selected unit, persisted as
    /// `village_details_<hex>.csv`.
    fn zone_details(
        &self,
        raster: &Path,
        place: Place,
        ids: &[i64],
    ) -> Result<(PathBuf, Vec<ZoneStatistic>)> {
        let raster: Raster<f64> = read_geotiff(raster, None)?;
        let breaks = ClassBreaks::from_raster(&raster, CLASS_LABELS.len())?;
        let classes = reclassify(&raster, &breaks)?;

        let crs = raster.crs().cloned().unwrap_or_else(|| self.config.crs());
        let zones = self.config.clipper().unit_zones(place, ids, &crs)?;
        let stats = zone_class_statistics(&classes, &zones)?;

        let csv = unique_output_path(&self.config.output_dir, "village_details", "csv");
        write_zone_csv(&stats, &csv)?;
        info!("Zone statistics for {} units -> {}", stats.len(), csv.display());
        Ok((csv, stats))
    }
}
