//! Suitability map flow: like the priority flow with every constraint
//! layer ANDed, a caller-chosen ramp direction and no zone statistics.

use crate::config::EngineConfig;
use crate::flow::{basin_clip, constrained_overlay, final_clip, publish, scratch_for};
use crate::publish::Publisher;
use crate::WeightedLayer;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stpgis_algorithms::clip::{ClipTarget, Place};
use stpgis_colormap::{style_for_raster, StyleDescriptor};
use stpgis_core::Result;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityRequest {
    /// Condition layers with their weights
    pub layers: Vec<WeightedLayer>,
    /// Constraint layers, combined with AND
    #[serde(default)]
    pub constraints: Vec<PathBuf>,
    #[serde(default)]
    pub place: Place,
    #[serde(default)]
    pub clip: Vec<i64>,
    /// Reverse the colour ramp
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuitabilityMap {
    pub layer_name: String,
    pub raster_path: PathBuf,
    pub style: StyleDescriptor,
}

pub struct SuitabilityMapper<'a> {
    config: &'a EngineConfig,
    publisher: &'a dyn Publisher,
}

impl<'a> SuitabilityMapper<'a> {
    pub fn new(config: &'a EngineConfig, publisher: &'a dyn Publisher) -> Self {
        Self { config, publisher }
    }

    pub fn create_suitability_map(&self, request: &SuitabilityRequest) -> Result<SuitabilityMap> {
        let config = self.config;
        config.ensure_output_dir()?;
        let mut scratch = scratch_for(config);
        info!(
            "Suitability map: {} conditions, {} constraints",
            request.layers.len(),
            request.constraints.len()
        );

        let overlay = constrained_overlay(config, &request.layers, &request.constraints, &mut scratch)?;
        let (basin, basin_path) = basin_clip(config, &overlay, "stp_suitability", &mut scratch)?;
        let style = style_for_raster(&basin, config.num_classes, config.color_ramp, request.reverse)?;

        let target = (!request.clip.is_empty()).then(|| ClipTarget::Units {
            place: request.place,
            ids: request.clip.clone(),
        });
        let raster_path = final_clip(config, &basin_path, target.as_ref(), &mut scratch)?;
        let layer_name = publish(self.publisher, &raster_path, &style)?;

        Ok(SuitabilityMap {
            layer_name,
            raster_path,
            style,
        })
    }
}
