//! Re-clipping of pre-computed category rasters.
//!
//! Category rasters are finished priority / suitability products kept by
//! the caller together with their style. They are clipped either to a unit
//! selection, keeping the stored style, or to a town buffer with a style
//! derived from the clipped values.

use crate::config::EngineConfig;
use crate::flow::publish;
use crate::publish::Publisher;
use crate::scratch::Scratch;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stpgis_algorithms::clip::{ClipTarget, Place};
use stpgis_colormap::{style_for_raster, StyleDescriptor};
use stpgis_core::io::read_geotiff;
use stpgis_core::raster::Raster;
use stpgis_core::Result;
use tracing::info;

/// A stored category raster and the style it was published with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRaster {
    pub file_name: String,
    pub path: PathBuf,
    pub style: StyleDescriptor,
}

/// One published clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedLayer {
    pub file_name: String,
    pub layer_name: String,
}

pub struct CategoryMapper<'a> {
    config: &'a EngineConfig,
    publisher: &'a dyn Publisher,
}

impl<'a> CategoryMapper<'a> {
    pub fn new(config: &'a EngineConfig, publisher: &'a dyn Publisher) -> Self {
        Self { config, publisher }
    }

    /// Clip every category raster to the selected units and publish it
    /// with its stored style.
    pub fn clip_categories_to_units(
        &self,
        categories: &[CategoryRaster],
        place: Place,
        ids: &[i64],
    ) -> Result<Vec<PublishedLayer>> {
        let target = ClipTarget::Units {
            place,
            ids: ids.to_vec(),
        };
        categories
            .iter()
            .map(|category| self.clip_and_publish(category, &target, |_| Ok(category.style.clone())))
            .collect()
    }

    /// Clip every category raster to the buffer around a town and publish
    /// it with a fresh reversed style.
    pub fn clip_categories_to_town(
        &self,
        categories: &[CategoryRaster],
        town_ids: &[i64],
    ) -> Result<Vec<PublishedLayer>> {
        let target = ClipTarget::TownBuffer {
            ids: town_ids.to_vec(),
        };
        categories
            .iter()
            .map(|category| {
                self.clip_and_publish(category, &target, |clipped| {
                    style_for_raster(clipped, self.config.num_classes, self.config.color_ramp, true)
                })
            })
            .collect()
    }

    fn clip_and_publish<F>(
        &self,
        category: &CategoryRaster,
        target: &ClipTarget,
        style: F,
    ) -> Result<PublishedLayer>
    where
        F: FnOnce(&Raster<f64>) -> Result<StyleDescriptor>,
    {
        self.config.ensure_output_dir()?;
        let mut scratch = Scratch::new();
        let clipped_path = scratch.track(self.config.clipper().clip_file(&category.path, target)?);

        let clipped: Raster<f64> = read_geotiff(&clipped_path, None)?;
        let style = style(&clipped)?;
        let layer_name = publish(self.publisher, &clipped_path, &style)?;
        info!("Category {} -> layer {}", category.file_name, layer_name);

        Ok(PublishedLayer {
            file_name: category.file_name.clone(),
            layer_name,
        })
    }
}
