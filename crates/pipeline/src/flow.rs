//! Stages shared by the priority and suitability flows.

use crate::config::EngineConfig;
use crate::publish::Publisher;
use crate::scratch::Scratch;
use crate::WeightedLayer;
use std::path::{Path, PathBuf};
use stpgis_algorithms::clip::ClipTarget;
use stpgis_algorithms::overlay::{apply_mask, normalize, weighted_overlay, ConstraintSet, WeightSet};
use stpgis_colormap::StyleDescriptor;
use stpgis_core::io::{unique_suffix, write_geotiff};
use stpgis_core::raster::Raster;
use stpgis_core::Result;
use stpgis_parallel::ParallelStrategy;
use tracing::info;

pub(crate) fn scratch_for(config: &EngineConfig) -> Scratch {
    if config.keep_intermediates {
        Scratch::keeping()
    } else {
        Scratch::new()
    }
}

/// Write `raster` as `<stem>_<hex>_map.tif` in the output directory.
fn write_stage(config: &EngineConfig, stem: &str, raster: &Raster<f64>) -> Result<PathBuf> {
    let path = config
        .output_dir
        .join(format!("{}_{}_map.tif", stem, unique_suffix()));
    write_geotiff(raster, &path, None)?;
    Ok(path)
}

/// Align, normalize, weight and constrain the criterion layers.
pub(crate) fn constrained_overlay(
    config: &EngineConfig,
    layers: &[WeightedLayer],
    constraints: &[PathBuf],
    scratch: &mut Scratch,
) -> Result<Raster<f64>> {
    let weights: WeightSet = layers
        .iter()
        .map(|l| (l.path.display().to_string(), l.weight))
        .collect();
    let paths: Vec<&Path> = layers.iter().map(|l| l.path.as_path()).collect();

    let aligner = config.aligner();
    let stack = aligner.align_paths(&paths)?;

    let normalized = config.processing.try_map_ordered(&stack.layers, normalize)?;
    let mut overlay = weighted_overlay(&normalized, &weights.weights())?;
    stack.profile.apply(&mut overlay)?;
    scratch.track(write_stage(config, "overlay", &overlay)?);

    let constraints: ConstraintSet = constraints.iter().cloned().collect();
    let mask = constraints.build_mask(&aligner, &stack.grid)?;
    let constrained = apply_mask(&overlay, &mask)?;
    info!(
        "{} of {} cells allowed by {} constraint layers",
        constrained.allowed_cells,
        mask.len(),
        constraints.len()
    );
    scratch.track(write_stage(config, "constraint", &constrained.raster)?);

    Ok(constrained.raster)
}

/// Clip to the configured basin and persist under `<stem>_<hex>_map.tif`.
pub(crate) fn basin_clip(
    config: &EngineConfig,
    raster: &Raster<f64>,
    stem: &str,
    scratch: &mut Scratch,
) -> Result<(Raster<f64>, PathBuf)> {
    let clipped = config.clipper().clip_raster(
        raster,
        &ClipTarget::Basin {
            path: config.basin_path.clone(),
        },
    )?;
    let path = scratch.track(write_stage(config, stem, &clipped)?);
    info!("Basin clip: {}x{} -> {}", clipped.cols(), clipped.rows(), path.display());
    Ok((clipped, path))
}

/// Clip the basin raster file to `target`; with no target the basin clip
/// itself is the final raster and leaves the scratch list.
pub(crate) fn final_clip(
    config: &EngineConfig,
    basin_path: &Path,
    target: Option<&ClipTarget>,
    scratch: &mut Scratch,
) -> Result<PathBuf> {
    match target {
        Some(target) => config.clipper().clip_file(basin_path, target),
        None => {
            scratch.release(basin_path);
            Ok(basin_path.to_path_buf())
        }
    }
}

pub(crate) fn publish(
    publisher: &dyn Publisher,
    raster: &Path,
    style: &StyleDescriptor,
) -> Result<String> {
    let layer = publisher.publish_raster(raster)?;
    publisher.apply_style(&layer, style)?;
    info!("Layer {} published with {}-class style", layer, style.num_classes());
    Ok(layer)
}
