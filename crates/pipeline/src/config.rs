//! Engine configuration.
//!
//! Everything here is deployment state rather than request input: the
//! working CRS, the common resolution and where boundary layers live.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stpgis_algorithms::align::GridAligner;
use stpgis_algorithms::clip::BoundaryClipper;
use stpgis_colormap::ColorRamp;
use stpgis_core::io::ensure_exists;
use stpgis_core::{Error, Result, CRS};
use stpgis_parallel::ProcessingMode;

/// Engine configuration, loadable from JSON. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// EPSG code of the projected working CRS
    pub working_crs: u32,
    /// Cell size `(x, y)` in working CRS units
    pub target_resolution: (f64, f64),
    pub output_dir: PathBuf,
    /// Basin outline used for the first clip
    pub basin_path: PathBuf,
    /// Village polygons carrying `ID`, `Name` and `subdis_cod`
    pub villages_path: PathBuf,
    /// Town points carrying `ID` and `class`
    pub town_path: PathBuf,
    /// Drain catchments carrying `Drain_No`
    pub catchment_path: PathBuf,
    pub processing: ProcessingMode,
    pub color_ramp: ColorRamp,
    pub num_classes: usize,
    /// Leave overlay / constraint / basin-clip rasters on disk
    pub keep_intermediates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            working_crs: 32644,
            target_resolution: (30.0, 30.0),
            output_dir: PathBuf::from("output"),
            basin_path: PathBuf::from("data/basin.geojson"),
            villages_path: PathBuf::from("data/villages.geojson"),
            town_path: PathBuf::from("data/towns.geojson"),
            catchment_path: PathBuf::from("data/catchments.geojson"),
            processing: ProcessingMode::default(),
            color_ramp: ColorRamp::OrangeToGreen,
            num_classes: 5,
            keep_intermediates: false,
        }
    }
}

impl EngineConfig {
    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path)?;
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let (rx, ry) = self.target_resolution;
        if !(rx > 0.0 && ry > 0.0) {
            return Err(Error::invalid_parameter(
                "target_resolution",
                format!("{:?}", self.target_resolution),
                "cell sizes must be positive",
            ));
        }
        if self.num_classes == 0 {
            return Err(Error::invalid_parameter("num_classes", 0, "need at least one class"));
        }
        Ok(())
    }

    pub fn crs(&self) -> CRS {
        CRS::from_epsg(self.working_crs)
    }

    pub fn aligner(&self) -> GridAligner {
        GridAligner::new(self.crs(), self.target_resolution).with_mode(self.processing)
    }

    pub fn clipper(&self) -> BoundaryClipper {
        BoundaryClipper::new(
            self.crs(),
            &self.villages_path,
            &self.town_path,
            &self.output_dir,
        )
    }

    /// Create the output directory if needed.
    pub fn ensure_output_dir(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.working_crs, 32644);
        assert_eq!(config.target_resolution, (30.0, 30.0));
        assert_eq!(config.num_classes, 5);
        assert_eq!(config.color_ramp, ColorRamp::OrangeToGreen);
        assert_eq!(config.crs().epsg(), Some(32644));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{ "working_crs": 32643, "processing": "sequential", "color_ramp": "viridis" }"#,
        )
        .unwrap();
        assert_eq!(config.working_crs, 32643);
        assert_eq!(config.processing, ProcessingMode::Sequential);
        assert_eq!(config.color_ramp, ColorRamp::Viridis);
        assert_eq!(config.target_resolution, (30.0, 30.0));
    }

    #[test]
    fn test_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "target_resolution": [0.0, 30.0] }"#).unwrap();
        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            EngineConfig::from_file(dir.path().join("missing.json")),
            Err(Error::InputNotFound { .. })
        ));
    }
}
