//! Map-server hand-off.
//!
//! The engine never talks to a map server itself. Flows receive a
//! `&dyn Publisher` and give it the finished raster plus its style.

use std::path::{Path, PathBuf};
use stpgis_colormap::StyleDescriptor;
use stpgis_core::io::{copy_atomically, write_text};
use stpgis_core::{Error, Result};
use tracing::info;

/// Receives finished rasters and their styles.
pub trait Publisher {
    /// Register `raster` as a layer and return the layer name.
    fn publish_raster(&self, raster: &Path) -> Result<String>;

    /// Attach `style` to a published layer.
    fn apply_style(&self, layer: &str, style: &StyleDescriptor) -> Result<()>;
}

/// Publishes into a directory: `<layer>.tif`, `<layer>.sld` and
/// `<layer>.style.json`.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Publisher for DirectoryPublisher {
    fn publish_raster(&self, raster: &Path) -> Result<String> {
        let layer = raster
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Publish(format!("no layer name in {}", raster.display())))?
            .to_string();

        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(format!("{}.tif", layer));
        let same_file = target.exists()
            && std::fs::canonicalize(&target).ok() == std::fs::canonicalize(raster).ok();
        if !same_file {
            copy_atomically(raster, &target).map_err(|e| {
                Error::Publish(format!("cannot copy {}: {}", raster.display(), e))
            })?;
        }
        info!("Published layer {} -> {}", layer, target.display());
        Ok(layer)
    }

    fn apply_style(&self, layer: &str, style: &StyleDescriptor) -> Result<()> {
        if !self.dir.join(format!("{}.tif", layer)).exists() {
            return Err(Error::Publish(format!("layer {} is not published", layer)));
        }
        write_text(self.dir.join(format!("{}.sld", layer)), &style.to_sld())?;
        write_text(self.dir.join(format!("{}.style.json", layer)), &style.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stpgis_colormap::ColorRamp;

    #[test]
    fn test_publish_then_style() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let raster = src.path().join("unit_clip_ab12.tif");
        std::fs::write(&raster, b"II*\0").unwrap();

        let publisher = DirectoryPublisher::new(out.path().join("layers"));
        let layer = publisher.publish_raster(&raster).unwrap();
        assert_eq!(layer, "unit_clip_ab12");

        let style = StyleDescriptor::new(0.0, 1.0, 5, ColorRamp::OrangeToGreen, true);
        publisher.apply_style(&layer, &style).unwrap();
        let sld = std::fs::read_to_string(publisher.dir().join("unit_clip_ab12.sld")).unwrap();
        assert_eq!(sld, style.to_sld());
        assert!(publisher.dir().join("unit_clip_ab12.style.json").exists());
    }

    #[test]
    fn test_style_needs_layer() {
        let out = tempfile::tempdir().unwrap();
        let publisher = DirectoryPublisher::new(out.path());
        let style = StyleDescriptor::new(0.0, 1.0, 5, ColorRamp::OrangeToGreen, false);
        assert!(matches!(
            publisher.apply_style("ghost", &style),
            Err(Error::Publish(_))
        ));
    }

    #[test]
    fn test_missing_raster() {
        let out = tempfile::tempdir().unwrap();
        let publisher = DirectoryPublisher::new(out.path().join("layers"));
        assert!(matches!(
            publisher.publish_raster(&out.path().join("none.tif")),
            Err(Error::Publish(_))
        ));
        // nothing half-copied for apply_style to pick up
        assert!(!publisher.dir().join("none.tif").exists());
        assert_eq!(std::fs::read_dir(publisher.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_republish_replaces_layer() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let raster = src.path().join("priority_map.tif");
        let publisher = DirectoryPublisher::new(out.path());

        std::fs::write(&raster, b"first").unwrap();
        publisher.publish_raster(&raster).unwrap();
        std::fs::write(&raster, b"second").unwrap();
        publisher.publish_raster(&raster).unwrap();

        assert_eq!(std::fs::read(out.path().join("priority_map.tif")).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
    }
}
