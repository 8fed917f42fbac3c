//! Class-break styles for published rasters.
//!
//! A style is an ordered list of `(lower edge, colour, label)` entries over
//! equal-width intervals of the raster's valid range. It renders to an SLD
//! 1.0 `ColorMap` for map servers and serialises to JSON.

use crate::scheme::{ColorRamp, Rgb};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use stpgis_core::io::{unique_output_path, write_text};
use stpgis_core::raster::{Raster, RasterElement};
use stpgis_core::{Error, Result};
use tracing::{debug, info};

/// Labels of the first five classes, low to high
pub const CLASS_LEVEL_LABELS: [&str; 5] = ["Very low", "Low", "Moderate", "High", "Very high"];

/// Label of class `index` (0-based); classes past the fifth are `class_<n>`.
pub fn class_label(index: usize) -> String {
    CLASS_LEVEL_LABELS
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("class_{}", index + 1))
}

/// Interval edges for `num_classes` equal-width classes.
///
/// `max` is raised to at least 1.0. When `min == max` the result is
/// `num_classes` copies of `min`; otherwise `num_classes + 1` evenly spaced
/// edges from `min` to `max`.
pub fn class_edges(min: f64, max: f64, num_classes: usize) -> Vec<f64> {
    let max = max.max(1.0);
    if min == max {
        return vec![min; num_classes];
    }
    let step = (max - min) / num_classes as f64;
    (0..=num_classes)
        .map(|i| if i == num_classes { max } else { min + step * i as f64 })
        .collect()
}

/// One colour-map entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleEntry {
    /// Lower edge of the class
    pub quantity: f64,
    pub color: Rgb,
    pub label: String,
}

/// Ordered class entries plus the ramp that coloured them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub ramp: ColorRamp,
    pub reversed: bool,
    pub entries: Vec<StyleEntry>,
}

impl StyleDescriptor {
    /// Style for values spanning `[min, max]`.
    pub fn new(min: f64, max: f64, num_classes: usize, ramp: ColorRamp, reverse: bool) -> Self {
        let edges = class_edges(min, max, num_classes);
        let mut colors = ramp.colors(num_classes);
        if reverse {
            colors.reverse();
        }

        let entries = edges
            .iter()
            .zip(colors)
            .enumerate()
            .map(|(i, (&quantity, color))| StyleEntry {
                quantity,
                color,
                label: class_label(i),
            })
            .collect();

        Self {
            ramp,
            reversed: reverse,
            entries,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.entries.len()
    }

    /// SLD 1.0 document with a single ramp `ColorMap`.
    pub fn to_sld(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(
            "<sld:StyledLayerDescriptor xmlns:sld=\"http://www.opengis.net/sld\" \
             xmlns=\"http://www.opengis.net/sld\" xmlns:gml=\"http://www.opengis.net/gml\" \
             xmlns:ogc=\"http://www.opengis.net/ogc\" version=\"1.0.0\">\n",
        );
        xml.push_str("  <sld:NamedLayer>\n");
        xml.push_str("    <sld:Name>raster</sld:Name>\n");
        xml.push_str("    <sld:UserStyle>\n");
        xml.push_str("      <sld:Name>raster</sld:Name>\n");
        let _ = writeln!(
            xml,
            "      <sld:Title>{}-Class Raster Style with Ranges</sld:Title>",
            self.num_classes()
        );
        xml.push_str(
            "      <sld:Abstract>SLD with explicit value ranges for raster styling</sld:Abstract>\n",
        );
        xml.push_str("      <sld:FeatureTypeStyle>\n");
        xml.push_str("        <sld:Rule>\n");
        xml.push_str("          <sld:RasterSymbolizer>\n");
        xml.push_str("            <sld:ColorMap type=\"ramp\">\n");
        for entry in &self.entries {
            let _ = writeln!(
                xml,
                "              <sld:ColorMapEntry color=\"{}\" quantity=\"{}\" label=\"{}\"/>",
                entry.color,
                entry.quantity,
                escape_xml(&entry.label)
            );
        }
        xml.push_str("            </sld:ColorMap>\n");
        xml.push_str("          </sld:RasterSymbolizer>\n");
        xml.push_str("        </sld:Rule>\n");
        xml.push_str("      </sld:FeatureTypeStyle>\n");
        xml.push_str("    </sld:UserStyle>\n");
        xml.push_str("  </sld:NamedLayer>\n");
        xml.push_str("</sld:StyledLayerDescriptor>\n");
        xml
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Style over the valid range of `raster`.
pub fn style_for_raster<T: RasterElement>(
    raster: &Raster<T>,
    num_classes: usize,
    ramp: ColorRamp,
    reverse: bool,
) -> Result<StyleDescriptor> {
    let (min, max) = raster
        .valid_range()
        .ok_or_else(|| Error::EmptyResult("raster contains no valid data".into()))?;
    debug!("style range [{}, {}] over {} classes", min, max, num_classes);
    Ok(StyleDescriptor::new(min, max, num_classes, ramp, reverse))
}

/// Write the style as `style_<hex>.sld` under `dir`.
pub fn write_sld(style: &StyleDescriptor, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = unique_output_path(dir, "style", "sld");
    write_text(&path, &style.to_sld())?;
    info!("SLD written: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_edges_linear() {
        let edges = class_edges(0.0, 100.0, 5);
        assert_eq!(edges.len(), 6);
        for (e, expected) in edges.iter().zip([0.0, 20.0, 40.0, 60.0, 80.0, 100.0]) {
            assert_relative_eq!(*e, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_edges_max_forced_to_one() {
        let edges = class_edges(0.0, 0.5, 5);
        assert_relative_eq!(*edges.last().unwrap(), 1.0);
        assert_relative_eq!(edges[1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_edges_degenerate() {
        assert_eq!(class_edges(3.0, 3.0, 5), vec![3.0; 5]);
        // min == 1.0 after forcing max
        assert_eq!(class_edges(1.0, 0.2, 4), vec![1.0; 4]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(class_label(0), "Very low");
        assert_eq!(class_label(4), "Very high");
        assert_eq!(class_label(6), "class_7");
    }

    #[test]
    fn test_reversed_orange_to_green() {
        let style = StyleDescriptor::new(0.0, 10.0, 5, ColorRamp::OrangeToGreen, true);
        assert_eq!(style.num_classes(), 5);
        assert_eq!(style.entries[0].color.to_hex(), "#006400");
        assert_eq!(style.entries[4].color.to_hex(), "#CC0000");
        assert_eq!(style.entries[0].label, "Very low");
        assert_relative_eq!(style.entries[3].quantity, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sld_entries() {
        let style = StyleDescriptor::new(0.0, 100.0, 5, ColorRamp::BlueToRed, false);
        let sld = style.to_sld();
        assert!(sld.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(sld.matches("<sld:ColorMapEntry").count(), 5);
        assert!(sld.contains(
            "<sld:ColorMapEntry color=\"#0000FF\" quantity=\"0\" label=\"Very low\"/>"
        ));
        assert!(sld.contains("quantity=\"80\" label=\"Very high\""));
        assert!(sld.contains("<sld:Title>5-Class Raster Style with Ranges</sld:Title>"));
    }

    #[test]
    fn test_json_roundtrip_fields() {
        let style = StyleDescriptor::new(0.0, 1.0, 5, ColorRamp::Viridis, false);
        let json = style.to_json().unwrap();
        assert!(json.contains("\"ramp\": \"viridis\""));
        let back: StyleDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, style);
    }

    #[test]
    fn test_style_for_raster() {
        let mut r: Raster<f64> = Raster::from_vec(vec![2.0, 4.0, f64::NAN, 12.0], 2, 2).unwrap();
        r.set_nodata(Some(f64::NAN));
        let style = style_for_raster(&r, 5, ColorRamp::OrangeToGreen, false).unwrap();
        assert_relative_eq!(style.entries[0].quantity, 2.0);
        assert_relative_eq!(style.entries[1].quantity, 4.0, epsilon = 1e-12);

        let empty: Raster<f64> = Raster::filled(2, 2, f64::NAN);
        assert!(matches!(
            style_for_raster(&empty, 5, ColorRamp::OrangeToGreen, false),
            Err(Error::EmptyResult(_))
        ));
    }

    #[test]
    fn test_write_sld_unique() {
        let dir = tempfile::tempdir().unwrap();
        let style = StyleDescriptor::new(0.0, 1.0, 5, ColorRamp::OrangeToGreen, true);
        let a = write_sld(&style, dir.path()).unwrap();
        let b = write_sld(&style, dir.path()).unwrap();
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("style_") && name.ends_with(".sld"));
        assert_eq!(std::fs::read_to_string(&a).unwrap(), style.to_sld());
    }
}
