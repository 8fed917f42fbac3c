//! Colour ramps and anchor interpolation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stpgis_core::Error;

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`, upper case
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let hex = s.strip_prefix('#').unwrap_or(&s);
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| serde::de::Error::custom(format!("invalid colour '{}'", s)))
        };
        if hex.len() != 6 {
            return Err(serde::de::Error::custom(format!("invalid colour '{}'", s)));
        }
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Named colour ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRamp {
    /// Blue -> White -> Red
    BlueToRed,
    /// Red -> Orange -> Yellow -> Green -> Deep green
    #[default]
    OrangeToGreen,
    /// Green -> Red, no blue component
    GreenToRed,
    Viridis,
    /// Dark blue -> Green -> Yellow -> Brown -> White
    Terrain,
    /// Red -> Yellow -> Blue
    Spectral,
}

impl ColorRamp {
    pub const ALL: &[ColorRamp] = &[
        Self::BlueToRed,
        Self::OrangeToGreen,
        Self::GreenToRed,
        Self::Viridis,
        Self::Terrain,
        Self::Spectral,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::BlueToRed => "blue_to_red",
            Self::OrangeToGreen => "orange_to_green",
            Self::GreenToRed => "green_to_red",
            Self::Viridis => "viridis",
            Self::Terrain => "terrain",
            Self::Spectral => "spectral",
        }
    }

    /// `n` colours sampled along the ramp, low class first.
    pub fn colors(&self, n: usize) -> Vec<Rgb> {
        (0..n)
            .map(|i| {
                let t = i as f64 / n.saturating_sub(1).max(1) as f64;
                self.evaluate(t)
            })
            .collect()
    }

    /// Colour at position `t` in [0, 1]. Channels are truncated, not rounded.
    pub fn evaluate(&self, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::BlueToRed => {
                if t < 0.5 {
                    let v = channel(t * 2.0 * 255.0);
                    Rgb::new(v, v, 255)
                } else {
                    let v = channel(255.0 - (t - 0.5) * 2.0 * 255.0);
                    Rgb::new(255, v, v)
                }
            }
            Self::GreenToRed => Rgb::new(channel(t * 255.0), channel(255.0 * (1.0 - t)), 0),
            Self::OrangeToGreen => anchored(ORANGE_TO_GREEN, t),
            Self::Viridis => anchored(VIRIDIS, t),
            Self::Terrain => anchored(TERRAIN, t),
            Self::Spectral => anchored(SPECTRAL, t),
        }
    }
}

impl fmt::Display for ColorRamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorRamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "blue_to_red" => Ok(Self::BlueToRed),
            "orange_to_green" => Ok(Self::OrangeToGreen),
            "green_to_red" | "greentored" => Ok(Self::GreenToRed),
            "viridis" => Ok(Self::Viridis),
            "terrain" => Ok(Self::Terrain),
            "spectral" => Ok(Self::Spectral),
            _ => Err(Error::invalid_parameter(
                "color_ramp",
                s,
                "expected blue_to_red, orange_to_green, green_to_red, viridis, terrain or spectral",
            )),
        }
    }
}

// ─── Anchor tables ─────────────────────────────────────────────────────

const ORANGE_TO_GREEN: &[Rgb] = &[
    Rgb::new(204, 0, 0),   // red
    Rgb::new(255, 128, 0), // orange
    Rgb::new(255, 255, 0), // yellow
    Rgb::new(50, 205, 50), // parrot green
    Rgb::new(0, 100, 0),   // deep green
];

const VIRIDIS: &[Rgb] = &[
    Rgb::new(68, 1, 84),
    Rgb::new(59, 82, 139),
    Rgb::new(33, 144, 140),
    Rgb::new(93, 201, 99),
    Rgb::new(253, 231, 37),
];

const TERRAIN: &[Rgb] = &[
    Rgb::new(0, 0, 92),
    Rgb::new(0, 128, 255),
    Rgb::new(0, 255, 128),
    Rgb::new(255, 255, 0),
    Rgb::new(128, 64, 0),
    Rgb::new(255, 255, 255),
];

const SPECTRAL: &[Rgb] = &[
    Rgb::new(213, 62, 79),
    Rgb::new(253, 174, 97),
    Rgb::new(254, 224, 139),
    Rgb::new(230, 245, 152),
    Rgb::new(171, 221, 164),
    Rgb::new(102, 194, 165),
    Rgb::new(50, 136, 189),
];

// ─── Interpolation ─────────────────────────────────────────────────────

fn channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    channel(a as f64 * (1.0 - t) + b as f64 * t)
}

/// Piecewise-linear interpolation between equally spaced anchors.
fn anchored(anchors: &[Rgb], t: f64) -> Rgb {
    let segments = anchors.len() - 1;
    let pos = t * segments as f64;
    let idx = (pos as usize).min(segments - 1);
    let frac = pos - idx as f64;
    let (a, b) = (anchors[idx], anchors[idx + 1]);
    Rgb::new(lerp(a.r, b.r, frac), lerp(a.g, b.g, frac), lerp(a.b, b.b, frac))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(colors: &[Rgb]) -> Vec<String> {
        colors.iter().map(|c| c.to_hex()).collect()
    }

    #[test]
    fn orange_to_green_five_classes() {
        assert_eq!(
            hex(&ColorRamp::OrangeToGreen.colors(5)),
            ["#CC0000", "#FF8000", "#FFFF00", "#32CD32", "#006400"]
        );
    }

    #[test]
    fn blue_to_red_passes_through_white() {
        let c = ColorRamp::BlueToRed.colors(5);
        assert_eq!(c[0], Rgb::new(0, 0, 255));
        assert_eq!(c[2], Rgb::new(255, 255, 255));
        assert_eq!(c[4], Rgb::new(255, 0, 0));
        // t = 0.25 truncates 127.5
        assert_eq!(c[1], Rgb::new(127, 127, 255));
    }

    #[test]
    fn green_to_red_endpoints() {
        let c = ColorRamp::GreenToRed.colors(3);
        assert_eq!(c[0], Rgb::new(0, 255, 0));
        assert_eq!(c[2], Rgb::new(255, 0, 0));
    }

    #[test]
    fn anchored_ramps_hit_their_ends() {
        assert_eq!(ColorRamp::Viridis.evaluate(0.0), VIRIDIS[0]);
        assert_eq!(ColorRamp::Viridis.evaluate(1.0), VIRIDIS[4]);
        assert_eq!(ColorRamp::Terrain.evaluate(1.0), Rgb::new(255, 255, 255));
        assert_eq!(ColorRamp::Spectral.evaluate(0.0), Rgb::new(213, 62, 79));
    }

    #[test]
    fn single_class_takes_ramp_start() {
        for &ramp in ColorRamp::ALL {
            assert_eq!(ramp.colors(1), vec![ramp.evaluate(0.0)]);
        }
        assert!(ColorRamp::Terrain.colors(0).is_empty());
    }

    #[test]
    fn parse_names() {
        assert_eq!("orange-to-green".parse::<ColorRamp>().unwrap(), ColorRamp::OrangeToGreen);
        assert_eq!("greenTOred".parse::<ColorRamp>().unwrap(), ColorRamp::GreenToRed);
        assert_eq!("Viridis".parse::<ColorRamp>().unwrap(), ColorRamp::Viridis);
        assert!("rainbow".parse::<ColorRamp>().is_err());
        for &ramp in ColorRamp::ALL {
            assert_eq!(ramp.name().parse::<ColorRamp>().unwrap(), ramp);
        }
    }

    #[test]
    fn rgb_serde_as_hex() {
        let json = serde_json::to_string(&Rgb::new(50, 205, 50)).unwrap();
        assert_eq!(json, "\"#32CD32\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(50, 205, 50));
        assert!(serde_json::from_str::<Rgb>("\"#12\"").is_err());
    }
}
