//! Tunable thresholds of the board detector.
//!
//! Every record uses `#[serde(default)]`, so a config file only has to name the values it
//! changes. The defaults are tuned for the blue-blocker, dark-badge style of board.

use std::path::Path;

use anyhow::{bail, Context};
use image::Rgba;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    pub sizes: SizeConfig,
    pub sampling: SamplingConfig,
    pub palette: PaletteConfig,
    pub ratios: RatioThresholds,
}

impl DetectConfig {
    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        let config: DetectConfig = serde_json::from_str(json).context("invalid detector config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.sizes.candidates.is_empty() {
            bail!("sizes.candidates must not be empty");
        }
        if self.sizes.candidates.contains(&0) {
            bail!("sizes.candidates must all be positive");
        }
        if self.sizes.fallback == 0 {
            bail!("sizes.fallback must be positive");
        }
        if self.sampling.stride_divisor == 0 {
            bail!("sampling.stride_divisor must be positive");
        }
        Ok(())
    }
}

/// Board size estimation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    /// Square board sizes to try, smallest first
    pub candidates: Vec<usize>,
    /// A candidate is accepted when both cell dimensions are strictly larger than this
    pub min_cell_pixels: usize,
    /// Size used when no candidate is accepted
    pub fallback: usize,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            candidates: vec![3, 4, 5, 6, 7],
            min_cell_pixels: 10,
            fallback: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// The sampling stride is `max(1, cell_width / stride_divisor)` in both directions
    pub stride_divisor: usize,
    /// Pixels with alpha below this are skipped and not counted
    pub alpha_cutoff: u8,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            stride_divisor: 20,
            alpha_cutoff: 128,
        }
    }
}

/// The color buckets a sampled pixel can fall into
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBucket {
    White,
    VeryDark,
    Dark,
    Blue,
    Green,
    Yellow,
    Gray,
}

/// Channel thresholds for the color buckets. Buckets are tested in the order of the
/// fields below and the first match wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// All channels above this
    pub white_min: u8,
    /// All channels below this
    pub very_dark_max: u8,
    /// All channels below this
    pub dark_max: u8,
    /// Blue is the largest channel and above this
    pub blue_min: u8,
    /// Blue exceeds red by more than this
    pub blue_margin: u8,
    /// Green is the largest channel and above this
    pub green_min: u8,
    /// Red and green above this
    pub yellow_min: u8,
    /// Blue below this
    pub yellow_blue_max: u8,
    /// Red plus green above this
    pub yellow_sum_min: u16,
    /// Pairwise channel distance of red/green and green/blue below this
    pub gray_tolerance: u8,
    /// Red above this
    pub gray_min: u8,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            white_min: 200,
            very_dark_max: 30,
            dark_max: 130,
            blue_min: 100,
            blue_margin: 30,
            green_min: 100,
            yellow_min: 130,
            yellow_blue_max: 120,
            yellow_sum_min: 250,
            gray_tolerance: 25,
            gray_min: 120,
        }
    }
}

impl PaletteConfig {
    /// The bucket of an opaque pixel, or None when it fits no bucket
    pub fn bucket_of(&self, pixel: Rgba<u8>) -> Option<ColorBucket> {
        let [r, g, b, _] = pixel.0;
        let min = r.min(g).min(b);
        let max = r.max(g).max(b);

        if min > self.white_min {
            Some(ColorBucket::White)
        } else if max < self.very_dark_max {
            Some(ColorBucket::VeryDark)
        } else if max < self.dark_max {
            Some(ColorBucket::Dark)
        } else if b > r && b > g && b > self.blue_min && b - r > self.blue_margin {
            Some(ColorBucket::Blue)
        } else if g > r && g > b && g > self.green_min {
            Some(ColorBucket::Green)
        } else if r > self.yellow_min
            && g > self.yellow_min
            && b < self.yellow_blue_max
            && r as u16 + g as u16 > self.yellow_sum_min
        {
            Some(ColorBucket::Yellow)
        } else if r.abs_diff(g) < self.gray_tolerance
            && g.abs_diff(b) < self.gray_tolerance
            && r > self.gray_min
        {
            Some(ColorBucket::Gray)
        } else {
            None
        }
    }
}

/// Bucket ratio thresholds of the cell classifier, all compared with a strict `>`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioThresholds {
    /// Blue share that marks a blocked cell
    pub blocked_blue: f64,
    /// Near-black share of a dark badge on a light cell, together with `badge_white`
    pub badge_very_dark: f64,
    /// Near-white share of a dark badge on a light cell, together with `badge_very_dark`
    pub badge_white: f64,
    /// Near-black share that alone marks a solid badge
    pub solid_very_dark: f64,
    /// Moderately dark share of printed digits
    pub text_dark: f64,
    /// Near-black share of digits on a gray cell, together with `speckle_gray`
    pub speckle_very_dark: f64,
    /// Gray share of digits on a gray cell, together with `speckle_very_dark`
    pub speckle_gray: f64,
    /// Yellow share of a highlighted waypoint
    pub yellow_fill: f64,
}

impl Default for RatioThresholds {
    fn default() -> Self {
        Self {
            blocked_blue: 0.25,
            badge_very_dark: 0.15,
            badge_white: 0.05,
            solid_very_dark: 0.20,
            text_dark: 0.15,
            speckle_very_dark: 0.05,
            speckle_gray: 0.30,
            yellow_fill: 0.15,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_override() {
        let config =
            DetectConfig::from_json(r#"{ "sizes": { "candidates": [5] }, "ratios": { "blocked_blue": 0.5 } }"#)
                .unwrap();

        assert_eq!(config.sizes.candidates, vec![5]);
        assert_eq!(config.sizes.fallback, 5);
        assert_eq!(config.ratios.blocked_blue, 0.5);
        assert_eq!(config.ratios.yellow_fill, 0.15);
        assert_eq!(config.palette, PaletteConfig::default());
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(DetectConfig::from_json("{}").unwrap(), DetectConfig::default());
    }

    #[test]
    fn test_validation() {
        assert!(DetectConfig::from_json(r#"{ "sizes": { "candidates": [] } }"#).is_err());
        assert!(DetectConfig::from_json(r#"{ "sizes": { "candidates": [3, 0] } }"#).is_err());
        assert!(DetectConfig::from_json(r#"{ "sizes": { "fallback": 0 } }"#).is_err());
        assert!(DetectConfig::from_json(r#"{ "sampling": { "stride_divisor": 0 } }"#).is_err());
        assert!(DetectConfig::from_json("not json").is_err());
        assert!(DetectConfig::load("/nonexistent/zipsolve.json").is_err());
    }

    #[test]
    fn test_buckets() {
        let palette = PaletteConfig::default();
        let bucket = |r, g, b| palette.bucket_of(Rgba([r, g, b, 255]));

        assert_eq!(bucket(255, 255, 255), Some(ColorBucket::White));
        assert_eq!(bucket(0, 0, 0), Some(ColorBucket::VeryDark));
        assert_eq!(bucket(29, 29, 29), Some(ColorBucket::VeryDark));
        assert_eq!(bucket(30, 30, 30), Some(ColorBucket::Dark));
        assert_eq!(bucket(100, 120, 129), Some(ColorBucket::Dark));
        assert_eq!(bucket(30, 120, 200), Some(ColorBucket::Blue));
        // blue-ish but not far enough from red
        assert_eq!(bucket(150, 145, 165), Some(ColorBucket::Gray));
        assert_eq!(bucket(50, 200, 50), Some(ColorBucket::Green));
        assert_eq!(bucket(250, 200, 50), Some(ColorBucket::Yellow));
        assert_eq!(bucket(180, 180, 180), Some(ColorBucket::Gray));
        assert_eq!(bucket(200, 60, 60), None);
    }

    #[test]
    fn test_bucket_order_prefers_white() {
        // near white is also gray, white is tested first
        let palette = PaletteConfig::default();
        assert_eq!(
            palette.bucket_of(Rgba([210, 210, 210, 255])),
            Some(ColorBucket::White)
        );
    }
}
