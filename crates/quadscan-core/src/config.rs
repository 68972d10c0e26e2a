// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor configuration.

use serde::{Deserialize, Serialize};

use crate::error::{QuadscanError, Result};

/// Default FAST threshold, matching the usual feature-tracking setting.
pub const DEFAULT_FAST_THRESHOLD: u8 = 30;

/// Which point detector feeds the corner classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum CornerDetectionMethod {
    /// Leave the handles on the image's bounding box.
    None,
    /// FAST segment test with 9 contiguous pixels.
    Fast9 { threshold: u8 },
    /// FAST segment test with 12 contiguous pixels.
    Fast12 { threshold: u8 },
}

impl Default for CornerDetectionMethod {
    fn default() -> Self {
        Self::Fast9 {
            threshold: DEFAULT_FAST_THRESHOLD,
        }
    }
}

/// Resampling used by the perspective dewarp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

/// Colour written where the dewarp samples outside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    #[default]
    TransparentBlack,
    OpaqueBlack,
}

impl FillMode {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Self::TransparentBlack => [0, 0, 0, 0],
            Self::OpaqueBlack => [0, 0, 0, 255],
        }
    }
}

/// Editor settings. Every field has a default so partial JSON files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Point detector used when placing handles.
    pub corner_detection: CornerDetectionMethod,
    /// Run the local colour-variance plausibility test on candidate points.
    pub filter_points: bool,
    /// Minimum average corner colour distance for a plausible page corner.
    pub plausibility_threshold: u32,
    /// Display density multiplier applied to `handle_radius` and `padding`.
    pub pixel_ratio: f64,
    /// Handle hit radius in unscaled display units.
    pub handle_radius: f64,
    /// Minimum free space between the image and the surface edges.
    pub padding: f64,
    /// Dewarp resampling quality.
    pub interpolation: Interpolation,
    /// Out-of-bounds colour for the dewarp.
    pub fill: FillMode,
    /// Force convolution output alpha to 255.
    pub opaque_convolution: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            corner_detection: CornerDetectionMethod::default(),
            filter_points: true,
            plausibility_threshold: 75,
            pixel_ratio: 1.0,
            handle_radius: 15.0,
            padding: 30.0,
            interpolation: Interpolation::Bilinear,
            fill: FillMode::TransparentBlack,
            opaque_convolution: false,
        }
    }
}

impl EditorConfig {
    /// Handle hit radius in display-surface units.
    pub fn hit_radius(&self) -> f64 {
        self.handle_radius * self.pixel_ratio
    }

    /// Padding in display-surface units.
    pub fn scaled_padding(&self) -> f64 {
        self.padding * self.pixel_ratio
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(QuadscanError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )))
            }
        };
        positive("pixel_ratio", self.pixel_ratio)?;
        positive("handle_radius", self.handle_radius)?;
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(QuadscanError::InvalidConfig(format!(
                "padding must be zero or positive, got {}",
                self.padding
            )));
        }
        Ok(())
    }
}
