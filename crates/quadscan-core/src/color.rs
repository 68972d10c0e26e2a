// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Colour primitives — RGB samples, averaging, colour distance, lightness and
// the two perceptual brightness weightings used by the estimators.

use serde::{Deserialize, Serialize};

/// Rec. 709 luma weights, used by the contrast estimator and the threshold filter.
pub const REC709_WEIGHTS: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// Perceptual brightness weights used by the sharpness estimator.
pub const SHARPNESS_WEIGHTS: [f64; 3] = [0.35, 0.50, 0.15];

/// An RGB triple sampled from a pixel buffer (alpha is ignored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSample {
    pub const BLACK: ColorSample = ColorSample::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Read the RGB part of an RGBA pixel.
    pub fn from_rgba(px: [u8; 4]) -> Self {
        Self::new(px[0], px[1], px[2])
    }

    /// HSL lightness in `[0, 1]`: `(max + min) / 2` over normalised channels.
    pub fn lightness(&self) -> f64 {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;
        (r.max(g).max(b) + r.min(g).min(b)) / 2.0
    }

    /// Rec. 709 weighted luma on the raw 0–255 channel values.
    pub fn luma(&self) -> f64 {
        REC709_WEIGHTS[0] * self.r as f64
            + REC709_WEIGHTS[1] * self.g as f64
            + REC709_WEIGHTS[2] * self.b as f64
    }

    /// Perceptual brightness `floor(0.35r + 0.50g + 0.15b)`.
    pub fn sharpness_luma(&self) -> i32 {
        (SHARPNESS_WEIGHTS[0] * self.r as f64
            + SHARPNESS_WEIGHTS[1] * self.g as f64
            + SHARPNESS_WEIGHTS[2] * self.b as f64)
            .floor() as i32
    }

    /// Relative luminance with sRGB gamma expansion, in `[0, 1]`.
    pub fn relative_luminance(&self) -> f64 {
        let expand = |channel: u8| {
            let v = channel as f64 / 255.0;
            if v <= 0.03928 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).powf(2.4)
            }
        };
        expand(self.r) * REC709_WEIGHTS[0]
            + expand(self.g) * REC709_WEIGHTS[1]
            + expand(self.b) * REC709_WEIGHTS[2]
    }

    /// `#rrggbb` hex code.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for ColorSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({},{},{})", self.to_hex(), self.r, self.g, self.b)
    }
}

/// Euclidean distance in RGB space.
pub fn color_distance(a: &ColorSample, b: &ColorSample) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Average colour of an interleaved RGBA buffer, each channel rounded.
///
/// Returns `None` for an empty buffer.
pub fn average_color(rgba: &[u8]) -> Option<ColorSample> {
    average_of(rgba.chunks_exact(4).map(|px| ColorSample::new(px[0], px[1], px[2])))
}

/// Average of a sequence of samples, each channel rounded.
pub fn average_of(samples: impl IntoIterator<Item = ColorSample>) -> Option<ColorSample> {
    let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);
    for sample in samples {
        r += sample.r as u64;
        g += sample.g as u64;
        b += sample.b as u64;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let mean = |total: u64| (total as f64 / count as f64).round() as u8;
    Some(ColorSample::new(mean(r), mean(g), mean(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_distance_identity_and_symmetry() {
        let a = ColorSample::new(12, 200, 45);
        let b = ColorSample::new(250, 0, 90);
        assert_eq!(color_distance(&a, &a), 0.0);
        assert_eq!(color_distance(&a, &b), color_distance(&b, &a));
        let black = ColorSample::BLACK;
        let white = ColorSample::new(255, 255, 255);
        assert!((color_distance(&black, &white) - 441.6729559300637).abs() < 1e-9);
    }

    #[test]
    fn lightness_of_primaries() {
        assert_eq!(ColorSample::new(255, 0, 0).lightness(), 0.5);
        assert_eq!(ColorSample::new(255, 255, 255).lightness(), 1.0);
        assert_eq!(ColorSample::BLACK.lightness(), 0.0);
    }

    /// The two brightness weightings must not be conflated.
    #[test]
    fn luma_weightings_are_distinct() {
        let green = ColorSample::new(0, 100, 0);
        assert!((green.luma() - 71.52).abs() < 1e-9);
        assert_eq!(green.sharpness_luma(), 50);
    }

    #[test]
    fn relative_luminance_bounds() {
        assert_eq!(ColorSample::BLACK.relative_luminance(), 0.0);
        assert!((ColorSample::new(255, 255, 255).relative_luminance() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hex_code_is_zero_padded() {
        assert_eq!(ColorSample::new(255, 0, 10).to_hex(), "#ff000a");
    }

    #[test]
    fn average_color_rounds_and_handles_empty() {
        let buffer = [10, 20, 30, 255, 11, 21, 31, 0];
        assert_eq!(average_color(&buffer), Some(ColorSample::new(11, 21, 31)));
        assert_eq!(average_color(&[]), None);
    }
}
