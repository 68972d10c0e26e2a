// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-enhance estimators — measure brightness, contrast, saturation and
// sharpness of an image and derive filter parameters from them.

use image::RgbaImage;
use quadscan_core::color::average_color;
use quadscan_core::{ColorSample, FilterState};
use tracing::{debug, instrument};

/// Stride between scanned rows and columns in the sharpness estimate.
const SHARPNESS_GRID: i64 = 10;

/// Mean over all pixels of `floor((r + g + b) / 3)`, floored. Zero for an
/// empty image.
pub fn estimate_brightness(image: &RgbaImage) -> u32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0;
    }
    let total: u64 = image
        .pixels()
        .map(|px| (px.0[0] as u64 + px.0[1] as u64 + px.0[2] as u64) / 3)
        .sum();
    (total / count) as u32
}

/// sRGB relative luminance of the image's average colour, in `[0, 1]`.
pub fn estimate_contrast(image: &RgbaImage) -> f64 {
    average_color(image.as_raw())
        .map(|avg| avg.relative_luminance())
        .unwrap_or(0.0)
}

/// `(avg_b - avg_r) / avg_b` over the average colour. Zero when the average
/// blue channel is zero.
pub fn estimate_saturation(image: &RgbaImage) -> f64 {
    match average_color(image.as_raw()) {
        Some(avg) if avg.b > 0 => (avg.b as f64 - avg.r as f64) / avg.b as f64,
        _ => 0.0,
    }
}

/// Sharpness score in percent.
///
/// Scans every tenth column (top to bottom) and every tenth row (left to
/// right), keeping the largest luma step between neighbouring pixels. The
/// step is then related to the luma range of the 9x9 block around it.
pub fn estimate_sharpness(image: &RgbaImage) -> f64 {
    let (w, h) = (image.width() as i64, image.height() as i64);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let luma = |x: i64, y: i64| -> i32 {
        let x = x.clamp(0, w - 1) as u32;
        let y = y.clamp(0, h - 1) as u32;
        ColorSample::from_rgba(image.get_pixel(x, y).0).sharpness_luma()
    };
    let half = SHARPNESS_GRID / 2;

    let mut max_diff = 0;
    let (mut x_max, mut y_max) = (0i64, 0i64);

    let mut x = half;
    while x <= w - half {
        let mut previous = luma(x, half);
        for y in (half + 1)..=(h - half) {
            let v = luma(x, y);
            if (v - previous).abs() > max_diff {
                max_diff = (v - previous).abs();
                (x_max, y_max) = (x, y);
            }
            previous = v;
        }
        x += SHARPNESS_GRID;
    }

    let mut y = half;
    while y <= h - half {
        let mut previous = luma(half, y);
        for x in (half + 1)..=(w - half) {
            let v = luma(x, y);
            if (v - previous).abs() > max_diff {
                max_diff = (v - previous).abs();
                (x_max, y_max) = (x, y);
            }
            previous = v;
        }
        y += SHARPNESS_GRID;
    }

    let (mut max_v, mut min_v) = (0, 255);
    for x in (x_max - 4).max(0)..=(x_max + 4).min(w - 1) {
        for y in (y_max - 4).max(0)..=(y_max + 4).min(h - 1) {
            let v = luma(x, y);
            max_v = max_v.max(v);
            min_v = min_v.min(v);
        }
    }

    let score = (max_diff as f64 / (15 + max_v - min_v) as f64) * 27000.0 / 255.0;
    debug!(max_diff, x_max, y_max, max_v, min_v, score, "Sharpness estimated");
    score
}

/// One-shot estimate used by auto-improve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoEnhance {
    pub brightness: u32,
    pub contrast: f64,
    pub saturation: f64,
}

impl AutoEnhance {
    #[instrument(skip_all, fields(w = image.width(), h = image.height()))]
    pub fn estimate(image: &RgbaImage) -> Self {
        let estimate = Self {
            brightness: estimate_brightness(image),
            contrast: estimate_contrast(image),
            saturation: estimate_saturation(image),
        };
        debug!(?estimate, "Auto-enhance estimate");
        estimate
    }

    /// Fold the estimate into `filters`: brightness is replaced by the excess
    /// over 100 (and left alone otherwise), contrast and saturation are
    /// increased. Sharpness is not touched.
    pub fn apply_to(&self, filters: &mut FilterState) {
        if self.brightness > 100 {
            filters.brightness = (self.brightness - 100) as f64;
        }
        filters.contrast += self.contrast;
        filters.saturation += self.saturation;
    }
}
