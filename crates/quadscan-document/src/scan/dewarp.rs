// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective dewarp — map the quadrilateral enclosed by the four handles onto
// an axis-aligned rectangle and resample the source image through the inverse
// projective transform.

use image::{Rgba, RgbaImage};
use quadscan_core::config::{EditorConfig, FillMode, Interpolation};
use quadscan_core::error::{QuadscanError, Result};
use quadscan_core::{Position, QuadSelection, RasterImage};
use tracing::{debug, info, instrument, warn};

use crate::scan::homography::Homography;

/// Sampling positions this close to a whole pixel are treated as exact, so an
/// identity mapping reproduces the source bit for bit.
const SNAP_EPS: f64 = 1e-6;

/// Perspective dewarp with a fixed resampling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DewarpEngine {
    interpolation: Interpolation,
    fill: FillMode,
}

impl Default for DewarpEngine {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Bilinear,
            fill: FillMode::TransparentBlack,
        }
    }
}

impl DewarpEngine {
    pub fn new(interpolation: Interpolation, fill: FillMode) -> Self {
        Self {
            interpolation,
            fill,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.interpolation, config.fill)
    }

    /// Rectify the region of `image` enclosed by `handles`.
    ///
    /// `handles` are display-surface positions; they are mapped into source
    /// pixel space through the image's origin and scale factor. The output is
    /// a new full-resolution image placed at scale 1, origin (0, 0).
    ///
    /// Fails with [`QuadscanError::InvalidSelection`] when the quadrilateral
    /// collapses to a zero-sized rectangle or has no projective solution.
    #[instrument(skip_all, fields(src_w = image.width(), src_h = image.height()))]
    pub fn dewarp(&self, image: &RasterImage, handles: &QuadSelection) -> Result<RasterImage> {
        let quad = handles.handles().map(|h| image.display_to_source(&h));
        let (width, height) = target_size(&quad)?;
        let [tl, tr, br, bl] = quad;

        // Winding TL, BL, BR, TR on both sides of the correspondence.
        let (w, h) = (width as f64, height as f64);
        let source = [tl, bl, br, tr];
        let target = [
            Position::new(0.0, 0.0),
            Position::new(0.0, h),
            Position::new(w, h),
            Position::new(w, 0.0),
        ];

        let forward = Homography::from_point_pairs(&source, &target).ok_or_else(|| {
            warn!(?quad, "Selection has no projective solution");
            QuadscanError::InvalidSelection {
                width: width as i64,
                height: height as i64,
            }
        })?;
        let backward = forward.inverse().ok_or(QuadscanError::InvalidSelection {
            width: width as i64,
            height: height as i64,
        })?;
        debug!(matrix = ?forward.matrix(), "Perspective transform solved");

        let output = self.warp(image.as_rgba(), &backward, width, height);
        info!(width, height, "Perspective dewarp applied");
        Ok(RasterImage::from_rgba(output))
    }

    /// Fill a `width` x `height` image by pulling every destination pixel
    /// through `backward` into `src`.
    fn warp(&self, src: &RgbaImage, backward: &Homography, width: u32, height: u32) -> RgbaImage {
        let fill = Rgba(self.fill.rgba());
        RgbaImage::from_fn(width, height, |x, y| {
            match backward.apply(x as f64, y as f64) {
                Some((sx, sy)) => match self.interpolation {
                    Interpolation::Nearest => sample_nearest(src, sx, sy, fill),
                    Interpolation::Bilinear => sample_bilinear(src, sx, sy, fill),
                },
                None => fill,
            }
        })
    }
}

/// Output rectangle for a source-space quad (TL, TR, BR, BL).
///
/// Opposite sides usually differ under perspective; the target takes the
/// shorter side plus half the difference, rounded up.
pub fn target_size(quad: &[Position; 4]) -> Result<(u32, u32)> {
    let [tl, tr, br, bl] = quad;
    let top_width = tr.x - tl.x;
    let bottom_width = br.x - bl.x;
    let left_height = bl.y - tl.y;
    let right_height = br.y - tr.y;

    let split = |a: f64, b: f64| {
        let (min, max) = (a.min(b), a.max(b));
        (min + ((max - min) / 2.0).ceil()).round()
    };
    let width = split(top_width, bottom_width);
    let height = split(left_height, right_height);

    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        let as_int = |v: f64| if v.is_finite() { v as i64 } else { 0 };
        return Err(QuadscanError::InvalidSelection {
            width: as_int(width),
            height: as_int(height),
        });
    }
    Ok((width as u32, height as u32))
}

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < SNAP_EPS { r } else { v }
}

fn sample_nearest(src: &RgbaImage, sx: f64, sy: f64, fill: Rgba<u8>) -> Rgba<u8> {
    let (x, y) = (sx.round(), sy.round());
    if x < 0.0 || y < 0.0 || x >= src.width() as f64 || y >= src.height() as f64 {
        return fill;
    }
    *src.get_pixel(x as u32, y as u32)
}

fn sample_bilinear(src: &RgbaImage, sx: f64, sy: f64, fill: Rgba<u8>) -> Rgba<u8> {
    let (sx, sy) = (snap(sx), snap(sy));
    let max_x = src.width().saturating_sub(1);
    let max_y = src.height().saturating_sub(1);
    if src.width() == 0 || src.height() == 0 {
        return fill;
    }
    if sx < 0.0 || sy < 0.0 || sx > max_x as f64 || sy > max_y as f64 {
        return fill;
    }

    let (x0f, y0f) = (sx.floor(), sy.floor());
    let (fx, fy) = (sx - x0f, sy - y0f);
    let (x0, y0) = (x0f as u32, y0f as u32);
    let (x1, y1) = ((x0 + 1).min(max_x), (y0 + 1).min(max_y));

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        *slot = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
