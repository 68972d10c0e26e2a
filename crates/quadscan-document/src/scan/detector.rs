// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feature point detectors — the adapters that produce the raw point cloud fed
// into the point reducer and corner classifier.

use image::imageops::{self, FilterType};
use imageproc::corners::{Corner, corners_fast9, corners_fast12};
use quadscan_core::config::CornerDetectionMethod;
use quadscan_core::error::Result;
use quadscan_core::RasterImage;
use tracing::{debug, instrument};

/// Anything that can propose candidate corner points for an image.
///
/// Points are returned as a flat, interleaved `[x0, y0, x1, y1, ...]` sequence
/// in image-local display coordinates, i.e. relative to the image's display
/// origin and already multiplied by its scale factor.
pub trait PointDetector {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn detect(&self, image: &RasterImage) -> Result<Vec<f32>>;
}

/// Which FAST segment-test arc length to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastVariant {
    Nine,
    Twelve,
}

/// FAST corner detector running on the grayscale, display-sized image.
#[derive(Debug, Clone, Copy)]
pub struct FastDetector {
    variant: FastVariant,
    threshold: u8,
}

impl FastDetector {
    pub fn new(variant: FastVariant, threshold: u8) -> Self {
        Self { variant, threshold }
    }
}

impl PointDetector for FastDetector {
    fn name(&self) -> &str {
        match self.variant {
            FastVariant::Nine => "fast9",
            FastVariant::Twelve => "fast12",
        }
    }

    #[instrument(skip_all, fields(detector = self.name(), threshold = self.threshold))]
    fn detect(&self, image: &RasterImage) -> Result<Vec<f32>> {
        let display_w = image.display_width().max(0.0) as u32;
        let display_h = image.display_height().max(0.0) as u32;
        if display_w == 0 || display_h == 0 {
            return Ok(Vec::new());
        }

        let gray = if (display_w, display_h) == (image.width(), image.height()) {
            imageops::grayscale(image.as_rgba())
        } else {
            let resized = imageops::resize(image.as_rgba(), display_w, display_h, FilterType::Triangle);
            imageops::grayscale(&resized)
        };

        let corners: Vec<Corner> = match self.variant {
            FastVariant::Nine => corners_fast9(&gray, self.threshold),
            FastVariant::Twelve => corners_fast12(&gray, self.threshold),
        };
        debug!(count = corners.len(), "FAST corners detected");

        Ok(corners
            .iter()
            .flat_map(|c| [c.x as f32, c.y as f32])
            .collect())
    }
}

/// A point cloud computed elsewhere (an external detector, a test fixture).
#[derive(Debug, Clone, Default)]
pub struct SuppliedPoints {
    points: Vec<f32>,
}

impl SuppliedPoints {
    pub fn new(points: Vec<f32>) -> Self {
        Self { points }
    }
}

impl PointDetector for SuppliedPoints {
    fn name(&self) -> &str {
        "supplied"
    }

    fn detect(&self, _image: &RasterImage) -> Result<Vec<f32>> {
        Ok(self.points.clone())
    }
}

/// The detector behind a configured method, or `None` when detection is off.
pub fn detector_for(method: CornerDetectionMethod) -> Option<Box<dyn PointDetector>> {
    match method {
        CornerDetectionMethod::None => None,
        CornerDetectionMethod::Fast9 { threshold } => {
            Some(Box::new(FastDetector::new(FastVariant::Nine, threshold)))
        }
        CornerDetectionMethod::Fast12 { threshold } => {
            Some(Box::new(FastDetector::new(FastVariant::Twelve, threshold)))
        }
    }
}
