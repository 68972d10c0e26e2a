// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — the filter pipeline (brightness, contrast, saturation,
// sharpness) plus greyscale, threshold, Sobel and quarter-turn rotation.
// Works on an unclamped floating-point copy of the pixels; values are only
// clamped when converted back to 8-bit RGBA.

use image::{DynamicImage, RgbaImage, imageops};
use quadscan_core::error::{QuadscanError, Result};
use quadscan_core::{FilterState, RasterImage, Rotation};
use tracing::{debug, info, instrument};

use crate::image::convolve::{Kernel, convolve};

/// Filter pipeline over a single in-memory image.
///
/// Every stage consumes `self` and returns the transformed processor, so
/// stages chain:
///
/// ```ignore
/// let out = ImageProcessor::from_raster(&cropped)
///     .adjust_brightness(12.0)
///     .adjust_contrast(1.2)
///     .adjust_sharpness(30.0, false)
///     .into_raster();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProcessor {
    width: u32,
    height: u32,
    /// Interleaved RGBA, row-major, never clamped between stages.
    data: Vec<f64>,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    pub fn from_rgba(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.as_raw().iter().map(|&v| v as f64).collect(),
        }
    }

    pub fn from_raster(image: &RasterImage) -> Self {
        Self::from_rgba(image.as_rgba())
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The working values, interleaved RGBA.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    // -- Filter stages --------------------------------------------------------

    /// Run the four adjustable stages in their fixed order. A stage is skipped
    /// while its parameter holds the default value.
    #[instrument(skip(self), fields(w = self.width, h = self.height))]
    pub fn apply_filters(self, filters: &FilterState, opaque: bool) -> Self {
        let mut out = self;
        if filters.brightness != FilterState::BRIGHTNESS_DEFAULT {
            out = out.adjust_brightness(filters.brightness);
        }
        if filters.contrast != FilterState::CONTRAST_DEFAULT {
            out = out.adjust_contrast(filters.contrast);
        }
        if filters.saturation != FilterState::SATURATION_DEFAULT {
            out = out.adjust_saturation(filters.saturation);
        }
        if filters.sharpness != FilterState::SHARPNESS_DEFAULT {
            out = out.adjust_sharpness(filters.sharpness, opaque);
        }
        out
    }

    /// Add `factor` to every colour channel.
    pub fn adjust_brightness(self, factor: f64) -> Self {
        debug!(factor, "Adjusting brightness");
        self.map_rgb(|[r, g, b]| [r + factor, g + factor, b + factor])
    }

    /// Scale every colour channel's distance from 128 by `factor`.
    pub fn adjust_contrast(self, factor: f64) -> Self {
        debug!(factor, "Adjusting contrast");
        let stretch = |c: f64| factor * (c - 128.0) + 128.0;
        self.map_rgb(|[r, g, b]| [stretch(r), stretch(g), stretch(b)])
    }

    /// Scale every colour channel's distance from its perceived grey by
    /// `factor`.
    pub fn adjust_saturation(self, factor: f64) -> Self {
        debug!(factor, "Adjusting saturation");
        self.map_rgb(|[r, g, b]| {
            let p = (r * r * 0.299 + g * g * 0.587 + b * b * 0.114).sqrt();
            [p + (r - p) * factor, p + (g - p) * factor, p + (b - p) * factor]
        })
    }

    /// Blur (`value < 0`) or sharpen (`value > 0`) with a 3x3 kernel whose
    /// weights are offset by `value / 100`. Zero is the identity.
    pub fn adjust_sharpness(self, value: f64, opaque: bool) -> Self {
        let factor = value / 100.0;
        debug!(factor, "Adjusting sharpness");
        if factor < 0.0 {
            self.convolve(&Kernel::box_blur(factor), opaque)
        } else if factor > 0.0 {
            self.convolve(&Kernel::sharpen(factor), opaque)
        } else {
            self
        }
    }

    /// Convolve all four channels with `kernel`.
    pub fn convolve(self, kernel: &Kernel, opaque: bool) -> Self {
        let data = convolve(
            &self.data,
            self.width as usize,
            self.height as usize,
            kernel,
            opaque,
        );
        Self { data, ..self }
    }

    /// Replace each colour channel with the plain channel average.
    pub fn grayscale(self) -> Self {
        self.map_rgb(|[r, g, b]| {
            let average = (r + g + b) / 3.0;
            [average; 3]
        })
    }

    /// Black or white per pixel: white when the Rec. 709 luma reaches
    /// `threshold`.
    pub fn threshold(self, threshold: f64) -> Self {
        self.map_rgb(|[r, g, b]| {
            let v = if 0.2126 * r + 0.7152 * g + 0.0722 * b >= threshold {
                255.0
            } else {
                0.0
            };
            [v; 3]
        })
    }

    /// Edge visualisation: the horizontal gradient in red, the vertical
    /// gradient in green and a quarter of their sum in blue, fully opaque.
    /// Gradients are clamped to the 8-bit range before combining, so negative
    /// responses vanish.
    pub fn sobel(self) -> Self {
        let (width, height) = (self.width as usize, self.height as usize);
        let gray = self.grayscale();
        let vertical = convolve(&gray.data, width, height, &Kernel::sobel_vertical(), false);
        let horizontal = convolve(&gray.data, width, height, &Kernel::sobel_horizontal(), false);

        let mut data = vec![0.0; gray.data.len()];
        for (i, px) in data.chunks_exact_mut(4).enumerate() {
            let v = vertical[i * 4].clamp(0.0, 255.0).round();
            let h = horizontal[i * 4].clamp(0.0, 255.0).round();
            px.copy_from_slice(&[v, h, (v + h) / 4.0, 255.0]);
        }
        Self { data, ..gray }
    }

    // -- Output ---------------------------------------------------------------

    /// Clamp and round the working values into an 8-bit image.
    pub fn to_rgba(&self) -> RgbaImage {
        let bytes: Vec<u8> = self
            .data
            .iter()
            .map(|&v| v.clamp(0.0, 255.0).round() as u8)
            .collect();
        // The buffer length is width * height * 4 by construction.
        RgbaImage::from_raw(self.width, self.height, bytes)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn into_raster(self) -> RasterImage {
        RasterImage::from_rgba(self.to_rgba())
    }

    fn map_rgb(mut self, f: impl Fn([f64; 3]) -> [f64; 3]) -> Self {
        for px in self.data.chunks_exact_mut(4) {
            let [r, g, b] = f([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
        self
    }
}

/// Rotate by a quarter-turn multiple, clockwise. Identity rotations return a
/// copy.
#[instrument(skip(image), fields(degrees = rotation.degrees()))]
pub fn rotate(image: &RgbaImage, rotation: Rotation) -> RgbaImage {
    match rotation.degrees() {
        90 => imageops::rotate90(image),
        180 => imageops::rotate180(image),
        270 => imageops::rotate270(image),
        _ => image.clone(),
    }
}

/// Decode an image file into an RGBA raster.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open_image(path: impl AsRef<std::path::Path>) -> Result<RasterImage> {
    let img = image::open(path.as_ref()).map_err(|err| {
        QuadscanError::ImageError(format!(
            "failed to open {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    info!(width = img.width(), height = img.height(), "Image loaded");
    Ok(RasterImage::from_rgba(img.to_rgba8()))
}

/// Decode an in-memory encoded image (JPEG, PNG, ...).
pub fn decode_image(data: &[u8]) -> Result<RasterImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| QuadscanError::ImageError(format!("failed to decode image: {}", err)))?;
    Ok(RasterImage::from_rgba(img.to_rgba8()))
}

/// Write an image; the format follows the file extension. Formats without
/// an alpha channel receive the RGB channels only.
pub fn save_image(image: &RasterImage, path: impl AsRef<std::path::Path>) -> Result<()> {
    let path = path.as_ref();
    let wants_rgb = matches!(
        image::ImageFormat::from_path(path),
        Ok(image::ImageFormat::Jpeg | image::ImageFormat::Bmp)
    );
    let dynamic = DynamicImage::ImageRgba8(image.as_rgba().clone());
    let result = if wants_rgb {
        DynamicImage::ImageRgb8(dynamic.to_rgb8()).save(path)
    } else {
        dynamic.save(path)
    };
    result.map_err(|err| {
        QuadscanError::ImageError(format!(
            "failed to save image to {}: {}",
            path.display(),
            err
        ))
    })
}
