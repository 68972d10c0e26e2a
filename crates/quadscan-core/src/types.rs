// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Quadscan: raster images, the four-handle selection,
// filter parameters and rotation state.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::color::{ColorSample, average_of};
use crate::error::{QuadscanError, Result};
use crate::geometry::{DisplayRect, Position, positions_overlap};

/// The four corners of a document selection, in handle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// All corners in handle (polygon traversal) order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Index of this corner in a [`QuadSelection`].
    pub fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BottomRight => 2,
            Self::BottomLeft => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
        }
    }
}

/// Four handles in display-surface coordinates, ordered TL, TR, BR, BL.
///
/// There are always exactly four handles; the fixed-size array enforces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadSelection {
    handles: [Position; 4],
}

impl QuadSelection {
    pub fn new(handles: [Position; 4]) -> Self {
        Self { handles }
    }

    /// Handles placed on the corners of `rect`.
    pub fn from_rect(rect: &DisplayRect) -> Self {
        Self::new(rect.corners())
    }

    pub fn handles(&self) -> &[Position; 4] {
        &self.handles
    }

    pub fn get(&self, corner: Corner) -> Position {
        self.handles[corner.index()]
    }

    pub fn set(&mut self, corner: Corner, pos: Position) {
        self.handles[corner.index()] = pos;
    }

    /// Move the handle at `index`.
    pub fn set_index(&mut self, index: usize, pos: Position) -> Result<()> {
        let slot = self
            .handles
            .get_mut(index)
            .ok_or(QuadscanError::InvalidHandleIndex(index))?;
        *slot = pos;
        Ok(())
    }

    /// Index of the handle under `pos` (square hit-test). When several handles
    /// are hit, the last one in handle order wins.
    pub fn handle_at(&self, pos: &Position, radius: f64) -> Option<usize> {
        self.handles
            .iter()
            .enumerate()
            .filter(|(_, handle)| positions_overlap(pos, handle, radius))
            .map(|(index, _)| index)
            .last()
    }
}

/// An RGBA raster with its placement on the display surface.
///
/// `scale_factor` is the display-to-source ratio: a source pixel occupies
/// `scale_factor` display units. `origin` is where the image's top-left corner
/// sits on the display surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
    scale_factor: f64,
    origin: Position,
}

impl RasterImage {
    /// Build from an interleaved RGBA buffer. Fails if the buffer length is not
    /// `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        let actual = data.len();
        let pixels = RgbaImage::from_raw(width, height, data)
            .filter(|_| actual == expected)
            .ok_or(QuadscanError::InvalidBuffer { expected, actual })?;
        Ok(Self::from_rgba(pixels))
    }

    /// Wrap a decoded image at scale 1, origin (0, 0).
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            scale_factor: 1.0,
            origin: Position::default(),
        }
    }

    /// Same image, different placement.
    pub fn with_placement(mut self, scale_factor: f64, origin: Position) -> Self {
        self.scale_factor = scale_factor;
        self.origin = origin;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Raw interleaved RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Width on the display surface, rounded to whole units.
    pub fn display_width(&self) -> f64 {
        (self.width() as f64 * self.scale_factor).round()
    }

    pub fn display_height(&self) -> f64 {
        (self.height() as f64 * self.scale_factor).round()
    }

    /// The rectangle this image occupies on the display surface.
    pub fn display_rect(&self) -> DisplayRect {
        DisplayRect::new(self.origin, self.display_width(), self.display_height())
    }

    /// RGBA at `(x, y)`, or `None` outside the image.
    pub fn pixel_at(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return None;
        }
        Some(self.pixels.get_pixel(x as u32, y as u32).0)
    }

    /// Colour at `(x, y)`; outside the image reads as black, like an
    /// off-surface read.
    pub fn color_at(&self, x: i64, y: i64) -> ColorSample {
        self.pixel_at(x, y)
            .map(ColorSample::from_rgba)
            .unwrap_or(ColorSample::BLACK)
    }

    /// Colour under a display-surface position.
    pub fn color_at_display(&self, pos: &Position) -> ColorSample {
        let local = self.display_to_source(pos);
        self.color_at(local.x.floor() as i64, local.y.floor() as i64)
    }

    /// Average colour of the source square of side `2 * radius` centred under
    /// a display-surface position, clipped to the image. `None` when the square
    /// lies entirely outside.
    pub fn average_color_around(&self, pos: &Position, radius: u32) -> Option<ColorSample> {
        let centre = self.display_to_source(pos);
        let r = radius as i64;
        let (cx, cy) = (centre.x.floor() as i64, centre.y.floor() as i64);
        let xs = (cx - r).max(0)..(cx + r).min(self.width() as i64);
        let ys = (cy - r).max(0)..(cy + r).min(self.height() as i64);
        let samples = ys
            .flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter_map(|(x, y)| self.pixel_at(x, y).map(ColorSample::from_rgba));
        average_of(samples)
    }

    /// Map a display-surface position to source pixel coordinates.
    ///
    /// Each axis uses the ratio of the rounded display size to the source
    /// size, so the corners of [`display_rect`](Self::display_rect) land
    /// exactly on the source corners.
    pub fn display_to_source(&self, pos: &Position) -> Position {
        let local = pos.relative_to(&self.origin);
        if self.scale_factor == 1.0 {
            return local;
        }
        Position::new(
            self.to_source_axis(local.x, self.width(), self.display_width()),
            self.to_source_axis(local.y, self.height(), self.display_height()),
        )
    }

    /// Map source pixel coordinates onto the display surface.
    pub fn source_to_display(&self, pos: &Position) -> Position {
        if self.scale_factor == 1.0 {
            return pos.offset_by(&self.origin);
        }
        Position::new(
            self.to_display_axis(pos.x, self.width(), self.display_width()),
            self.to_display_axis(pos.y, self.height(), self.display_height()),
        )
        .offset_by(&self.origin)
    }

    fn to_source_axis(&self, v: f64, source: u32, display: f64) -> f64 {
        if display > 0.0 {
            v * source as f64 / display
        } else {
            v / self.scale_factor
        }
    }

    fn to_display_axis(&self, v: f64, source: u32, display: f64) -> f64 {
        if source > 0 {
            v * display / source as f64
        } else {
            v * self.scale_factor
        }
    }

    /// Scale and centre this image inside a `surface_width` x `surface_height`
    /// drawing surface, leaving at least `padding` units free. Images are
    /// never upscaled.
    pub fn fit(self, surface_width: f64, surface_height: f64, padding: f64) -> Self {
        let max_width = surface_width - padding;
        let max_height = surface_height - padding;
        let (w, h) = (self.width() as f64, self.height() as f64);

        let mut scale = 1.0;
        if w > max_width || h > max_height {
            scale = (max_width / w).min(max_height / h);
        }
        let display_w = (w * scale).round();
        let display_h = (h * scale).round();

        let mut origin = Position::default();
        if display_w < surface_width {
            origin.x = (surface_width / 2.0 - display_w / 2.0).round();
        }
        if display_h < surface_height {
            origin.y = (surface_height / 2.0 - display_h / 2.0).round();
        }
        self.with_placement(scale, origin)
    }
}

/// Which filter parameter a value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterParam {
    Brightness,
    Contrast,
    Saturation,
    Sharpness,
}

/// The four filter parameters driving the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// Added to every colour channel. Roughly `[-255, 255]`.
    pub brightness: f64,
    /// Multiplier around 128.
    pub contrast: f64,
    /// Multiplier around perceptual grey.
    pub saturation: f64,
    /// Signed convolution strength; negative blurs, positive sharpens.
    pub sharpness: f64,
}

impl FilterState {
    pub const BRIGHTNESS_DEFAULT: f64 = 0.0;
    pub const CONTRAST_DEFAULT: f64 = 1.0;
    pub const SATURATION_DEFAULT: f64 = 1.0;
    pub const SHARPNESS_DEFAULT: f64 = 0.0;

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn get(&self, param: FilterParam) -> f64 {
        match param {
            FilterParam::Brightness => self.brightness,
            FilterParam::Contrast => self.contrast,
            FilterParam::Saturation => self.saturation,
            FilterParam::Sharpness => self.sharpness,
        }
    }

    pub fn set(&mut self, param: FilterParam, value: f64) {
        match param {
            FilterParam::Brightness => self.brightness = value,
            FilterParam::Contrast => self.contrast = value,
            FilterParam::Saturation => self.saturation = value,
            FilterParam::Sharpness => self.sharpness = value,
        }
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            brightness: Self::BRIGHTNESS_DEFAULT,
            contrast: Self::CONTRAST_DEFAULT,
            saturation: Self::SATURATION_DEFAULT,
            sharpness: Self::SHARPNESS_DEFAULT,
        }
    }
}

/// Pending rotation in quarter turns, stored as degrees.
///
/// Rotating left from 0 wraps to 270; rotating right past 360 wraps to 90, so
/// 360 is a reachable value and means "no rotation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rotation(u16);

impl Rotation {
    /// Accepts 0, 90, 180, 270 and 360.
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        matches!(degrees, 0 | 90 | 180 | 270 | 360).then_some(Self(degrees))
    }

    pub fn degrees(&self) -> u16 {
        self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0 == 0 || self.0 == 360
    }

    pub fn rotated_left(self) -> Self {
        match self.0.checked_sub(90) {
            Some(d) => Self(d),
            None => Self(270),
        }
    }

    pub fn rotated_right(self) -> Self {
        let next = self.0 + 90;
        if next > 360 { Self(90) } else { Self(next) }
    }
}
