// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor session — owns the loaded image, the four handles, the filter
// parameters and the pending rotation, and serialises long operations behind
// a busy guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use quadscan_core::config::EditorConfig;
use quadscan_core::error::{QuadscanError, Result};
use quadscan_core::{FilterParam, FilterState, Position, QuadSelection, RasterImage, Rotation};
use tracing::{debug, info, instrument, warn};

use crate::image::estimate::AutoEnhance;
use crate::image::processor::{ImageProcessor, rotate};
use crate::scan::corners::{CornerClassifier, CornerDetection};
use crate::scan::detector::detector_for;
use crate::scan::dewarp::DewarpEngine;

/// Held for the duration of a long operation; clears the busy flag on drop.
#[derive(Debug)]
pub struct OperationGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct SessionState {
    /// Full-resolution source, fitted to the surface, without the pending
    /// rotation.
    original: Option<RasterImage>,
    /// `original` with the pending rotation applied; the handles live on it
    /// until a crop happens.
    view: Option<RasterImage>,
    /// Dewarped result, fitted to the surface.
    cropped: Option<RasterImage>,
    handles: QuadSelection,
    filters: FilterState,
    rotation: Rotation,
}

impl SessionState {
    /// The raster the filters currently apply to.
    fn current(&self) -> Option<&RasterImage> {
        self.cropped.as_ref().or(self.view.as_ref())
    }
}

/// One editing session over one image at a time.
///
/// Long operations (loading, corner placement, crop, rotation, rendering,
/// export, auto-improve) take the busy guard first; a request that arrives
/// while another one runs fails with [`QuadscanError::BusyRejected`] and
/// leaves the running operation alone.
#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    surface_width: f64,
    surface_height: f64,
    busy: AtomicBool,
    state: Mutex<SessionState>,
}

impl EditorSession {
    /// A session drawing onto a `surface_width` x `surface_height` display
    /// surface.
    pub fn new(config: EditorConfig, surface_width: f64, surface_height: f64) -> Result<Self> {
        config.validate()?;
        if !(surface_width > 0.0 && surface_height > 0.0) {
            return Err(QuadscanError::InvalidConfig(format!(
                "surface must be positive, got {surface_width}x{surface_height}"
            )));
        }
        let padding = config.scaled_padding();
        if surface_width <= padding || surface_height <= padding {
            return Err(QuadscanError::InvalidConfig(format!(
                "surface {surface_width}x{surface_height} leaves no room inside padding {padding}"
            )));
        }
        Ok(Self {
            config,
            surface_width,
            surface_height,
            busy: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the busy flag, or fail with `BusyRejected` if it is taken.
    pub fn try_begin(&self) -> Result<OperationGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                warn!("Operation rejected: session busy");
                QuadscanError::BusyRejected
            })?;
        Ok(OperationGuard { busy: &self.busy })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fit(&self, image: RasterImage) -> RasterImage {
        image.fit(
            self.surface_width,
            self.surface_height,
            self.config.scaled_padding(),
        )
    }

    fn locate_corners(&self, image: &RasterImage) -> Result<CornerDetection> {
        let detector = detector_for(self.config.corner_detection);
        CornerClassifier::from_config(&self.config).locate(image, detector.as_deref())
    }

    // -- Loading and handles ---------------------------------------------------

    /// Replace the session's image. Filters, rotation and any crop are reset,
    /// and the handles are placed on the detected page corners.
    #[instrument(skip_all, fields(w = image.width(), h = image.height()))]
    pub fn load(&self, image: RasterImage) -> Result<CornerDetection> {
        let _guard = self.try_begin()?;
        let fitted = self.fit(image);
        let detection = self.locate_corners(&fitted)?;
        info!(
            scale = fitted.scale_factor(),
            outcome = ?detection.outcome,
            "Image loaded into session"
        );

        let mut state = self.state();
        *state = SessionState {
            original: Some(fitted.clone()),
            view: Some(fitted),
            cropped: None,
            handles: detection.handles,
            filters: FilterState::default(),
            rotation: Rotation::default(),
        };
        Ok(detection)
    }

    /// Run corner detection again on the uncropped view.
    pub fn place_handles(&self) -> Result<CornerDetection> {
        let _guard = self.try_begin()?;
        let view = self.state().view.clone().ok_or(QuadscanError::NoSourceImage)?;
        let detection = self.locate_corners(&view)?;
        self.state().handles = detection.handles;
        Ok(detection)
    }

    pub fn handles(&self) -> QuadSelection {
        self.state().handles
    }

    /// Move handle `index` (0 = top-left, clockwise) to a display position.
    pub fn set_handle(&self, index: usize, pos: Position) -> Result<()> {
        let mut state = self.state();
        if state.view.is_none() {
            return Err(QuadscanError::NoSourceImage);
        }
        state.handles.set_index(index, pos)
    }

    /// Index of the handle under a display position, if any.
    pub fn handle_at(&self, pos: &Position) -> Option<usize> {
        self.state().handles.handle_at(pos, self.config.hit_radius())
    }

    /// The handles in source pixel coordinates of the uncropped view.
    pub fn source_handles(&self) -> Result<[Position; 4]> {
        let state = self.state();
        let view = state.view.as_ref().ok_or(QuadscanError::NoSourceImage)?;
        Ok(state.handles.handles().map(|h| view.display_to_source(&h)))
    }

    /// Place all four handles from source pixel coordinates (TL, TR, BR, BL).
    pub fn set_source_handles(&self, corners: [Position; 4]) -> Result<()> {
        let mut state = self.state();
        let view = state.view.as_ref().ok_or(QuadscanError::NoSourceImage)?;
        let handles = QuadSelection::new(corners.map(|c| view.source_to_display(&c)));
        state.handles = handles;
        Ok(())
    }

    // -- Rotation ---------------------------------------------------------------

    pub fn rotation(&self) -> Rotation {
        self.state().rotation
    }

    /// Rotate a quarter turn counter-clockwise.
    pub fn rotate_left(&self) -> Result<Rotation> {
        self.apply_rotation(Rotation::rotated_left)
    }

    /// Rotate a quarter turn clockwise.
    pub fn rotate_right(&self) -> Result<Rotation> {
        self.apply_rotation(Rotation::rotated_right)
    }

    /// Before a crop, the rotated source replaces the view and the handles
    /// are placed again. After a crop the rotation stays pending until render
    /// or export.
    #[instrument(skip_all)]
    fn apply_rotation(&self, step: fn(Rotation) -> Rotation) -> Result<Rotation> {
        let _guard = self.try_begin()?;
        let (original, rotation, cropped) = {
            let state = self.state();
            let original = state.original.clone().ok_or(QuadscanError::NoSourceImage)?;
            (original, step(state.rotation), state.cropped.is_some())
        };

        if cropped {
            self.state().rotation = rotation;
            debug!(degrees = rotation.degrees(), "Rotation pending on cropped image");
            return Ok(rotation);
        }

        let rotated = RasterImage::from_rgba(rotate(original.as_rgba(), rotation));
        let view = self.fit(rotated);
        let detection = self.locate_corners(&view)?;

        let mut state = self.state();
        state.view = Some(view);
        state.handles = detection.handles;
        state.rotation = rotation;
        info!(degrees = rotation.degrees(), "View rotated");
        Ok(rotation)
    }

    // -- Crop ---------------------------------------------------------------------

    /// Dewarp the quadrilateral under the handles at full resolution.
    ///
    /// A pending rotation is baked into the source first and then cleared.
    /// Returns the cropped image as placed on the surface.
    #[instrument(skip_all)]
    pub fn crop(&self) -> Result<RasterImage> {
        let _guard = self.try_begin()?;
        let (view, handles) = {
            let state = self.state();
            let view = state.view.clone().ok_or(QuadscanError::NoSourceImage)?;
            (view, state.handles)
        };

        let dewarped = DewarpEngine::from_config(&self.config).dewarp(&view, &handles)?;
        let cropped = self.fit(dewarped);

        let mut state = self.state();
        if !state.rotation.is_identity() {
            state.original = Some(view.clone());
        }
        state.view = Some(view);
        state.rotation = Rotation::default();
        state.cropped = Some(cropped.clone());
        info!(w = cropped.width(), h = cropped.height(), "Selection cropped");
        Ok(cropped)
    }

    /// Drop the crop and filters, and place the handles on the source again.
    pub fn reset_crop(&self) -> Result<CornerDetection> {
        let _guard = self.try_begin()?;
        let original = self.state().original.clone().ok_or(QuadscanError::NoSourceImage)?;
        let detection = self.locate_corners(&original)?;

        let mut state = self.state();
        state.view = Some(original);
        state.cropped = None;
        state.rotation = Rotation::default();
        state.filters.reset();
        state.handles = detection.handles;
        Ok(detection)
    }

    pub fn is_cropped(&self) -> bool {
        self.state().cropped.is_some()
    }

    // -- Filters ------------------------------------------------------------------

    pub fn filters(&self) -> FilterState {
        self.state().filters
    }

    pub fn set_filter(&self, param: FilterParam, value: f64) -> Result<()> {
        if self.is_busy() {
            return Err(QuadscanError::BusyRejected);
        }
        self.state().filters.set(param, value);
        Ok(())
    }

    pub fn set_filters(&self, filters: FilterState) -> Result<()> {
        if self.is_busy() {
            return Err(QuadscanError::BusyRejected);
        }
        self.state().filters = filters;
        Ok(())
    }

    pub fn reset_filters(&self) -> Result<()> {
        if self.is_busy() {
            return Err(QuadscanError::BusyRejected);
        }
        self.state().filters.reset();
        Ok(())
    }

    /// Estimate filter values from the current image and fold them into the
    /// session's filters.
    #[instrument(skip_all)]
    pub fn auto_improve(&self) -> Result<FilterState> {
        let _guard = self.try_begin()?;
        let mut state = self.state();
        let current = state.current().ok_or(QuadscanError::NoSourceImage)?;
        let estimate = AutoEnhance::estimate(current.as_rgba());
        estimate.apply_to(&mut state.filters);
        info!(filters = ?state.filters, "Auto-improve applied");
        Ok(state.filters)
    }

    // -- Output -------------------------------------------------------------------

    /// The current image (cropped, or the uncropped view) with the filters
    /// applied, placed on the surface.
    pub fn render(&self) -> Result<RasterImage> {
        let _guard = self.try_begin()?;
        let image = self.finish()?;
        Ok(self.fit(image))
    }

    /// The final full-resolution result: the crop (or the whole source), the
    /// filters and the pending rotation.
    #[instrument(skip_all)]
    pub fn export(&self) -> Result<RasterImage> {
        let _guard = self.try_begin()?;
        let image = self.finish()?;
        info!(w = image.width(), h = image.height(), "Image exported");
        Ok(image)
    }

    fn finish(&self) -> Result<RasterImage> {
        let (current, filters, rotation, cropped) = {
            let state = self.state();
            let current = state.current().cloned().ok_or(QuadscanError::NoSourceImage)?;
            (current, state.filters, state.rotation, state.cropped.is_some())
        };

        let filtered = ImageProcessor::from_raster(&current)
            .apply_filters(&filters, self.config.opaque_convolution)
            .to_rgba();
        // Before a crop the view already carries the rotation.
        let output = if cropped && !rotation.is_identity() {
            rotate(&filtered, rotation)
        } else {
            filtered
        };
        Ok(RasterImage::from_rgba(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use quadscan_core::config::CornerDetectionMethod;

    fn config() -> EditorConfig {
        EditorConfig {
            corner_detection: CornerDetectionMethod::None,
            ..EditorConfig::default()
        }
    }

    fn session() -> EditorSession {
        EditorSession::new(config(), 530.0, 430.0).unwrap()
    }

    fn photo(w: u32, h: u32) -> RasterImage {
        RasterImage::from_rgba(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255])
        }))
    }

    #[test]
    fn operations_need_an_image() {
        let s = session();
        assert!(matches!(s.crop(), Err(QuadscanError::NoSourceImage)));
        assert!(matches!(s.export(), Err(QuadscanError::NoSourceImage)));
        assert!(matches!(s.rotate_left(), Err(QuadscanError::NoSourceImage)));
        assert!(matches!(
            s.set_handle(0, Position::new(1.0, 1.0)),
            Err(QuadscanError::NoSourceImage)
        ));
        // A failed operation still releases the guard.
        assert!(!s.is_busy());
    }

    /// Without detection the handles sit on the fitted image's corners.
    #[test]
    fn load_places_bounding_box_handles() {
        let s = session();
        let detection = s.load(photo(1000, 800)).unwrap();
        let handles = s.handles();
        assert_eq!(handles, detection.handles);
        // 1000x800 into 500x400 at scale 0.5, centred on 530x430.
        assert_eq!(handles.handles()[0], Position::new(15.0, 15.0));
        assert_eq!(handles.handles()[2], Position::new(515.0, 415.0));
    }

    #[test]
    fn busy_session_rejects_requests() {
        let s = session();
        s.load(photo(50, 50)).unwrap();
        let guard = s.try_begin().unwrap();
        assert!(matches!(s.crop(), Err(QuadscanError::BusyRejected)));
        assert!(matches!(s.export(), Err(QuadscanError::BusyRejected)));
        assert!(matches!(
            s.set_filter(FilterParam::Brightness, 4.0),
            Err(QuadscanError::BusyRejected)
        ));
        drop(guard);
        assert!(s.crop().is_ok());
    }

    /// A second thread is turned away while the first holds the guard.
    #[test]
    fn busy_guard_across_threads() {
        let s = session();
        s.load(photo(20, 20)).unwrap();
        let guard = s.try_begin().unwrap();
        std::thread::scope(|scope| {
            let handle = scope.spawn(|| s.export());
            assert!(matches!(handle.join().unwrap(), Err(QuadscanError::BusyRejected)));
        });
        drop(guard);
        assert!(s.export().is_ok());
    }

    /// Cropping the full bounding box of a scaled-down view returns the
    /// full-resolution source unchanged.
    #[test]
    fn bounding_box_crop_is_lossless() {
        let s = session();
        let source = photo(1000, 800);
        s.load(source.clone()).unwrap();
        s.crop().unwrap();
        let exported = s.export().unwrap();
        assert_eq!(exported.as_raw(), source.as_raw());
    }

    /// 1001x800 on this surface rounds to a 500x400 display, whose ratio
    /// differs from the fit scale on the vertical axis.
    #[test]
    fn bounding_box_crop_is_lossless_when_display_size_rounds() {
        let s = session();
        let source = photo(1001, 800);
        s.load(source.clone()).unwrap();
        assert_eq!(
            s.source_handles().unwrap()[2],
            Position::new(1001.0, 800.0)
        );
        s.crop().unwrap();
        let exported = s.export().unwrap();
        assert_eq!((exported.width(), exported.height()), (1001, 800));
        assert_eq!(exported.as_raw(), source.as_raw());
    }

    #[test]
    fn surface_must_exceed_padding() {
        for (w, h) in [(20.0, 20.0), (30.0, 500.0), (500.0, 30.0)] {
            assert!(matches!(
                EditorSession::new(config(), w, h),
                Err(QuadscanError::InvalidConfig(_))
            ));
        }
        let s = EditorSession::new(config(), 31.0, 31.0).unwrap();
        s.load(photo(100, 100)).unwrap();
        let handles = *s.handles().handles();
        assert!(handles[1].x > handles[0].x);
        assert!(handles[3].y > handles[0].y);
    }

    #[test]
    fn filters_reset_on_load_and_apply_on_export() {
        let s = session();
        s.load(photo(30, 20)).unwrap();
        s.set_filter(FilterParam::Brightness, 300.0).unwrap();
        let exported = s.export().unwrap();
        assert!(exported.as_rgba().pixels().all(|p| p.0[..3] == [255, 255, 255]));

        s.load(photo(30, 20)).unwrap();
        assert!(s.filters().is_default());
        s.set_filter(FilterParam::Contrast, 2.0).unwrap();
        s.reset_filters().unwrap();
        assert!(s.filters().is_default());
    }

    #[test]
    fn rotation_wraps_and_swaps_view() {
        let s = session();
        s.load(photo(60, 20)).unwrap();
        assert_eq!(s.rotate_left().unwrap().degrees(), 270);
        assert_eq!(s.rotate_right().unwrap().degrees(), 360);
        assert_eq!(s.rotate_right().unwrap().degrees(), 90);

        // Handles now span the rotated 20x60 view.
        let handles = *s.handles().handles();
        assert_eq!(handles[1].x - handles[0].x, 20.0);
        assert_eq!(handles[3].y - handles[0].y, 60.0);

        let exported = s.export().unwrap();
        assert_eq!((exported.width(), exported.height()), (20, 60));
    }

    /// Rotation before a crop is baked into the crop and then cleared;
    /// rotation after a crop applies on export.
    #[test]
    fn rotation_around_crop() {
        let s = session();
        s.load(photo(60, 20)).unwrap();
        s.rotate_right().unwrap();
        let cropped = s.crop().unwrap();
        assert_eq!((cropped.width(), cropped.height()), (20, 60));
        assert!(s.rotation().is_identity());

        s.rotate_right().unwrap();
        let exported = s.export().unwrap();
        assert_eq!((exported.width(), exported.height()), (60, 20));

        s.reset_crop().unwrap();
        assert!(!s.is_cropped());
        assert!(s.rotation().is_identity());
    }

    #[test]
    fn handle_editing() {
        let s = session();
        s.load(photo(100, 100)).unwrap();
        s.set_handle(2, Position::new(300.0, 300.0)).unwrap();
        assert_eq!(s.handle_at(&Position::new(305.0, 296.0)), Some(2));
        assert_eq!(s.handle_at(&Position::new(10.0, 400.0)), None);
        assert!(matches!(
            s.set_handle(4, Position::new(0.0, 0.0)),
            Err(QuadscanError::InvalidHandleIndex(4))
        ));
    }

    /// Handles given in source pixels crop exactly that region.
    #[test]
    fn source_handles_round_trip() {
        let s = session();
        s.load(photo(1000, 800)).unwrap();
        let corners = [
            Position::new(100.0, 200.0),
            Position::new(300.0, 200.0),
            Position::new(300.0, 260.0),
            Position::new(100.0, 260.0),
        ];
        s.set_source_handles(corners).unwrap();
        assert_eq!(s.source_handles().unwrap(), corners);
        let cropped = s.crop().unwrap();
        let exported = s.export().unwrap();
        assert_eq!((exported.width(), exported.height()), (200, 60));
        assert_eq!(cropped.as_raw(), exported.as_raw());
    }

    #[test]
    fn collapsed_handles_fail_crop() {
        let s = session();
        s.load(photo(100, 100)).unwrap();
        for i in 0..4 {
            s.set_handle(i, Position::new(200.0, 200.0)).unwrap();
        }
        assert!(matches!(s.crop(), Err(QuadscanError::InvalidSelection { .. })));
        assert!(!s.is_cropped());
    }

    #[test]
    fn auto_improve_updates_filters() {
        let s = session();
        s.load(RasterImage::from_rgba(RgbaImage::from_pixel(
            10,
            10,
            Rgba([220, 220, 220, 255]),
        )))
        .unwrap();
        let filters = s.auto_improve().unwrap();
        assert_eq!(filters.brightness, 120.0);
        assert_eq!(s.filters(), filters);
    }

    #[test]
    fn rejects_bad_surface() {
        assert!(EditorSession::new(config(), 0.0, 100.0).is_err());
    }
}
