// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner classifier — choose the four document corners from a reduced point
// cloud, falling back to the image's bounding box whenever detection is weak.

use quadscan_core::color::color_distance;
use quadscan_core::config::EditorConfig;
use quadscan_core::error::Result;
use quadscan_core::geometry::{distance, positions_overlap};
use quadscan_core::{ColorSample, Corner, DisplayRect, Position, QuadSelection, RasterImage};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::scan::detector::PointDetector;
use crate::scan::reduce::reduce_points;

/// Maximum corner-distance gap for which the extreme-point candidate may
/// replace the nearest-point candidate.
pub const CORNER_EPSILON: f64 = 15.0;

/// Default plausibility threshold (average colour distance).
pub const DEFAULT_PLAUSIBILITY_THRESHOLD: u32 = 75;

/// How the handles in a [`CornerDetection`] were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerOutcome {
    /// Classification ran; some corners may still have fallen back.
    Detected,
    /// Fewer than four distinct points were available; bounding box kept.
    InsufficientFeaturePoints,
    /// Detection is switched off; bounding box kept.
    Disabled,
}

/// Result of corner classification.
#[derive(Debug, Clone, PartialEq)]
pub struct CornerDetection {
    pub handles: QuadSelection,
    pub outcome: CornerOutcome,
    /// Per corner (handle order): true when the bounding-box corner was used.
    pub fell_back: [bool; 4],
    /// Points that survived the plausibility test.
    pub plausible_points: usize,
}

impl CornerDetection {
    fn bounding_box(rect: &DisplayRect, outcome: CornerOutcome) -> Self {
        Self {
            handles: QuadSelection::from_rect(rect),
            outcome,
            fell_back: [true; 4],
            plausible_points: 0,
        }
    }
}

/// A candidate point with its distances to the bounding box.
#[derive(Debug, Clone, Copy)]
struct FeaturePoint {
    pos: Position,
    /// Distance to the TL, TR, BR, BL bounding-box corners.
    corner_dist: [f64; 4],
    /// Distance to the top, left, right, bottom edges.
    edge_dist: [f64; 4],
}

impl FeaturePoint {
    fn new(pos: Position, rect: &DisplayRect) -> Self {
        Self {
            pos,
            corner_dist: rect.corners().map(|c| distance(&pos, &c)),
            edge_dist: rect.edge_projections(&pos).map(|e| distance(&pos, &e)),
        }
    }
}

const EDGE_TOP: usize = 0;
const EDGE_LEFT: usize = 1;
const EDGE_RIGHT: usize = 2;

/// The outer edge used to break ties between the two methods, per corner.
fn reconciliation_edge(corner: Corner) -> usize {
    match corner {
        Corner::TopLeft | Corner::TopRight => EDGE_TOP,
        Corner::BottomRight => EDGE_RIGHT,
        Corner::BottomLeft => EDGE_LEFT,
    }
}

/// Whether `candidate` is more extreme than `current` along both axes for
/// `corner` (strict on both).
fn is_more_extreme(corner: Corner, candidate: &Position, current: &Position) -> bool {
    match corner {
        Corner::TopLeft => candidate.x < current.x && candidate.y < current.y,
        Corner::TopRight => candidate.x > current.x && candidate.y < current.y,
        Corner::BottomRight => candidate.x > current.x && candidate.y > current.y,
        Corner::BottomLeft => candidate.x < current.x && candidate.y > current.y,
    }
}

/// Local colour-variance test for a candidate page corner.
///
/// Reads the four corner pixels of the `2 * radius` square centred on `pos`
/// (display coordinates; off-image reads are black) and averages the twelve
/// ordered pairwise colour distances. A real page corner separates paper from
/// background, so the average is high.
pub fn is_possible_page_corner(
    image: &RasterImage,
    pos: &Position,
    radius: f64,
    threshold: u32,
) -> bool {
    let area = radius * 2.0;
    let half = (area / 2.0).round();
    let (left, top) = (pos.x - half, pos.y - half);
    let (right, bottom) = (left + area - 1.0, top + area - 1.0);

    let samples: [ColorSample; 4] = [
        Position::new(left, top),
        Position::new(right, top),
        Position::new(left, bottom),
        Position::new(right, bottom),
    ]
    .map(|p| image.color_at_display(&p));

    let mut sum = 0.0;
    for (i, a) in samples.iter().enumerate() {
        for (j, b) in samples.iter().enumerate() {
            if i != j {
                sum += color_distance(a, b);
            }
        }
    }
    let average = (sum / 12.0).round();
    average > threshold as f64
}

/// Selects four ordered document corners from feature points.
#[derive(Debug, Clone, Copy)]
pub struct CornerClassifier {
    hit_radius: f64,
    /// `Some(threshold)` enables the plausibility test.
    plausibility_threshold: Option<u32>,
}

impl CornerClassifier {
    pub fn new(hit_radius: f64, plausibility_threshold: Option<u32>) -> Self {
        Self {
            hit_radius,
            plausibility_threshold,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(
            config.hit_radius(),
            config
                .filter_points
                .then_some(config.plausibility_threshold),
        )
    }

    pub fn hit_radius(&self) -> f64 {
        self.hit_radius
    }

    /// Run `detector` on `image`, reduce its output and classify the corners.
    /// With no detector the handles stay on the bounding box.
    #[instrument(skip_all, fields(detector = detector.map(|d| d.name())))]
    pub fn locate(
        &self,
        image: &RasterImage,
        detector: Option<&dyn PointDetector>,
    ) -> Result<CornerDetection> {
        let rect = image.display_rect();
        let Some(detector) = detector else {
            return Ok(CornerDetection::bounding_box(&rect, CornerOutcome::Disabled));
        };
        let raw = detector.detect(image)?;
        let reduced = reduce_points(&raw, &rect, self.hit_radius);
        info!(
            raw = raw.len() / 2,
            reduced = reduced.len(),
            "Found candidate positions"
        );
        Ok(self.classify(&reduced, image))
    }

    /// Classify reduced display-space points into four handles.
    ///
    /// Never fails: every corner without a usable, non-overlapping candidate
    /// takes the matching bounding-box corner.
    pub fn classify(&self, points: &[Position], image: &RasterImage) -> CornerDetection {
        let rect = image.display_rect();

        if count_distinct(points) < 4 {
            debug!(
                points = points.len(),
                "Too few feature points; keeping bounding box"
            );
            return CornerDetection::bounding_box(
                &rect,
                CornerOutcome::InsufficientFeaturePoints,
            );
        }

        let mut nearest: [Option<FeaturePoint>; 4] = [None; 4];
        let mut extreme: [Option<FeaturePoint>; 4] = [None; 4];
        let mut plausible_points = 0;

        for pos in points {
            if let Some(threshold) = self.plausibility_threshold
                && !is_possible_page_corner(image, pos, self.hit_radius, threshold)
            {
                continue;
            }
            plausible_points += 1;
            let point = FeaturePoint::new(*pos, &rect);

            for corner in Corner::ALL {
                let i = corner.index();
                // Method A: nearest to the bounding-box corner.
                if nearest[i].is_none_or(|cur| point.corner_dist[i] < cur.corner_dist[i]) {
                    nearest[i] = Some(point);
                }
                // Method B: most extreme along both axes.
                if extreme[i].is_none_or(|cur| is_more_extreme(corner, &point.pos, &cur.pos)) {
                    extreme[i] = Some(point);
                }
            }
        }

        let mut chosen: [Option<Position>; 4] = [None; 4];
        for corner in Corner::ALL {
            let i = corner.index();
            chosen[i] = match (nearest[i], extreme[i]) {
                (Some(a), Some(b)) => {
                    let edge = reconciliation_edge(corner);
                    let closer_to_edge = b.edge_dist[edge] < a.edge_dist[edge];
                    let agree = (b.corner_dist[i] - a.corner_dist[i]).abs() < CORNER_EPSILON;
                    if closer_to_edge && agree {
                        debug!(
                            corner = corner.label(),
                            pos = ?b.pos,
                            "Preferring extreme-point candidate"
                        );
                        Some(b.pos)
                    } else {
                        Some(a.pos)
                    }
                }
                (a, _) => a.map(|p| p.pos),
            };
        }

        let (handles, fell_back) = self.resolve_collisions(chosen, &rect);
        debug!(?handles, ?fell_back, plausible_points, "Corners classified");
        CornerDetection {
            handles: QuadSelection::new(handles),
            outcome: CornerOutcome::Detected,
            fell_back,
            plausible_points,
        }
    }

    /// Replace missing, overlapping or negative candidates with bounding-box
    /// corners.
    fn resolve_collisions(
        &self,
        chosen: [Option<Position>; 4],
        rect: &DisplayRect,
    ) -> ([Position; 4], [bool; 4]) {
        let corners = rect.corners();
        let mut handles: [Option<Position>; 4] = chosen;
        let mut fell_back = [false; 4];
        let radius = self.hit_radius;

        let overlaps_other = |handles: &[Option<Position>; 4], i: usize| {
            let Some(me) = handles[i] else { return false };
            handles
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.is_some_and(|o| positions_overlap(&me, &o, radius)))
        };

        // First pass in handle order; later corners see earlier replacements.
        for i in 0..4 {
            if handles[i].is_none() || overlaps_other(&handles, i) {
                handles[i] = Some(corners[i]);
                fell_back[i] = true;
            }
        }

        for i in 0..4 {
            if handles[i].is_some_and(|p| p.is_below_zero()) {
                handles[i] = Some(corners[i]);
                fell_back[i] = true;
            }
        }

        // A replacement may now overlap a candidate accepted earlier.
        loop {
            let mut changed = false;
            for i in 0..4 {
                if !fell_back[i] && overlaps_other(&handles, i) {
                    handles[i] = Some(corners[i]);
                    fell_back[i] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let resolved = std::array::from_fn(|i| handles[i].unwrap_or(corners[i]));
        (resolved, fell_back)
    }
}

fn count_distinct(points: &[Position]) -> usize {
    let mut distinct: Vec<Position> = Vec::with_capacity(4);
    for p in points {
        if !distinct.contains(p) {
            distinct.push(*p);
            if distinct.len() >= 4 {
                break;
            }
        }
    }
    distinct.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::detector::SuppliedPoints;
    use image::{Rgba, RgbaImage};

    fn blank(w: u32, h: u32) -> RasterImage {
        RasterImage::from_rgba(RgbaImage::from_pixel(w, h, Rgba([90, 90, 90, 255])))
    }

    fn bbox(w: f64, h: f64) -> [Position; 4] {
        [
            Position::new(0.0, 0.0),
            Position::new(w, 0.0),
            Position::new(w, h),
            Position::new(0.0, h),
        ]
    }

    fn pts(coords: &[(f64, f64)]) -> Vec<Position> {
        coords.iter().map(|&(x, y)| Position::new(x, y)).collect()
    }

    fn assert_invariants(detection: &CornerDetection, radius: f64) {
        let handles = detection.handles.handles();
        for (i, a) in handles.iter().enumerate() {
            assert!(!a.is_below_zero(), "negative handle {a:?}");
            for b in handles.iter().skip(i + 1) {
                assert!(!positions_overlap(a, b, radius), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn no_points_keeps_bounding_box() {
        let image = blank(400, 300);
        let detection = CornerClassifier::new(15.0, None).classify(&[], &image);
        assert_eq!(detection.outcome, CornerOutcome::InsufficientFeaturePoints);
        assert_eq!(detection.handles.handles(), &bbox(400.0, 300.0));
    }

    /// A single point repeated many times never moves the handles.
    #[test]
    fn single_repeated_point_keeps_bounding_box() {
        let image = blank(400, 300);
        let raw: Vec<f32> = std::iter::repeat_n([200.0f32, 10.0], 50).flatten().collect();
        let detector = SuppliedPoints::new(raw);
        let detection = CornerClassifier::new(15.0, None)
            .locate(&image, Some(&detector))
            .unwrap();
        assert_eq!(detection.handles.handles(), &bbox(400.0, 300.0));
        assert_eq!(detection.outcome, CornerOutcome::InsufficientFeaturePoints);
    }

    #[test]
    fn no_detector_means_disabled() {
        let image = blank(100, 100);
        let detection = CornerClassifier::new(15.0, None).locate(&image, None).unwrap();
        assert_eq!(detection.outcome, CornerOutcome::Disabled);
        assert_eq!(detection.handles.handles(), &bbox(100.0, 100.0));
    }

    #[test]
    fn picks_points_nearest_each_corner() {
        let image = blank(400, 300);
        let points = pts(&[(40.0, 30.0), (360.0, 25.0), (370.0, 280.0), (35.0, 270.0), (200.0, 150.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_eq!(detection.outcome, CornerOutcome::Detected);
        assert_eq!(
            detection.handles.handles(),
            &[
                Position::new(40.0, 30.0),
                Position::new(360.0, 25.0),
                Position::new(370.0, 280.0),
                Position::new(35.0, 270.0),
            ]
        );
        assert_eq!(detection.fell_back, [false; 4]);
    }

    /// The extreme-point candidate wins when it hugs the top edge and its
    /// corner distance is within the epsilon of the nearest candidate.
    #[test]
    fn reconciliation_prefers_edge_hugging_candidate() {
        let image = blank(400, 300);
        let points = pts(&[(30.0, 2.0), (20.0, 20.0), (395.0, 5.0), (395.0, 295.0), (5.0, 295.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_eq!(detection.handles.get(Corner::TopLeft), Position::new(30.0, 2.0));
    }

    #[test]
    fn reconciliation_respects_epsilon() {
        let image = blank(400, 300);
        let points = pts(&[(60.0, 1.0), (20.0, 20.0), (395.0, 5.0), (395.0, 295.0), (5.0, 295.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_eq!(detection.handles.get(Corner::TopLeft), Position::new(20.0, 20.0));
    }

    /// Top-right is reconciled against the top edge.
    #[test]
    fn reconciliation_top_right_uses_top_edge() {
        let image = blank(400, 300);
        let points = pts(&[(370.0, 2.0), (380.0, 20.0), (5.0, 5.0), (395.0, 295.0), (5.0, 295.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_eq!(detection.handles.get(Corner::TopRight), Position::new(370.0, 2.0));
        assert_eq!(detection.handles.get(Corner::TopLeft), Position::new(5.0, 5.0));
        assert_eq!(detection.fell_back, [false; 4]);
    }

    #[test]
    fn reconciliation_bottom_right_uses_right_edge() {
        let image = blank(400, 300);
        let points = pts(&[(398.0, 270.0), (380.0, 280.0), (5.0, 5.0), (395.0, 5.0), (5.0, 295.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_eq!(detection.handles.get(Corner::BottomRight), Position::new(398.0, 270.0));
        assert_eq!(detection.handles.get(Corner::TopRight), Position::new(395.0, 5.0));
        assert_eq!(detection.fell_back, [false; 4]);
    }

    #[test]
    fn reconciliation_bottom_left_uses_left_edge() {
        let image = blank(400, 300);
        let points = pts(&[(2.0, 270.0), (20.0, 280.0), (5.0, 5.0), (395.0, 5.0), (395.0, 295.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_eq!(detection.handles.get(Corner::BottomLeft), Position::new(2.0, 270.0));
        assert_eq!(detection.handles.get(Corner::TopLeft), Position::new(5.0, 5.0));
        assert_eq!(detection.fell_back, [false; 4]);
    }

    /// The corner-distance gap must be strictly below the epsilon: 14 passes,
    /// exactly 15 does not.
    #[test]
    fn reconciliation_epsilon_is_strict() {
        let image = blank(400, 300);
        let classifier = CornerClassifier::new(15.0, None);
        let others = [(395.0, 5.0), (395.0, 295.0), (5.0, 295.0)];

        // (24, 0) is 24 from the corner, (6, 8) is 10.
        let mut coords = vec![(24.0, 0.0), (6.0, 8.0)];
        coords.extend(others);
        let detection = classifier.classify(&pts(&coords), &image);
        assert_eq!(detection.handles.get(Corner::TopLeft), Position::new(24.0, 0.0));

        // (24, 7) is 25 from the corner.
        let mut coords = vec![(24.0, 7.0), (6.0, 8.0)];
        coords.extend(others);
        let detection = classifier.classify(&pts(&coords), &image);
        assert_eq!(detection.handles.get(Corner::TopLeft), Position::new(6.0, 8.0));
    }

    #[test]
    fn negative_candidate_falls_back_to_corner() {
        let image = blank(400, 300);
        let points = pts(&[(-5.0, -5.0), (395.0, 5.0), (395.0, 295.0), (5.0, 295.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_eq!(detection.outcome, CornerOutcome::Detected);
        assert_eq!(
            detection.handles.handles(),
            &[
                Position::new(0.0, 0.0),
                Position::new(395.0, 5.0),
                Position::new(395.0, 295.0),
                Position::new(5.0, 295.0),
            ]
        );
        assert_eq!(detection.fell_back, [true, false, false, false]);
        assert_invariants(&detection, 15.0);
    }

    /// A tight cluster makes every candidate collide; all corners fall back.
    #[test]
    fn clustered_points_fall_back_without_overlap() {
        let image = blank(400, 300);
        let points = pts(&[(390.0, 5.0), (392.0, 6.0), (394.0, 7.0), (396.0, 8.0)]);
        let detection = CornerClassifier::new(15.0, None).classify(&points, &image);
        assert_invariants(&detection, 15.0);
        assert_eq!(detection.handles.get(Corner::TopLeft), Position::new(0.0, 0.0));
        assert_eq!(detection.handles.get(Corner::BottomRight), Position::new(400.0, 300.0));
    }

    /// Deterministic pseudo-random clouds never break the handle invariants.
    #[test]
    fn invariants_hold_for_many_clouds() {
        let image = blank(400, 300);
        let classifier = CornerClassifier::new(15.0, None);
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as f64 / (1u64 << 31) as f64
        };
        for round in 0..200 {
            let count = 4 + round % 20;
            let points: Vec<Position> = (0..count)
                .map(|_| Position::new(next() * 400.0, next() * 300.0))
                .collect();
            let detection = classifier.classify(&points, &image);
            assert_invariants(&detection, 15.0);
        }
    }

    #[test]
    fn plausibility_accepts_page_corner_and_rejects_flat_area() {
        let image = RasterImage::from_rgba(RgbaImage::from_fn(80, 80, |x, y| {
            if (20..60).contains(&x) && (20..60).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }));
        assert!(is_possible_page_corner(&image, &Position::new(20.0, 20.0), 15.0, 75));
        assert!(!is_possible_page_corner(&image, &Position::new(40.0, 40.0), 15.0, 75));
    }

    /// Implausible points are discarded before classification.
    #[test]
    fn plausibility_filter_drops_flat_points() {
        let image = blank(400, 300);
        let points = pts(&[(40.0, 30.0), (360.0, 25.0), (370.0, 280.0), (35.0, 270.0)]);
        let detection = CornerClassifier::new(15.0, Some(75)).classify(&points, &image);
        assert_eq!(detection.plausible_points, 0);
        assert_eq!(detection.handles.handles(), &bbox(400.0, 300.0));
        assert_eq!(detection.fell_back, [true; 4]);
    }
}
