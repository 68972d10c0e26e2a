// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry primitives — positions, distances, the square hit-test, angles,
// and the display rectangle an image occupies on the drawing surface.

use serde::{Deserialize, Serialize};

/// A point in either display-surface or image-local coordinates.
///
/// The coordinate space is not tracked by the type; callers are responsible
/// for never mixing the two.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Strictly smaller on both axes.
    pub fn is_smaller_than(&self, other: &Position) -> bool {
        self.x < other.x && self.y < other.y
    }

    /// Strictly greater on both axes.
    pub fn is_greater_than(&self, other: &Position) -> bool {
        self.x > other.x && self.y > other.y
    }

    /// True when either coordinate is negative.
    pub fn is_below_zero(&self) -> bool {
        self.x < 0.0 || self.y < 0.0
    }

    /// Angle in degrees, in `[0, 360)`, of the vector from `self` to `other`.
    pub fn angle_between(&self, other: &Position) -> f64 {
        two_points_angle(self, other)
    }

    /// Translate by `(-origin.x, -origin.y)`.
    pub fn relative_to(&self, origin: &Position) -> Position {
        Position::new(self.x - origin.x, self.y - origin.y)
    }

    pub fn offset_by(&self, origin: &Position) -> Position {
        Position::new(self.x + origin.x, self.y + origin.y)
    }

    pub fn scaled(&self, factor: f64) -> Position {
        Position::new(self.x * factor, self.y * factor)
    }
}

/// Euclidean distance between two positions.
pub fn distance(a: &Position, b: &Position) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Square hit-test: true iff `(x1, y1)` lies within `radius` of `(x2, y2)` on
/// both axes (inclusive).
pub fn overlaps(x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> bool {
    x1 >= x2 - radius && x1 <= x2 + radius && y1 >= y2 - radius && y1 <= y2 + radius
}

/// [`overlaps`] for two positions.
pub fn positions_overlap(a: &Position, b: &Position, radius: f64) -> bool {
    overlaps(a.x, a.y, b.x, b.y, radius)
}

/// Angle of the vector `a -> b` in degrees, normalised to `[0, 360)`.
///
/// Measured with `atan2(dx, dy)`, i.e. clockwise from the +y axis.
pub fn two_points_angle(a: &Position, b: &Position) -> f64 {
    (b.x - a.x).atan2(b.y - a.y).to_degrees().rem_euclid(360.0)
}

/// Angle in degrees at vertex `b` of the triangle `a, b, c`.
///
/// Returns 0 when either arm has zero length.
pub fn three_points_angle(a: &Position, b: &Position, c: &Position) -> f64 {
    let ab = distance(a, b);
    let bc = distance(b, c);
    let ac = distance(a, c);
    if ab == 0.0 || bc == 0.0 {
        return 0.0;
    }
    let cosine = (bc * bc + ab * ab - ac * ac) / (2.0 * bc * ab);
    cosine.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Axis-aligned rectangle on the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub origin: Position,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(origin: Position, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.origin.x
    }

    pub fn top(&self) -> f64 {
        self.origin.y
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.height
    }

    pub fn top_left(&self) -> Position {
        Position::new(self.left(), self.top())
    }

    pub fn top_right(&self) -> Position {
        Position::new(self.right(), self.top())
    }

    pub fn bottom_right(&self) -> Position {
        Position::new(self.right(), self.bottom())
    }

    pub fn bottom_left(&self) -> Position {
        Position::new(self.left(), self.bottom())
    }

    /// Corners in handle order: TL, TR, BR, BL.
    pub fn corners(&self) -> [Position; 4] {
        [
            self.top_left(),
            self.top_right(),
            self.bottom_right(),
            self.bottom_left(),
        ]
    }

    /// Perpendicular projections of `pos` onto the top, left, right and bottom
    /// edge lines, in that order.
    pub fn edge_projections(&self, pos: &Position) -> [Position; 4] {
        [
            Position::new(pos.x, self.top()),
            Position::new(self.left(), pos.y),
            Position::new(self.right(), pos.y),
            Position::new(pos.x, self.bottom()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_zero_for_same_point_and_symmetric() {
        let a = Position::new(3.0, 4.0);
        let b = Position::new(-2.5, 10.0);
        assert_eq!(distance(&a, &a), 0.0);
        assert_eq!(distance(&a, &b), distance(&b, &a));
        assert_eq!(distance(&Position::new(0.0, 0.0), &Position::new(3.0, 4.0)), 5.0);
    }

    /// The hit-test is a square, so a diagonal offset inside the square but
    /// outside the inscribed circle still overlaps.
    #[test]
    fn overlaps_is_a_square_test() {
        assert!(overlaps(10.0, 10.0, 0.0, 0.0, 10.0));
        assert!(overlaps(-10.0, 10.0, 0.0, 0.0, 10.0));
        assert!(!overlaps(10.5, 0.0, 0.0, 0.0, 10.0));
        assert!(!overlaps(0.0, -10.5, 0.0, 0.0, 10.0));
    }

    #[test]
    fn ordering_comparisons_are_strict_on_both_axes() {
        let a = Position::new(1.0, 1.0);
        let b = Position::new(2.0, 2.0);
        assert!(a.is_smaller_than(&b));
        assert!(b.is_greater_than(&a));
        assert!(!a.is_smaller_than(&Position::new(2.0, 1.0)));
        assert!(Position::new(-1.0, 5.0).is_below_zero());
        assert!(!a.is_below_zero());
    }

    #[test]
    fn two_points_angle_is_normalised() {
        let origin = Position::new(0.0, 0.0);
        assert!((origin.angle_between(&Position::new(0.0, 1.0)) - 0.0).abs() < 1e-9);
        assert!((origin.angle_between(&Position::new(1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((origin.angle_between(&Position::new(-1.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn three_points_right_angle() {
        let a = Position::new(0.0, 10.0);
        let b = Position::new(0.0, 0.0);
        let c = Position::new(10.0, 0.0);
        assert!((three_points_angle(&a, &b, &c) - 90.0).abs() < 1e-9);
        assert_eq!(three_points_angle(&a, &a, &c), 0.0);
    }

    #[test]
    fn display_rect_corners_and_projections() {
        let rect = DisplayRect::new(Position::new(10.0, 20.0), 400.0, 300.0);
        assert_eq!(
            rect.corners(),
            [
                Position::new(10.0, 20.0),
                Position::new(410.0, 20.0),
                Position::new(410.0, 320.0),
                Position::new(10.0, 320.0),
            ]
        );
        let [top, left, right, bottom] = rect.edge_projections(&Position::new(50.0, 60.0));
        assert_eq!(top, Position::new(50.0, 20.0));
        assert_eq!(left, Position::new(10.0, 60.0));
        assert_eq!(right, Position::new(410.0, 60.0));
        assert_eq!(bottom, Position::new(50.0, 320.0));
    }
}
