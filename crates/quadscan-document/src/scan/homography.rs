// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar homography — solve the 3x3 projective map between two quadrilaterals
// and apply or invert it.

use quadscan_core::Position;

const SINGULAR_EPS: f64 = 1e-12;

/// A 3x3 projective transform, row-major, normalised so `m[8] == 1` when
/// solved from point pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: [f64; 9],
}

impl Homography {
    pub const IDENTITY: Homography = Homography {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    pub fn matrix(&self) -> &[f64; 9] {
        &self.m
    }

    /// Solve the homography mapping each `from[i]` onto `to[i]`.
    ///
    /// Sets up the usual 8x8 linear system (with `h33 = 1`) and solves it by
    /// Gauss-Jordan elimination with partial pivoting. Returns `None` when
    /// the system is singular, e.g. three collinear points.
    pub fn from_point_pairs(from: &[Position; 4], to: &[Position; 4]) -> Option<Self> {
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (sx, sy) = (from[i].x, from[i].y);
            let (dx, dy) = (to[i].x, to[i].y);
            a[2 * i] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -sx * dx, -sy * dx, dx];
            a[2 * i + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -sx * dy, -sy * dy, dy];
        }

        for col in 0..8 {
            let pivot_row = (col..8)
                .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
            if a[pivot_row][col].abs() < SINGULAR_EPS {
                return None;
            }
            a.swap(col, pivot_row);

            let pivot = a[col][col];
            for k in col..9 {
                a[col][k] /= pivot;
            }
            for row in 0..8 {
                if row == col {
                    continue;
                }
                let factor = a[row][col];
                if factor == 0.0 {
                    continue;
                }
                for k in col..9 {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }

        let mut m = [0.0; 9];
        for (i, row) in a.iter().enumerate() {
            m[i] = row[8];
        }
        m[8] = 1.0;
        Some(Self { m })
    }

    /// Inverse transform via the adjugate. `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let [a, b, c, d, e, f, g, h, i] = self.m;
        let co_a = e * i - f * h;
        let co_b = -(d * i - f * g);
        let co_c = d * h - e * g;
        let det = a * co_a + b * co_b + c * co_c;
        if !det.is_finite() || det.abs() < SINGULAR_EPS {
            return None;
        }
        let inv = [
            co_a / det,
            -(b * i - c * h) / det,
            (b * f - c * e) / det,
            co_b / det,
            (a * i - c * g) / det,
            -(a * f - c * d) / det,
            co_c / det,
            -(a * h - b * g) / det,
            (a * e - b * d) / det,
        ];
        // Normalise so the bottom-right element is 1 where possible.
        let scale = if inv[8].abs() > SINGULAR_EPS { inv[8] } else { 1.0 };
        Some(Self {
            m: inv.map(|v| v / scale),
        })
    }

    /// Map `(x, y)` through the transform. `None` when the point lands on the
    /// line at infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.m;
        let w = m[6] * x + m[7] * y + m[8];
        if !w.is_finite() || w.abs() < SINGULAR_EPS {
            return None;
        }
        let px = (m[0] * x + m[1] * y + m[2]) / w;
        let py = (m[3] * x + m[4] * y + m[5]) / w;
        (px.is_finite() && py.is_finite()).then_some((px, py))
    }

    pub fn map(&self, pos: &Position) -> Option<Position> {
        self.apply(pos.x, pos.y).map(|(x, y)| Position::new(x, y))
    }
}
