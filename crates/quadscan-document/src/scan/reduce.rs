// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feature point reducer — thin a dense detector point cloud to at most one
// point per handle-sized grid cell.

use quadscan_core::geometry::overlaps;
use quadscan_core::{DisplayRect, Position};
use tracing::debug;

/// Reduce raw detector output to one representative point per grid cell.
///
/// `points` is the flat `[x0, y0, x1, y1, ...]` cloud in image-local display
/// coordinates; a trailing unpaired value and non-finite pairs are ignored.
/// The display rectangle is cut into square cells of side `radius`, scanned
/// row-major. For every cell the first point (in detector order) that
/// square-overlaps the cell centre within `radius` is kept. Because the hit
/// square is wider than a cell, one point may be kept by neighbouring cells.
///
/// The returned positions are in display-surface coordinates, in cell scan
/// order.
pub fn reduce_points(points: &[f32], rect: &DisplayRect, radius: f64) -> Vec<Position> {
    if points.len() < 2 || radius <= 0.0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return Vec::new();
    }

    let candidates: Vec<Position> = points
        .chunks_exact(2)
        .filter(|pair| pair[0].is_finite() && pair[1].is_finite())
        .map(|pair| Position::new(pair[0] as f64, pair[1] as f64).offset_by(&rect.origin))
        .collect();

    let columns = (rect.width / radius).ceil() as usize;
    let rows = (rect.height / radius).ceil() as usize;
    let half = (radius / 2.0).round();

    let mut kept = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let center_x = rect.left() + radius * column as f64 + half;
            let center_y = rect.top() + radius * row as f64 + half;

            if let Some(first) = candidates
                .iter()
                .find(|p| overlaps(p.x, p.y, center_x, center_y, radius))
            {
                kept.push(*first);
            }
        }
    }

    debug!(
        kept = kept.len(),
        raw = candidates.len(),
        columns,
        rows,
        "Feature points reduced"
    );
    kept
}
