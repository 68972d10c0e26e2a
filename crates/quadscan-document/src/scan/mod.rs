// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — feature point detection, point reduction, page corner
// classification, and perspective dewarping.

pub mod corners;
pub mod detector;
pub mod dewarp;
pub mod homography;
pub mod reduce;

pub use corners::{CornerClassifier, CornerDetection, CornerOutcome};
pub use dewarp::DewarpEngine;
