// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// quadscan-document — Document capture pipeline for Quadscan.
//
// Provides feature point detection and reduction, page corner classification,
// perspective dewarping, the pixel filter pipeline with its auto-enhance
// estimators, and the editor session that ties them together.

pub mod editor;
pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `quadscan_document::EditorSession` etc.
pub use editor::session::{EditorSession, OperationGuard};
pub use self::image::estimate::AutoEnhance;
pub use self::image::processor::ImageProcessor;
pub use scan::corners::{CornerClassifier, CornerDetection, CornerOutcome};
pub use scan::detector::{FastDetector, PointDetector, SuppliedPoints, detector_for};
pub use scan::dewarp::DewarpEngine;
