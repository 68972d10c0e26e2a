// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadscan — Core types, geometry and colour primitives, configuration, and
// error definitions shared across all crates.

pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod human_errors;
pub mod types;

pub use color::{ColorSample, color_distance};
pub use config::{CornerDetectionMethod, EditorConfig, FillMode, Interpolation};
pub use error::{QuadscanError, Result};
pub use geometry::{DisplayRect, Position, distance, overlaps};
pub use types::*;
