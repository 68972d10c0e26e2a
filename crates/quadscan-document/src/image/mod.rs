// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — filter pipeline, convolution, auto-enhance estimators,
// rotation and file I/O.

pub mod convolve;
pub mod estimate;
pub mod processor;

pub use processor::ImageProcessor;
