// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Quadscan.

use thiserror::Error;

/// Top-level error type for all Quadscan operations.
#[derive(Debug, Error)]
pub enum QuadscanError {
    // -- Selection / geometry --
    /// The quadrilateral collapsed to a zero (or negative) sized rectangle.
    #[error("invalid selection: target rectangle would be {width}x{height}")]
    InvalidSelection { width: i64, height: i64 },

    #[error("handle index {0} out of range (expected 0..4)")]
    InvalidHandleIndex(usize),

    // -- Session preconditions --
    #[error("no source image loaded")]
    NoSourceImage,

    #[error("another operation is already in progress")]
    BusyRejected,

    // -- Buffers and images --
    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("corner detector failed: {0}")]
    Detector(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QuadscanError>;
