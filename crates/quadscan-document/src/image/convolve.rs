// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spatial convolution over an interleaved RGBA float buffer.

use quadscan_core::error::{QuadscanError, Result};

/// A square convolution kernel with an odd side length.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    side: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build a kernel from row-major weights. The weight count must be the
    /// square of an odd number.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        let side = (weights.len() as f64).sqrt().round() as usize;
        if side == 0 || side % 2 == 0 || side * side != weights.len() {
            return Err(QuadscanError::InvalidConfig(format!(
                "kernel needs an odd square number of weights, got {}",
                weights.len()
            )));
        }
        Ok(Self { side, weights })
    }

    fn from_3x3(weights: [f64; 9]) -> Self {
        Self {
            side: 3,
            weights: weights.to_vec(),
        }
    }

    /// 3x3 box blur with every weight offset by `offset`.
    pub fn box_blur(offset: f64) -> Self {
        Self::from_3x3([1.0 / 9.0 + offset; 9])
    }

    /// 3x3 unsharp mask with every weight offset by `offset`.
    pub fn sharpen(offset: f64) -> Self {
        Self::from_3x3(
            [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0].map(|w| w + offset),
        )
    }

    /// Horizontal derivative (responds to vertical edges).
    pub fn sobel_vertical() -> Self {
        Self::from_3x3([-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0])
    }

    /// Vertical derivative (responds to horizontal edges).
    pub fn sobel_horizontal() -> Self {
        Self::from_3x3([-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0])
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Convolve every channel of `src` (interleaved RGBA, `width` x `height`)
/// with `kernel`, returning a new buffer.
///
/// Taps that fall outside the image contribute nothing, so border pixels
/// darken under kernels whose weights sum to one. With `opaque` the output
/// alpha is forced to 255; otherwise alpha is convolved like the colours.
pub fn convolve(src: &[f64], width: usize, height: usize, kernel: &Kernel, opaque: bool) -> Vec<f64> {
    let side = kernel.side as isize;
    let half = side / 2;
    let (w, h) = (width as isize, height as isize);
    let mut dst = vec![0.0; src.len()];

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f64; 4];
            for ky in 0..side {
                let sy = y + ky - half;
                if sy < 0 || sy >= h {
                    continue;
                }
                for kx in 0..side {
                    let sx = x + kx - half;
                    if sx < 0 || sx >= w {
                        continue;
                    }
                    let weight = kernel.weights[(ky * side + kx) as usize];
                    let offset = ((sy * w + sx) * 4) as usize;
                    for (c, slot) in acc.iter_mut().enumerate() {
                        *slot += src[offset + c] * weight;
                    }
                }
            }

            let out = ((y * w + x) * 4) as usize;
            dst[out..out + 3].copy_from_slice(&acc[..3]);
            dst[out + 3] = if opaque { 255.0 } else { acc[3] };
        }
    }
    dst
}
