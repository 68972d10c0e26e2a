// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the quadscan-document crate: perspective dewarp,
// the filter pipeline and corner classification on synthetic images.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use quadscan_core::{FilterState, Position, QuadSelection, RasterImage};
use quadscan_document::{CornerClassifier, DewarpEngine, ImageProcessor, SuppliedPoints};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 400x300 photo-like image: a light page on a dark desk.
fn page_on_desk() -> RasterImage {
    RasterImage::from_rgba(RgbaImage::from_fn(400, 300, |x, y| {
        if (40..360).contains(&x) && (30..270).contains(&y) {
            Rgba([235, 230, 220, 255])
        } else {
            Rgba([40, 35, 30, 255])
        }
    }))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Dewarp a skewed quadrilateral with bilinear resampling.
fn bench_dewarp(c: &mut Criterion) {
    let image = page_on_desk();
    let handles = QuadSelection::new([
        Position::new(50.0, 25.0),
        Position::new(355.0, 40.0),
        Position::new(365.0, 275.0),
        Position::new(35.0, 265.0),
    ]);
    let engine = DewarpEngine::default();

    c.bench_function("dewarp bilinear (400x300)", |b| {
        b.iter(|| black_box(engine.dewarp(black_box(&image), &handles)));
    });
}

/// All four filter stages, including the sharpen convolution.
fn bench_filters(c: &mut Criterion) {
    let image = page_on_desk();
    let filters = FilterState {
        brightness: 12.0,
        contrast: 1.3,
        saturation: 1.2,
        sharpness: 40.0,
    };

    c.bench_function("filter pipeline (400x300)", |b| {
        b.iter(|| {
            let out = ImageProcessor::from_raster(black_box(&image))
                .apply_filters(&filters, false)
                .to_rgba();
            black_box(out);
        });
    });
}

/// Reduce and classify a dense, noisy point cloud.
fn bench_corner_classification(c: &mut Criterion) {
    let image = page_on_desk();
    let mut points = Vec::new();
    for i in 0..2000u32 {
        let x = ((i * 7919) % 400) as f32;
        let y = ((i * 104_729) % 300) as f32;
        points.extend_from_slice(&[x, y]);
    }
    let detector = SuppliedPoints::new(points);
    let classifier = CornerClassifier::new(15.0, Some(75));

    c.bench_function("corner classification (2000 points)", |b| {
        b.iter(|| black_box(classifier.locate(black_box(&image), Some(&detector))));
    });
}

criterion_group!(benches, bench_dewarp, bench_filters, bench_corner_classification);
criterion_main!(benches);
