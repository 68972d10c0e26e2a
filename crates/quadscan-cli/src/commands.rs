// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations — drive an EditorSession from parsed arguments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use quadscan_core::config::{CornerDetectionMethod, DEFAULT_FAST_THRESHOLD, EditorConfig};
use quadscan_core::{Corner, FilterParam, Position};
use quadscan_document::image::processor::{open_image, save_image};
use quadscan_document::{CornerDetection, CornerOutcome, EditorSession, ImageProcessor};
use serde::Serialize;
use tracing::info;

use crate::{DetectMethod, Effect, LoadArgs};

pub struct ProcessOptions {
    pub load: LoadArgs,
    pub output: PathBuf,
    pub corners: Option<[f64; 8]>,
    pub no_crop: bool,
    pub rotate: u16,
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
    pub saturation: Option<f64>,
    pub sharpness: Option<f64>,
    pub auto: bool,
    pub threshold: Option<f64>,
    pub effect: Option<Effect>,
}

fn editor_config(load: &LoadArgs) -> Result<EditorConfig> {
    let mut config = match &load.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let threshold = load.fast_threshold.unwrap_or(match config.corner_detection {
        CornerDetectionMethod::Fast9 { threshold } | CornerDetectionMethod::Fast12 { threshold } => {
            threshold
        }
        CornerDetectionMethod::None => DEFAULT_FAST_THRESHOLD,
    });
    config.corner_detection = match load.detect {
        Some(DetectMethod::None) => CornerDetectionMethod::None,
        Some(DetectMethod::Fast9) => CornerDetectionMethod::Fast9 { threshold },
        Some(DetectMethod::Fast12) => CornerDetectionMethod::Fast12 { threshold },
        None => match config.corner_detection {
            CornerDetectionMethod::Fast9 { .. } => CornerDetectionMethod::Fast9 { threshold },
            CornerDetectionMethod::Fast12 { .. } => CornerDetectionMethod::Fast12 { threshold },
            CornerDetectionMethod::None => CornerDetectionMethod::None,
        },
    };
    Ok(config)
}

/// Open the input and load it into a fresh session.
fn open_session(load: &LoadArgs) -> Result<(EditorSession, CornerDetection)> {
    let config = editor_config(load)?;
    let (width, height) = load.surface;
    let session = EditorSession::new(config, width, height).context("creating editor session")?;
    let image = open_image(&load.input)
        .with_context(|| format!("reading {}", load.input.display()))?;
    let detection = session.load(image).context("placing corner handles")?;
    Ok((session, detection))
}

pub fn process(opts: ProcessOptions) -> Result<()> {
    let (session, detection) = open_session(&opts.load)?;
    info!(outcome = ?detection.outcome, "Corners placed");

    if let Some(c) = opts.corners {
        session.set_source_handles([
            Position::new(c[0], c[1]),
            Position::new(c[2], c[3]),
            Position::new(c[4], c[5]),
            Position::new(c[6], c[7]),
        ])?;
    }

    if !opts.no_crop {
        session.crop().context("cropping the selection")?;
    }
    for _ in 0..opts.rotate / 90 {
        session.rotate_right()?;
    }

    let manual = [
        (FilterParam::Brightness, opts.brightness),
        (FilterParam::Contrast, opts.contrast),
        (FilterParam::Saturation, opts.saturation),
        (FilterParam::Sharpness, opts.sharpness),
    ];
    for (param, value) in manual {
        if let Some(value) = value {
            session.set_filter(param, value)?;
        }
    }
    if opts.auto {
        let filters = session.auto_improve()?;
        info!(?filters, "Auto-improve");
    }

    let mut result = session.export().context("rendering the result")?;
    if opts.threshold.is_some() || opts.effect.is_some() {
        let mut processor = ImageProcessor::from_raster(&result);
        processor = match opts.effect {
            Some(Effect::Grayscale) => processor.grayscale(),
            Some(Effect::Sobel) => processor.sobel(),
            None => processor,
        };
        if let Some(threshold) = opts.threshold {
            processor = processor.threshold(threshold);
        }
        result = processor.into_raster();
    }

    save_image(&result, &opts.output)
        .with_context(|| format!("writing {}", opts.output.display()))?;
    info!(
        path = %opts.output.display(),
        width = result.width(),
        height = result.height(),
        "Result written"
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct CornerReport {
    corner: &'static str,
    x: f64,
    y: f64,
    fallback: bool,
}

#[derive(Debug, Serialize)]
struct DetectReport {
    outcome: CornerOutcome,
    plausible_points: usize,
    /// Source pixel coordinates, TL, TR, BR, BL.
    corners: Vec<CornerReport>,
}

pub fn detect(load: &LoadArgs) -> Result<()> {
    let (session, detection) = open_session(load)?;
    let source = session.source_handles()?;
    let report = DetectReport {
        outcome: detection.outcome,
        plausible_points: detection.plausible_points,
        corners: Corner::ALL
            .iter()
            .map(|&corner| {
                let pos = source[corner.index()];
                CornerReport {
                    corner: corner.label(),
                    x: pos.x,
                    y: pos.y,
                    fallback: detection.fell_back[corner.index()],
                }
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
