// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadscan — rectify and enhance photographed documents.
//
// Entry point. Initialises logging, parses the command line and reports
// failures in plain language.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use quadscan_core::QuadscanError;
use quadscan_core::human_errors::humanize_error;

#[derive(Parser)]
#[command(name = "quadscan")]
#[command(version, about = "Detect, dewarp and enhance photographed documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that loads a photo.
#[derive(clap::Args, Debug, Clone)]
pub struct LoadArgs {
    /// Input photo
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Editor configuration (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Corner detection method (overrides the configuration)
    #[arg(short, long, value_enum)]
    pub detect: Option<DetectMethod>,

    /// FAST intensity threshold
    #[arg(long, value_name = "N")]
    pub fast_threshold: Option<u8>,

    /// Display surface the photo is fitted to, WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", default_value = "1280x960", value_parser = parse_surface)]
    pub surface: (f64, f64),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMethod {
    None,
    Fast9,
    Fast12,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Grayscale,
    Sobel,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop, dewarp and filter a photo
    Process {
        #[command(flatten)]
        load: LoadArgs,

        /// Output file; the format follows the extension
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Corners in source pixels, TL,TR,BR,BL as x,y pairs (8 numbers)
        #[arg(long, value_name = "X,Y,...", value_parser = parse_corners)]
        corners: Option<[f64; 8]>,

        /// Skip the crop and filter the whole photo
        #[arg(long)]
        no_crop: bool,

        /// Clockwise rotation applied to the result (0, 90, 180, 270)
        #[arg(long, value_name = "DEGREES", default_value_t = 0, value_parser = parse_rotation)]
        rotate: u16,

        /// Brightness offset added to every channel
        #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
        brightness: Option<f64>,

        /// Contrast factor around mid grey (1.0 = no change)
        #[arg(long, value_name = "FLOAT")]
        contrast: Option<f64>,

        /// Saturation factor (1.0 = no change)
        #[arg(long, value_name = "FLOAT")]
        saturation: Option<f64>,

        /// Sharpness (negative blurs, positive sharpens)
        #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
        sharpness: Option<f64>,

        /// Estimate brightness, contrast and saturation from the image
        #[arg(long)]
        auto: bool,

        /// Black-and-white threshold on luma, applied last
        #[arg(long, value_name = "LUMA")]
        threshold: Option<f64>,

        /// Extra effect applied last
        #[arg(long, value_enum)]
        effect: Option<Effect>,
    },

    /// Print the detected corners as JSON
    Detect {
        #[command(flatten)]
        load: LoadArgs,
    },
}

fn parse_surface(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n > 0.0)
            .ok_or_else(|| format!("invalid surface dimension '{v}'"))
    };
    Ok((parse(w)?, parse(h)?))
}

fn parse_corners(s: &str) -> Result<[f64; 8], String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<_, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected 8 numbers, got {}", v.len()))
}

fn parse_rotation(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(d @ (0 | 90 | 180 | 270)) => Ok(d),
        _ => Err(format!("rotation must be 0, 90, 180 or 270, got '{s}'")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Process {
            load,
            output,
            corners,
            no_crop,
            rotate,
            brightness,
            contrast,
            saturation,
            sharpness,
            auto,
            threshold,
            effect,
        } => commands::process(commands::ProcessOptions {
            load,
            output,
            corners,
            no_crop,
            rotate,
            brightness,
            contrast,
            saturation,
            sharpness,
            auto,
            threshold,
            effect,
        }),
        Commands::Detect { load } => commands::detect(&load),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Print an error, with a suggestion when it comes from the library.
fn report(err: &anyhow::Error) {
    eprintln!("error: {err:#}");
    if let Some(inner) = err.chain().find_map(|e| e.downcast_ref::<QuadscanError>()) {
        let human = humanize_error(inner);
        eprintln!("  {}", human.message);
        eprintln!("  hint: {}", human.suggestion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn surface_parsing() {
        assert_eq!(parse_surface("800x600").unwrap(), (800.0, 600.0));
        assert!(parse_surface("800").is_err());
        assert!(parse_surface("0x600").is_err());
    }

    #[test]
    fn corner_parsing() {
        let c = parse_corners("0,0,10,0,10,10,0,10").unwrap();
        assert_eq!(c[4], 10.0);
        assert!(parse_corners("1,2,3").is_err());
        assert!(parse_corners("a,b").is_err());
    }

    #[test]
    fn rotation_parsing() {
        assert_eq!(parse_rotation("270").unwrap(), 270);
        assert!(parse_rotation("45").is_err());
        assert!(parse_rotation("360").is_err());
    }

    #[test]
    fn process_arguments() {
        let cli = Cli::try_parse_from([
            "quadscan", "process", "in.jpg", "-o", "out.png", "--detect", "none",
            "--brightness", "-12", "--rotate", "90", "--auto",
        ])
        .unwrap();
        match cli.command {
            Commands::Process { load, brightness, rotate, auto, .. } => {
                assert_eq!(load.detect, Some(DetectMethod::None));
                assert_eq!(brightness, Some(-12.0));
                assert_eq!(rotate, 90);
                assert!(auto);
            }
            Commands::Detect { .. } => panic!("expected process"),
        }
    }
}
