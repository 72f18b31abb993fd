//! cropseg: run a prompt script through a segmentation session.
//!
//! Loads an image, replays a JSON list of prompts against the in-process
//! threshold engine, and reports the resulting masks together with the
//! session's re-encoding diagnostics. Useful for:
//!
//! - Tuning the re-encoding thresholds on real images
//! - Checking how often a sequence of prompts forces a re-encode
//! - Producing a 16-bit label image from a batch of prompts
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cropseg -- [OPTIONS] <IMAGE_PATH> <SCRIPT>
//! ```
//!
//! A script is a JSON array of steps:
//!
//! ```json
//! [
//!   "initialize",
//!   {"focus": {"x": 0, "y": 0, "width": 800, "height": 600}},
//!   {"points": {"positive": [{"x": 120, "y": 80}], "focus": {"x": 0, "y": 0, "width": 800, "height": 600}}},
//!   {"box": {"rect": {"x": 300, "y": 200, "width": 40, "height": 30}}},
//!   {"mask": {"path": "hint.png", "return_all": true}}
//! ]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cropseg_engine::{
    EngineConfig, MaskPrompt, Pixel, PointPrompt, Prompt, Rect, Session, SessionDiagnostics,
    SessionError, ThresholdEngine, ThresholdEngineConfig,
};
use cropseg_geometry::{Mask, Polygon, build_label};

/// Replay segmentation prompts over an image and report masks and
/// re-encoding diagnostics.
#[derive(Parser)]
#[command(name = "cropseg", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Path to the JSON prompt script.
    script: PathBuf,

    /// Luma threshold of the reference engine.
    #[arg(long, default_value_t = ThresholdEngineConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Treat dark pixels as foreground.
    #[arg(long)]
    invert: bool,

    /// Minimum margin around prompts, in pixels.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_ENCODE_MARGIN)]
    encode_margin: u32,

    /// Use the compact profile (tighter margins for small-input models).
    #[arg(long)]
    compact: bool,

    /// Simplification steps applied to every mask before output.
    #[arg(long, default_value_t = 0)]
    simplify: u32,

    /// Write a 16-bit label PNG to this path.
    #[arg(long)]
    label: Option<PathBuf>,

    /// Output the report as JSON instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Full engine config as a JSON string.
    ///
    /// When provided, `--encode-margin` and `--compact` are ignored.
    #[arg(long, conflicts_with = "config")]
    config_json: Option<String>,

    /// Full engine config as a JSON file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every re-encoding decision.
    #[arg(short, long)]
    verbose: bool,
}

/// One entry of a prompt script.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Step {
    /// Encode the whole image (or its centre).
    Initialize,
    /// Encode the given viewport.
    Focus(Rect),
    /// Click prompt, optionally restricted to a viewport.
    Points {
        positive: Vec<Pixel>,
        #[serde(default)]
        negative: Vec<Pixel>,
        #[serde(default)]
        focus: Option<Rect>,
        #[serde(default)]
        return_all: bool,
    },
    /// Box prompt.
    Box {
        rect: Rect,
        #[serde(default)]
        return_all: bool,
    },
    /// Mask prompt read from a grayscale image.
    Mask {
        path: PathBuf,
        #[serde(default)]
        return_all: bool,
    },
}

/// One output mask in the JSON report.
#[derive(Serialize)]
struct MaskReport {
    id: u64,
    step: usize,
    simplification_level: f64,
    area: u64,
    contour: Polygon,
    /// Foreground runs as `[start, length, ...]`.
    runs: Vec<u64>,
}

#[derive(Serialize)]
struct Report<'a> {
    image: String,
    width: u32,
    height: u32,
    masks: Vec<MaskReport>,
    diagnostics: &'a SessionDiagnostics,
}

/// Build an [`EngineConfig`] from CLI arguments.
///
/// `--config-json` and `--config` replace the individual flags entirely.
fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    if let Some(ref path) = cli.config {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        return serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()));
    }

    let base = if cli.compact {
        EngineConfig::compact()
    } else {
        EngineConfig::default()
    };
    Ok(EngineConfig {
        encode_margin: if cli.compact {
            base.encode_margin
        } else {
            cli.encode_margin
        },
        ..base
    })
}

fn parse_script(text: &str) -> Result<Vec<Step>, String> {
    serde_json::from_str(text).map_err(|e| format!("Error parsing script: {e}"))
}

fn load_mask(path: &Path) -> Result<MaskPrompt, String> {
    let raster = image::open(path)
        .map_err(|e| format!("Error reading mask {}: {e}", path.display()))?
        .to_luma8();
    Ok(MaskPrompt::new(raster))
}

/// Replay `steps`, collecting every returned polygon tagged with its step.
fn replay(
    session: &mut Session<ThresholdEngine>,
    steps: Vec<Step>,
) -> Result<Vec<(usize, Polygon)>, String> {
    let mut polygons = Vec::new();
    for (index, step) in steps.into_iter().enumerate() {
        let fail = |e: SessionError| format!("Step {index}: {e}");
        let result = match step {
            Step::Initialize => session.initialize().map(|_| Vec::new()),
            Step::Focus(rect) => session.focus(rect).map(|_| Vec::new()),
            Step::Points {
                positive,
                negative,
                focus,
                return_all,
            } => session.process(
                &Prompt::Points(PointPrompt::new(positive, negative)),
                focus,
                return_all,
            ),
            Step::Box { rect, return_all } => session.process(&Prompt::Box(rect), None, return_all),
            Step::Mask { path, return_all } => {
                let prompt = load_mask(&path)?;
                session.process(&Prompt::Mask(prompt), None, return_all)
            }
        };
        let found = result.map_err(fail)?;
        info!(step = index, polygons = found.len(), "step done");
        polygons.extend(found.into_iter().map(|p| (index, p)));
    }
    Ok(polygons)
}

fn mask_report(step: usize, mask: &Mask) -> MaskReport {
    let rle = mask.rle();
    MaskReport {
        id: mask.id().get(),
        step,
        simplification_level: mask.simplification_level(),
        area: rle.area(),
        contour: mask.contour().clone(),
        runs: rle.to_start_lengths(),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "cropseg_engine=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let image = image::open(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();

    let script = std::fs::read_to_string(&cli.script)
        .map_err(|e| format!("Error reading {}: {e}", cli.script.display()))?;
    let steps = parse_script(&script)?;

    eprintln!("Image: {} ({width}x{height})", cli.image_path.display());
    eprintln!("Steps: {}", steps.len());
    eprintln!();

    let engine = ThresholdEngine::new(ThresholdEngineConfig {
        threshold: cli.threshold,
        invert: cli.invert,
    });
    let mut session =
        Session::new(engine, image, config).map_err(|e| format!("Invalid config: {e}"))?;

    let found = replay(&mut session, steps)?;
    let (steps_of, polygons): (Vec<usize>, Vec<Polygon>) = found.into_iter().unzip();
    let mut masks = session.masks_from(polygons);
    for mask in &mut masks {
        for _ in 0..cli.simplify {
            mask.simplify();
        }
    }

    if let Some(ref path) = cli.label {
        let label = build_label(width, height, &masks)
            .map_err(|e| format!("Error compositing masks: {e}"))?;
        label
            .save(path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        eprintln!("Label image written to {}", path.display());
    }

    if cli.json {
        let report = Report {
            image: cli.image_path.display().to_string(),
            width,
            height,
            masks: steps_of
                .iter()
                .zip(&masks)
                .map(|(&step, mask)| mask_report(step, mask))
                .collect(),
            diagnostics: session.diagnostics(),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Error serializing report: {e}"))?;
        println!("{json}");
    } else {
        for (step, mask) in steps_of.iter().zip(&masks) {
            println!(
                "{} (step {step}): {} vertices, {} pixels",
                mask.id(),
                mask.contour().len(),
                mask.rle().area(),
            );
        }
        println!();
        println!("{}", session.diagnostics().report());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn script_steps_parse() {
        let steps = parse_script(
            r#"[
                "initialize",
                {"focus": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"points": {"positive": [{"x": 1, "y": 2}]}},
                {"box": {"rect": {"x": 3, "y": 4, "width": 5, "height": 6}, "return_all": true}},
                {"mask": {"path": "hint.png"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Initialize,
                Step::Focus(Rect::new(0, 0, 10, 10)),
                Step::Points {
                    positive: vec![Pixel::new(1, 2)],
                    negative: Vec::new(),
                    focus: None,
                    return_all: false,
                },
                Step::Box {
                    rect: Rect::new(3, 4, 5, 6),
                    return_all: true,
                },
                Step::Mask {
                    path: PathBuf::from("hint.png"),
                    return_all: false,
                },
            ]
        );
    }

    #[test]
    fn unknown_step_is_rejected() {
        assert!(parse_script(r#"["explode"]"#).is_err());
    }

    #[test]
    fn replay_collects_polygons_per_step() {
        let image = image::RgbaImage::from_fn(200, 200, |x, y| {
            let on = (50..80).contains(&x) && (60..90).contains(&y);
            image::Rgba(if on { [255; 4] } else { [0, 0, 0, 255] })
        });
        let engine = ThresholdEngine::new(ThresholdEngineConfig::default());
        let mut session = Session::new(engine, image, EngineConfig::default()).unwrap();
        let steps = parse_script(
            r#"[
                "initialize",
                {"points": {"positive": [{"x": 60, "y": 70}]}},
                {"box": {"rect": {"x": 150, "y": 150, "width": 20, "height": 20}}}
            ]"#,
        )
        .unwrap();
        let found = replay(&mut session, steps).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 1);
        // Whole image, then a crop around the click, then one around the box.
        assert_eq!(session.diagnostics().encodes, 3);
    }
}
