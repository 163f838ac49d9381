//! Configuration layer separating CLI arguments from the internal pipeline
//! configuration.
//!
//! CLI concerns (parsing, help text, validation) live in the `clap` structs;
//! the pipeline consumes the plain `DetectionConfig` built from them.

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use serde::Serialize;

use crate::registry::{ClassPolicy, TranslationFallback};

/// Parse a probability value (must be between 0.0 and 1.0).
pub fn parse_probability(s: &str) -> Result<f32, String> {
    let val = s
        .parse::<f32>()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if !(0.0..=1.0).contains(&val) {
        return Err(format!("Must be between 0.0 and 1.0, got {val}"));
    }
    Ok(val)
}

/// Global CLI arguments that apply to all commands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Global output directory (overrides default placement next to input)
    #[arg(long, global = true)]
    pub output_dir: Option<String>,

    /// Verbosity level (-q/--quiet, -v/-vv/-vvv for info/debug/trace)
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Use permissive mode for input validation (warn instead of error for
    /// missing or unsupported files)
    #[arg(long, global = true)]
    pub permissive: bool,

    /// Device to use for inference (auto, cpu, coreml)
    #[arg(long, default_value = "auto", global = true)]
    pub device: String,

    /// Disable colored output (also respects NO_COLOR and ZVEROLOV_NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// CLI command for animal detection.
#[derive(Parser, Debug, Clone)]
pub struct DetectCommand {
    /// Path(s) to input images or directories. Supports glob patterns like *.jpg
    #[arg(value_name = "IMAGES_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Confidence threshold for detections (0.0-1.0)
    #[arg(short, long, default_value = "0.25", value_parser = parse_probability)]
    pub confidence: f32,

    /// IoU threshold for non-maximum suppression (0.0-1.0)
    #[arg(long, default_value = "0.45", value_parser = parse_probability)]
    pub iou_threshold: f32,

    /// Save a copy of each image with labeled bounding boxes drawn
    #[arg(long)]
    pub bounding_box: bool,

    /// Print detections as JSON instead of the per-detection report
    #[arg(long)]
    pub json: bool,

    /// How class names are matched against the animal tables
    #[arg(long, value_enum, default_value_t = ClassPolicy::Keyword)]
    pub class_policy: ClassPolicy,

    /// What to show for class names without a Russian translation
    #[arg(long, value_enum, default_value_t = TranslationFallback::SourceName)]
    pub missing_translation: TranslationFallback,

    /// Path to the ONNX model file (overrides ZVEROLOV_MODEL_PATH)
    #[arg(long)]
    pub model_path: Option<String>,
}

/// Base configuration shared by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct BaseConfig {
    /// Input sources (images, directories, or glob patterns)
    pub sources: Vec<String>,
    /// Device for inference
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Fail on missing or unsupported inputs. Opposite of `--permissive`.
    pub strict: bool,
}

/// Internal configuration for the detection pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionConfig {
    #[serde(skip)]
    pub base: BaseConfig,
    pub confidence: f32,
    pub iou_threshold: f32,
    pub bounding_box: bool,
    pub json: bool,
    pub class_policy: ClassPolicy,
    pub missing_translation: TranslationFallback,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
}

impl From<GlobalArgs> for BaseConfig {
    fn from(global: GlobalArgs) -> Self {
        Self {
            sources: Vec::new(), // sources come from the command, not global args
            device: global.device,
            output_dir: global.output_dir,
            strict: !global.permissive,
        }
    }
}

impl DetectionConfig {
    /// Create configuration from global args and command-specific args.
    pub fn from_args(global: GlobalArgs, cmd: DetectCommand) -> Self {
        let mut base: BaseConfig = global.into();
        base.sources = cmd.sources;

        Self {
            base,
            confidence: cmd.confidence,
            iou_threshold: cmd.iou_threshold,
            bounding_box: cmd.bounding_box,
            json: cmd.json,
            class_policy: cmd.class_policy,
            missing_translation: cmd.missing_translation,
            model_path: cmd.model_path,
        }
    }
}
