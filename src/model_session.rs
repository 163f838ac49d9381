//! ONNX Runtime session management and model vocabulary discovery.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::Level;
use ort::{
    execution_providers::{CPUExecutionProvider, CoreMLExecutionProvider, ExecutionProvider},
    logging::LogLevel,
    session::Session,
};

use crate::classes::{COCO_CLASSES, MEGADETECTOR_CLASSES};
use crate::color_utils::symbols;
use crate::errors::DetectError;

/// Environment variable overriding the model path.
pub const MODEL_PATH_ENV_VAR: &str = "ZVEROLOV_MODEL_PATH";

/// Model used when neither the CLI nor the environment provides one.
pub const DEFAULT_MODEL_PATH: &str = "models/md_v5a.0.0.onnx";

fn log_level_from_ort(level: LogLevel) -> Level {
    match level {
        LogLevel::Verbose => Level::Trace,
        LogLevel::Info => Level::Trace,
        LogLevel::Warning => Level::Debug,
        LogLevel::Error => Level::Info,
        LogLevel::Fatal => Level::Error,
    }
}

fn ort_level_from_log(level: Level) -> LogLevel {
    match level {
        // ONNX's info level is verbose enough to be trace for us
        Level::Trace => LogLevel::Verbose,
        Level::Debug => LogLevel::Warning,
        Level::Info => LogLevel::Error,
        Level::Warn => LogLevel::Error,
        Level::Error => LogLevel::Fatal,
    }
}

/// Device selection result.
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub device: String,
    pub reason: String,
}

/// Determine the device to run on. "auto" prefers CoreML when available.
pub fn determine_optimal_device(requested_device: &str) -> DeviceSelection {
    match requested_device {
        "auto" => {
            let coreml = CoreMLExecutionProvider::default();
            match coreml.is_available() {
                Ok(true) => DeviceSelection {
                    device: "coreml".to_string(),
                    reason: "Auto-selected CoreML (available)".to_string(),
                },
                _ => DeviceSelection {
                    device: "cpu".to_string(),
                    reason: "Auto-selected CPU (CoreML not available)".to_string(),
                },
            }
        }
        other => DeviceSelection {
            device: other.to_string(),
            reason: format!("User explicitly chose {other}"),
        },
    }
}

/// Resolve the model path: CLI override, then env var, then the default.
/// A missing file is a `ModelLoad` failure; there is no download fallback.
pub fn resolve_model_path(cli_path: Option<&str>) -> Result<PathBuf, DetectError> {
    let path = if let Some(p) = cli_path {
        PathBuf::from(p)
    } else if let Ok(p) = std::env::var(MODEL_PATH_ENV_VAR) {
        log::debug!("Using model path from {MODEL_PATH_ENV_VAR}: {p}");
        PathBuf::from(p)
    } else {
        PathBuf::from(DEFAULT_MODEL_PATH)
    };

    if !path.is_file() {
        return Err(DetectError::ModelLoad {
            path,
            reason: "model file not found".to_string(),
        });
    }

    Ok(path)
}

/// Create an ONNX Runtime session for the given model file and device, with
/// ORT log messages re-routed through our logger.
pub fn create_session(model_path: &Path, device: &str) -> Result<Session, DetectError> {
    let execution_providers = match device {
        "coreml" => match CoreMLExecutionProvider::default().is_available() {
            Ok(true) => {
                vec![
                    CoreMLExecutionProvider::default().build(),
                    CPUExecutionProvider::default().build(),
                ]
            }
            _ => {
                log::warn!(
                    "{}CoreML not available, falling back to CPU",
                    symbols::warning()
                );
                vec![CPUExecutionProvider::default().build()]
            }
        },
        "cpu" => {
            log::debug!("Using CPU execution provider");
            vec![CPUExecutionProvider::default().build()]
        }
        _ => {
            log::warn!(
                "{}Unknown device '{device}', using CPU",
                symbols::warning()
            );
            vec![CPUExecutionProvider::default().build()]
        }
    };

    // Choose the ORT log level based on what is enabled for us
    let ort_log_level = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
    ]
    .into_iter()
    .find(|&lvl| log::log_enabled!(lvl))
    .map(ort_level_from_log)
    .unwrap_or(LogLevel::Fatal);

    let load = || -> Result<Session, ort::Error> {
        Session::builder()?
            .with_logger(Box::new(|level, _, _, _, msg| {
                let log_level = log_level_from_ort(level);
                log::log!(log_level, "[onnx] {msg}")
            }))?
            .with_log_level(ort_log_level)?
            .with_execution_providers(execution_providers)?
            .commit_from_file(model_path)
    };

    load().map_err(|e| DetectError::ModelLoad {
        path: model_path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Query the model's square input size from its input tensor shape,
/// defaulting to the standard 640 when the shape is dynamic or unexpected.
pub fn model_input_size(session: &Session) -> u32 {
    let input_md = &session.inputs[0];
    match &input_md.input_type {
        ort::value::ValueType::Tensor { shape, .. } if shape.len() == 4 && shape[3] > 0 => {
            shape[3] as u32
        }
        other => {
            log::debug!("Unexpected input type {other:?}, defaulting to 640x640");
            640
        }
    }
}

/// Number of classes implied by the output tensor shape, when static.
fn class_count_from_output(session: &Session) -> Option<usize> {
    let output_md = &session.outputs[0];
    let shape = match &output_md.output_type {
        ort::value::ValueType::Tensor { shape, .. } if shape.len() == 3 => shape,
        _ => return None,
    };
    if shape[1] <= 0 || shape[2] <= 0 {
        return None; // dynamic dimensions
    }
    if shape[1] <= shape[2] {
        // [1, 4+nc, boxes]
        usize::try_from(shape[1] - 4).ok().filter(|nc| *nc > 0)
    } else {
        // [1, boxes, 5+nc]
        usize::try_from(shape[2] - 5).ok().filter(|nc| *nc > 0)
    }
}

/// Discover the model's class vocabulary.
///
/// Ultralytics exports embed a `names` table in the model metadata; when that
/// is missing, fall back to the COCO-80 or MegaDetector vocabulary inferred
/// from the output shape, and finally to synthetic `class_<id>` names.
pub fn class_names(session: &Session) -> BTreeMap<u32, String> {
    if let Ok(metadata) = session.metadata() {
        if let Ok(Some(raw)) = metadata.custom("names") {
            if let Some(names) = parse_names_metadata(&raw) {
                log::debug!("Model vocabulary from metadata: {} classes", names.len());
                return names;
            }
            log::warn!(
                "{}Could not parse model 'names' metadata, falling back",
                symbols::warning()
            );
        }
    }

    let builtin = |names: &[&str]| -> BTreeMap<u32, String> {
        names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as u32, name.to_string()))
            .collect()
    };

    match class_count_from_output(session) {
        Some(80) => {
            log::debug!("Model vocabulary: COCO-80 (inferred from output shape)");
            builtin(COCO_CLASSES)
        }
        Some(3) => {
            log::debug!("Model vocabulary: MegaDetector (inferred from output shape)");
            builtin(MEGADETECTOR_CLASSES)
        }
        Some(n) => {
            log::warn!(
                "{}Unknown vocabulary of {n} classes, using synthetic names",
                symbols::warning()
            );
            (0..n as u32).map(|id| (id, format!("class_{id}"))).collect()
        }
        None => {
            log::warn!(
                "{}Cannot infer vocabulary from output shape, assuming MegaDetector",
                symbols::warning()
            );
            builtin(MEGADETECTOR_CLASSES)
        }
    }
}

/// Parse the python-dict style `names` metadata string, e.g.
/// `{0: 'animal', 1: 'person', 2: 'vehicle'}`.
fn parse_names_metadata(raw: &str) -> Option<BTreeMap<u32, String>> {
    let trimmed = raw.trim().strip_prefix('{')?.strip_suffix('}')?;

    let mut names = BTreeMap::new();
    for entry in trimmed.split(',') {
        let (id_part, name_part) = entry.split_once(':')?;
        let id: u32 = id_part.trim().parse().ok()?;
        let name = name_part
            .trim()
            .trim_matches(|c| c == '\'' || c == '"')
            .to_string();
        if name.is_empty() {
            return None;
        }
        names.insert(id, name);
    }

    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}
