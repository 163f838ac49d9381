//! Zverolov: animal detection and annotation for camera-trap style imagery.
//!
//! Wraps a pretrained ONNX detection model (MegaDetector or an ultralytics
//! YOLO export) behind a small pipeline: load model, run inference, keep only
//! allow-listed animal classes, translate class names to Russian, and draw
//! labeled boxes on a copy of the input.

pub mod annotate;
pub mod classes;
pub mod color_utils;
pub mod config;
pub mod detection;
pub mod detector;
pub mod errors;
pub mod image_input;
pub mod model_session;
pub mod output;
pub mod postprocess;
pub mod preprocess;
pub mod registry;

pub use detection::{BoundingBox, Detection};
pub use detector::AnimalDetector;
pub use errors::DetectError;
pub use registry::{AnimalClassRegistry, ClassPolicy, TranslationFallback};
