use std::path::PathBuf;

use thiserror::Error;

/// Errors from the detection pipeline.
///
/// Model loading failures are fatal for a run; image read, inference and
/// image write failures are per-image and the batch runner continues past
/// them.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The model file could not be found or the ONNX session failed to build.
    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// The input image could not be opened or decoded.
    #[error("failed to read image {path}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Inference failed or the model output had an unexpected shape.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The annotated copy could not be written.
    #[error("failed to save annotated image {path}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
