//! The detection-and-annotation pipeline.
//!
//! `AnimalDetector` owns one ONNX session and one read-only class registry;
//! it has no shared state across instances, so independent workers simply
//! hold their own detector. `detect` is a blocking call with no side effects
//! beyond its return value; saving files is handled by the batch runner.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use ort::{session::Session, value::Value};

use crate::annotate;
use crate::classes::ClassTables;
use crate::color_utils::symbols;
use crate::config::DetectionConfig;
use crate::detection::{BoundingBox, Detection};
use crate::errors::DetectError;
use crate::image_input::{collect_images_from_sources, ImageInputConfig};
use crate::model_session::{
    class_names, create_session, determine_optimal_device, model_input_size, resolve_model_path,
};
use crate::output::annotated_image_path;
use crate::postprocess::{decode_output, filter_by_confidence, nms};
use crate::preprocess::preprocess_image;
use crate::registry::AnimalClassRegistry;

pub struct AnimalDetector {
    session: Session,
    registry: AnimalClassRegistry,
    /// Tag recorded on every detection, derived from the model file name.
    method_tag: String,
    input_size: u32,
    input_name: String,
    output_name: String,
    iou_threshold: f32,
}

impl AnimalDetector {
    /// Load the model and build the class registry. Model loading failures
    /// are fatal; there is no retry.
    pub fn from_config(config: &DetectionConfig) -> Result<Self, DetectError> {
        let model_path = resolve_model_path(config.model_path.as_deref())?;

        let selection = determine_optimal_device(&config.base.device);
        log::debug!("Device: {} ({})", selection.device, selection.reason);

        let load_start = Instant::now();
        let session = create_session(&model_path, &selection.device)?;
        log::info!(
            "{} Model {} loaded in {:.1}ms",
            symbols::completed_successfully(),
            model_path.display(),
            load_start.elapsed().as_secs_f64() * 1000.0
        );

        let names = class_names(&session);
        let registry = AnimalClassRegistry::build(
            &names,
            ClassTables::default(),
            config.class_policy,
            config.missing_translation,
        );
        log::debug!(
            "Allow-list ({} policy): {} of {} classes",
            registry.policy().as_str(),
            registry.allowed_ids().len(),
            names.len()
        );

        let input_size = model_input_size(&session);
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();
        let method_tag = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        Ok(Self {
            session,
            registry,
            method_tag,
            input_size,
            input_name,
            output_name,
            iou_threshold: config.iou_threshold,
        })
    }

    pub fn registry(&self) -> &AnimalClassRegistry {
        &self.registry
    }

    /// Run the full pipeline on one image: decode, infer, filter by the
    /// allow-list and the two-tier confidence policy, annotate a copy.
    ///
    /// Every returned detection scores at least the effective threshold and
    /// belongs to an allow-listed class. An empty list is a valid outcome.
    /// The input image is never mutated.
    pub fn detect(
        &mut self,
        image_path: &Path,
        confidence_threshold: f32,
    ) -> Result<(DynamicImage, Vec<Detection>), DetectError> {
        let img = image::open(image_path).map_err(|e| DetectError::ImageRead {
            path: image_path.to_path_buf(),
            source: e,
        })?;
        let (orig_width, orig_height) = img.dimensions();
        log::debug!(
            "Processing {}: {}x{}",
            image_path.display(),
            orig_width,
            orig_height
        );

        let (input_tensor, letterbox) = preprocess_image(&img, self.input_size)?;

        let input_value = Value::from_array(input_tensor)
            .map_err(|e| DetectError::Inference(format!("failed to create input value: {e}")))?;

        let inference_start = Instant::now();
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => &input_value])
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        log::debug!(
            "Inference completed in {:.1}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );

        let output_view = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| DetectError::Inference(format!("failed to extract output: {e}")))?;

        let raw = decode_output(&output_view, confidence_threshold, letterbox)?;

        // Unrecognized or non-animal class ids are silently excluded
        let allowed: Vec<_> = raw
            .into_iter()
            .filter(|d| self.registry.is_allowed(d.class_id))
            .collect();

        let kept = nms(allowed, self.iou_threshold);
        let (survivors, tier) = filter_by_confidence(kept, confidence_threshold);
        log::debug!(
            "{} detection(s) at effective threshold {:.2} ({tier:?})",
            survivors.len(),
            tier.effective()
        );

        let mut detections = Vec::with_capacity(survivors.len());
        for raw in survivors {
            let Some(name) = self.registry.class_name(raw.class_id) else {
                continue;
            };

            let bbox = BoundingBox {
                x1: raw.x1.max(0.0).round() as i32,
                y1: raw.y1.max(0.0).round() as i32,
                x2: raw.x2.min(orig_width as f32).round() as i32,
                y2: raw.y2.min(orig_height as f32).round() as i32,
            };
            if bbox.x2 <= bbox.x1 || bbox.y2 <= bbox.y1 {
                continue; // degenerate after clamping to the image
            }

            detections.push(Detection {
                class_id: raw.class_id,
                class_name: name.to_string(),
                class_name_ru: self.registry.localize(name),
                confidence: raw.confidence,
                bbox,
                method: self.method_tag.clone(),
            });
        }

        let annotated = annotate::draw_detections(&img, &detections);
        Ok((annotated, detections))
    }
}

/// Process all configured sources sequentially with one detector instance.
///
/// A failed image is logged and the batch continues; the run only errors when
/// source collection fails, the model cannot be loaded, or every image fails.
/// Returns the number of successfully processed images.
pub fn run_detection(config: DetectionConfig) -> Result<usize> {
    let image_config = ImageInputConfig::from_strict_flag(config.base.strict);
    let image_files = collect_images_from_sources(&config.base.sources, &image_config)?;

    if image_files.is_empty() {
        log::warn!("No valid images found to process");
        return Ok(0);
    }
    log::info!(
        "{} Found {} image(s) to process",
        symbols::resources_found(),
        image_files.len()
    );

    let mut detector = AnimalDetector::from_config(&config)?;
    let progress = crate::color_utils::progress::create_batch_progress_bar(image_files.len());

    let mut successful = 0usize;
    let mut failed = 0usize;
    let mut json_reports = Vec::new();

    for (index, image_path) in image_files.iter().enumerate() {
        let start = Instant::now();
        match process_single_image(&mut detector, image_path, &config) {
            Ok(detections) => {
                successful += 1;
                log::info!(
                    "{} Processed {} ({}/{}) in {:.1}ms: {} detection(s)",
                    symbols::completed_successfully(),
                    image_path.display(),
                    index + 1,
                    image_files.len(),
                    start.elapsed().as_secs_f64() * 1000.0,
                    detections.len()
                );

                if config.json {
                    json_reports.push(serde_json::json!({
                        "image": image_path.display().to_string(),
                        "detections": detections,
                    }));
                } else {
                    print_report(image_path, &detections, image_files.len() > 1);
                }
            }
            Err(e) => {
                failed += 1;
                log::warn!(
                    "{}Failed to process {} ({}/{}): {e}",
                    symbols::warning(),
                    image_path.display(),
                    index + 1,
                    image_files.len()
                );
            }
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    if config.json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    }

    if failed > 0 {
        log::warn!(
            "{}{} of {} images failed to process",
            symbols::warning(),
            failed,
            image_files.len()
        );
    }
    if successful == 0 && failed > 0 {
        anyhow::bail!("all {failed} image(s) failed to process");
    }

    Ok(successful)
}

fn process_single_image(
    detector: &mut AnimalDetector,
    image_path: &Path,
    config: &DetectionConfig,
) -> Result<Vec<Detection>> {
    let (annotated, detections) = detector.detect(image_path, config.confidence)?;

    if config.bounding_box {
        let output_path = annotated_image_path(image_path, config.base.output_dir.as_deref())?;
        annotate::save_annotated(&annotated, &output_path)?;
        log::debug!(
            "{} Annotated image saved to: {}",
            symbols::completed_successfully(),
            output_path.display()
        );
    }

    Ok(detections)
}

/// Human-readable per-detection report, matching the tool's Russian-facing
/// output format.
fn print_report(image_path: &Path, detections: &[Detection], show_header: bool) {
    if show_header {
        println!("{}:", image_path.display());
    }
    if detections.is_empty() {
        println!("Животные не обнаружены");
        return;
    }
    for detection in detections {
        println!(
            "- {} (уверенность: {:.2})",
            detection.class_name_ru, detection.confidence
        );
    }
}
