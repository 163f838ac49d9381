//! Raw output decoding, NMS, and the two-tier confidence policy.
//!
//! The confidence policy is a pure function over `(raw_detections,
//! threshold)` so it can be tested without any model I/O.

use std::collections::HashMap;

use ndarray::ArrayViewD;

use crate::detection::RawDetection;
use crate::errors::DetectError;
use crate::preprocess::Letterbox;

/// Floor applied on the first filtering pass. The caller's threshold is only
/// used when nothing clears this floor.
pub const RAISED_CONFIDENCE_FLOOR: f32 = 0.40;

/// Which confidence cutoff was actually applied for a call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdTier {
    /// The raised floor (max of the caller threshold and
    /// [`RAISED_CONFIDENCE_FLOOR`]) produced at least one detection.
    Raised(f32),
    /// Nothing cleared the raised floor; the caller's raw threshold was used
    /// and the lower-confidence set is shown.
    Fallback(f32),
}

impl ThresholdTier {
    /// The effective threshold: every returned detection scores at least this.
    pub fn effective(&self) -> f32 {
        match self {
            ThresholdTier::Raised(t) | ThresholdTier::Fallback(t) => *t,
        }
    }
}

/// Two-tier confidence filter.
///
/// First pass uses the raised floor. If that yields nothing, the single
/// documented fallback rule applies: re-filter at the caller's threshold and
/// show the lower-confidence set. An empty result under both tiers is a
/// valid outcome, not an error.
pub fn filter_by_confidence(
    detections: Vec<RawDetection>,
    threshold: f32,
) -> (Vec<RawDetection>, ThresholdTier) {
    let raised = threshold.max(RAISED_CONFIDENCE_FLOOR);

    let above: Vec<RawDetection> = detections
        .iter()
        .filter(|d| d.confidence >= raised)
        .cloned()
        .collect();

    if !above.is_empty() {
        return (above, ThresholdTier::Raised(raised));
    }

    let fallback = detections
        .into_iter()
        .filter(|d| d.confidence >= threshold)
        .collect();
    (fallback, ThresholdTier::Fallback(threshold))
}

/// Decode a YOLO output tensor into raw detections in original-image space.
///
/// Supports both export layouts: `[1, 4+nc, boxes]` (YOLOv8/v11) and
/// `[1, boxes, 5+nc]` (YOLOv5/MegaDetector, with an objectness column).
/// Candidates below `min_confidence` are dropped during decoding.
pub fn decode_output(
    output: &ArrayViewD<f32>,
    min_confidence: f32,
    letterbox: Letterbox,
) -> Result<Vec<RawDetection>, DetectError> {
    let shape = output.shape();
    if shape.len() != 3 {
        return Err(DetectError::Inference(format!(
            "expected 3D model output, got {}D",
            shape.len()
        )));
    }

    let mut detections = Vec::new();

    if shape[1] <= shape[2] {
        // [1, 4+nc, boxes] layout: per-box columns. Needs the four box
        // coordinates plus at least one class row.
        if shape[1] < 5 {
            return Err(DetectError::Inference(format!(
                "output shape {shape:?} has no class rows"
            )));
        }
        let num_classes = shape[1] - 4;
        let num_boxes = shape[2];

        for i in 0..num_boxes {
            let mut best_confidence = 0.0f32;
            let mut best_class_id = 0u32;
            for class_idx in 0..num_classes {
                let score = output[[0, 4 + class_idx, i]];
                if score > best_confidence {
                    best_confidence = score;
                    best_class_id = class_idx as u32;
                }
            }

            if best_confidence >= min_confidence {
                detections.push(raw_from_center(
                    output[[0, 0, i]],
                    output[[0, 1, i]],
                    output[[0, 2, i]],
                    output[[0, 3, i]],
                    best_confidence,
                    best_class_id,
                    letterbox,
                ));
            }
        }
    } else {
        // [1, boxes, 5+nc] layout: objectness at column 4, class scores
        // after. Needs the coordinates, objectness, and at least one class.
        if shape[2] < 6 {
            return Err(DetectError::Inference(format!(
                "output shape {shape:?} has no class columns"
            )));
        }
        let num_boxes = shape[1];
        let num_classes = shape[2] - 5;

        for i in 0..num_boxes {
            let objectness = output[[0, i, 4]];
            if objectness < min_confidence {
                continue;
            }

            let mut best_score = 0.0f32;
            let mut best_class_id = 0u32;
            for class_idx in 0..num_classes {
                let score = output[[0, i, 5 + class_idx]];
                if score > best_score {
                    best_score = score;
                    best_class_id = class_idx as u32;
                }
            }

            let confidence = objectness * best_score;
            if confidence >= min_confidence {
                detections.push(raw_from_center(
                    output[[0, i, 0]],
                    output[[0, i, 1]],
                    output[[0, i, 2]],
                    output[[0, i, 3]],
                    confidence,
                    best_class_id,
                    letterbox,
                ));
            }
        }
    }

    Ok(detections)
}

fn raw_from_center(
    x_center: f32,
    y_center: f32,
    width: f32,
    height: f32,
    confidence: f32,
    class_id: u32,
    letterbox: Letterbox,
) -> RawDetection {
    let (x1, y1) = letterbox.to_original(x_center - width / 2.0, y_center - height / 2.0);
    let (x2, y2) = letterbox.to_original(x_center + width / 2.0, y_center + height / 2.0);

    RawDetection {
        x1,
        y1,
        x2,
        y2,
        confidence,
        class_id,
    }
}

/// Per-class non-maximum suppression, highest confidence first.
pub fn nms(detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    if detections.is_empty() {
        return detections;
    }

    let mut class_groups: HashMap<u32, Vec<RawDetection>> = HashMap::new();
    for detection in detections {
        class_groups
            .entry(detection.class_id)
            .or_default()
            .push(detection);
    }

    let mut all_results = Vec::new();

    for (_, mut class_detections) in class_groups {
        class_detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut suppressed = vec![false; class_detections.len()];

        for i in 0..class_detections.len() {
            if suppressed[i] {
                continue;
            }

            for j in (i + 1)..class_detections.len() {
                if !suppressed[j] && class_detections[i].iou(&class_detections[j]) > iou_threshold {
                    suppressed[j] = true;
                }
            }

            all_results.push(class_detections[i].clone());
        }
    }

    all_results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    all_results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(confidence: f32) -> RawDetection {
        RawDetection {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            confidence,
            class_id: 0,
        }
    }

    #[test]
    fn test_filter_keeps_only_high_tier_when_it_clears() {
        let (kept, tier) = filter_by_confidence(vec![raw(0.6), raw(0.2)], 0.25);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.6).abs() < f32::EPSILON);
        assert_eq!(tier, ThresholdTier::Raised(RAISED_CONFIDENCE_FLOOR));
        assert!(kept.iter().all(|d| d.confidence >= tier.effective()));
    }

    #[test]
    fn test_filter_falls_back_to_caller_threshold() {
        let (kept, tier) = filter_by_confidence(vec![raw(0.3), raw(0.2)], 0.25);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.3).abs() < f32::EPSILON);
        assert_eq!(tier, ThresholdTier::Fallback(0.25));
    }

    #[test]
    fn test_filter_empty_input_is_not_an_error() {
        let (kept, tier) = filter_by_confidence(Vec::new(), 0.25);
        assert!(kept.is_empty());
        assert_eq!(tier, ThresholdTier::Fallback(0.25));
    }

    #[test]
    fn test_filter_with_threshold_above_floor() {
        // Caller threshold higher than the floor: the raised tier is just the
        // caller threshold.
        let (kept, tier) = filter_by_confidence(vec![raw(0.9), raw(0.5)], 0.8);
        assert_eq!(kept.len(), 1);
        assert_eq!(tier, ThresholdTier::Raised(0.8));
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let a = RawDetection {
            x1: 0.0,
            y1: 0.0,
            x2: 100.0,
            y2: 100.0,
            confidence: 0.9,
            class_id: 0,
        };
        let b = RawDetection {
            x1: 5.0,
            y1: 5.0,
            x2: 105.0,
            y2: 105.0,
            confidence: 0.7,
            class_id: 0,
        };
        let kept = nms(vec![a, b], 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let a = RawDetection {
            x1: 0.0,
            y1: 0.0,
            x2: 100.0,
            y2: 100.0,
            confidence: 0.9,
            class_id: 0,
        };
        let mut b = a.clone();
        b.class_id = 1;
        b.confidence = 0.7;
        let kept = nms(vec![a, b], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_decode_v8_layout() {
        // Eight candidate boxes, two classes: [1, 4+2, 8]. Only box 0 scores.
        let mut array: ndarray::ArrayD<f32> = ndarray::Array::zeros(ndarray::IxDyn(&[1, 6, 8]));
        array[[0, 0, 0]] = 320.0; // cx
        array[[0, 1, 0]] = 320.0; // cy
        array[[0, 2, 0]] = 100.0; // w
        array[[0, 3, 0]] = 200.0; // h
        array[[0, 4, 0]] = 0.1;
        array[[0, 5, 0]] = 0.8;
        let lb = Letterbox {
            scale: 1.0,
            x_offset: 0,
            y_offset: 0,
        };

        let decoded = decode_output(&array.view(), 0.25, lb).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].class_id, 1);
        assert!((decoded[0].x1 - 270.0).abs() < 1e-3);
        assert!((decoded[0].y2 - 420.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_v5_layout_multiplies_objectness() {
        // Eight candidate boxes, one class: [1, 8, 5+1]. Only box 0 scores.
        let mut array: ndarray::ArrayD<f32> = ndarray::Array::zeros(ndarray::IxDyn(&[1, 8, 6]));
        array[[0, 0, 0]] = 320.0; // cx
        array[[0, 0, 1]] = 320.0; // cy
        array[[0, 0, 2]] = 100.0; // w
        array[[0, 0, 3]] = 100.0; // h
        array[[0, 0, 4]] = 0.9; // objectness
        array[[0, 0, 5]] = 0.8; // class score
        let lb = Letterbox {
            scale: 0.5,
            x_offset: 0,
            y_offset: 70,
        };

        let decoded = decode_output(&array.view(), 0.25, lb).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!((decoded[0].confidence - 0.72).abs() < 1e-6);
        // (270 - 0) / 0.5 and (270 - 70) / 0.5
        assert!((decoded[0].x1 - 540.0).abs() < 1e-3);
        assert!((decoded[0].y1 - 400.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_rejects_too_few_class_slots() {
        let lb = Letterbox {
            scale: 1.0,
            x_offset: 0,
            y_offset: 0,
        };

        // [1, boxes, 5+nc] with only 4 columns: no room for objectness plus
        // a class score.
        let array: ndarray::ArrayD<f32> = ndarray::Array::zeros(ndarray::IxDyn(&[1, 8, 4]));
        assert!(decode_output(&array.view(), 0.25, lb).is_err());

        // [1, 4+nc, boxes] with only 2 rows: not even full coordinates.
        let array: ndarray::ArrayD<f32> = ndarray::Array::zeros(ndarray::IxDyn(&[1, 2, 10]));
        assert!(decode_output(&array.view(), 0.25, lb).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_rank() {
        let array: ndarray::ArrayD<f32> =
            ndarray::Array::from_shape_vec(ndarray::IxDyn(&[1, 6]), vec![0.0; 6]).unwrap();
        let lb = Letterbox {
            scale: 1.0,
            x_offset: 0,
            y_offset: 0,
        };
        assert!(decode_output(&array.view(), 0.25, lb).is_err());
    }
}
