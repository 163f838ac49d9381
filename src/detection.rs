use serde::Serialize;

/// Axis-aligned box in original-image pixel coordinates, x1 < x2 and y1 < y2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }
}

/// A filtered, allow-listed detection as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub class_id: u32,
    /// Class name as reported by the model vocabulary.
    pub class_name: String,
    /// Russian display name, or the configured fallback when untranslated.
    pub class_name_ru: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    /// Identifies which model produced this detection, e.g. "md_v5a.0.0".
    pub method: String,
}

/// An unfiltered model output record, prior to allow-list and threshold
/// filtering. Coordinates are f32 corners in original-image space.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl RawDetection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    pub fn intersection_area(&self, other: &RawDetection) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    pub fn iou(&self, other: &RawDetection) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x1: f32, y1: f32, x2: f32, y2: f32) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id: 0,
        }
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = raw(0.0, 0.0, 10.0, 10.0);
        let b = raw(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = raw(5.0, 5.0, 15.0, 15.0);
        assert!((a.iou(&a) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = raw(0.0, 0.0, 10.0, 10.0);
        let b = raw(5.0, 0.0, 15.0, 10.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_box_dimensions() {
        let bbox = BoundingBox {
            x1: 10,
            y1: 20,
            x2: 110,
            y2: 70,
        };
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 50);
    }
}
