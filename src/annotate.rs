//! Bounding-box and label rendering.
//!
//! Drawing always happens on an RGBA copy of the input; the source image is
//! never mutated. Label text needs a font with Cyrillic coverage, which is
//! discovered at runtime; when none is found, boxes are still drawn and
//! labels are skipped with a single warning.

use std::path::Path;
use std::sync::OnceLock;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};

use crate::color_utils::symbols;
use crate::detection::Detection;
use crate::errors::DetectError;

/// Environment variable pointing at a TTF/OTF file to use for labels.
pub const FONT_ENV_VAR: &str = "ZVEROLOV_FONT";

/// Candidate system fonts with Cyrillic coverage, tried in order.
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const LABEL_SCALE: f32 = 20.0;
const LABEL_PADDING: u32 = 2;
const BOX_THICKNESS: i32 = 3;

/// Confidence tier colors: high is green, medium orange, low red.
pub fn tier_color(confidence: f32) -> Rgba<u8> {
    if confidence >= 0.8 {
        Rgba([34, 139, 34, 255])
    } else if confidence >= 0.5 {
        Rgba([255, 140, 0, 255])
    } else {
        Rgba([220, 20, 60, 255])
    }
}

static LABEL_FONT: OnceLock<Option<FontVec>> = OnceLock::new();

fn load_label_font() -> Option<&'static FontVec> {
    LABEL_FONT
        .get_or_init(|| {
            let mut candidates: Vec<String> = Vec::new();
            if let Ok(custom) = std::env::var(FONT_ENV_VAR) {
                candidates.push(custom);
            }
            candidates.extend(FONT_SEARCH_PATHS.iter().map(|p| p.to_string()));

            for candidate in &candidates {
                if let Ok(bytes) = std::fs::read(candidate) {
                    if let Ok(font) = FontVec::try_from_vec(bytes) {
                        log::debug!("Label font: {candidate}");
                        return Some(font);
                    }
                }
            }

            log::warn!(
                "{}No usable label font found, drawing boxes without text \
                 (set {FONT_ENV_VAR} to a TTF file with Cyrillic glyphs)",
                symbols::warning()
            );
            None
        })
        .as_ref()
}

/// Draw all detections on a copy of the image and return the copy.
pub fn draw_detections(img: &DynamicImage, detections: &[Detection]) -> DynamicImage {
    let mut canvas = img.to_rgba8();
    let font = load_label_font();

    for detection in detections {
        let color = tier_color(detection.confidence);
        draw_box(&mut canvas, detection, color);

        if let Some(font) = font {
            let label = format!("{} {:.2}", detection.class_name_ru, detection.confidence);
            draw_label(&mut canvas, detection, &label, color, font);
        }
    }

    DynamicImage::ImageRgba8(canvas)
}

fn draw_box(canvas: &mut image::RgbaImage, detection: &Detection, color: Rgba<u8>) {
    let bbox = &detection.bbox;
    for offset in 0..BOX_THICKNESS {
        let rect = imageproc::rect::Rect::at(bbox.x1 - offset, bbox.y1 - offset).of_size(
            bbox.width() + (offset * 2) as u32,
            bbox.height() + (offset * 2) as u32,
        );
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Draw the filled label background and text. Preferred position is above
/// the box; a box near the top edge would push the label to negative
/// coordinates, so the position is clamped inside the image instead.
fn draw_label(
    canvas: &mut image::RgbaImage,
    detection: &Detection,
    label: &str,
    color: Rgba<u8>,
    font: &FontVec,
) {
    let scale = PxScale::from(LABEL_SCALE);
    let (text_width, text_height) = text_size(scale, font, label);
    let bg_width = text_width + 2 * LABEL_PADDING;
    let bg_height = text_height + 2 * LABEL_PADDING;

    let (img_width, img_height) = canvas.dimensions();
    if bg_width > img_width || bg_height > img_height {
        return; // image too small for any label
    }

    // Clamp: above the box when room exists, inside the image otherwise
    let x = (detection.bbox.x1.max(0) as u32).min(img_width - bg_width);
    let y_above = detection.bbox.y1 - bg_height as i32;
    let y = (y_above.max(0) as u32).min(img_height - bg_height);

    for dx in 0..bg_width {
        for dy in 0..bg_height {
            canvas.put_pixel(x + dx, y + dy, color);
        }
    }

    draw_text_mut(
        canvas,
        Rgba([255, 255, 255, 255]),
        (x + LABEL_PADDING) as i32,
        (y + LABEL_PADDING) as i32,
        scale,
        font,
        label,
    );
}

/// Save an annotated image, creating parent directories as needed. JPEG
/// output is flattened to RGB because JPEG has no alpha channel.
pub fn save_annotated(img: &DynamicImage, output_path: &Path) -> Result<(), DetectError> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| DetectError::ImageWrite {
                path: output_path.to_path_buf(),
                source: image::ImageError::IoError(e),
            })?;
        }
    }

    let preserve_alpha = output_path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase() == "png")
        .unwrap_or(false);

    let output_img = if preserve_alpha {
        img.clone()
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    output_img
        .save(output_path)
        .map_err(|e| DetectError::ImageWrite {
            path: output_path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    fn detection(bbox: BoundingBox, confidence: f32) -> Detection {
        Detection {
            class_id: 0,
            class_name: "cat".to_string(),
            class_name_ru: "кот".to_string(),
            confidence,
            bbox,
            method: "test".to_string(),
        }
    }

    #[test]
    fn test_tier_colors_are_distinct() {
        let high = tier_color(0.9);
        let medium = tier_color(0.6);
        let low = tier_color(0.3);
        assert_ne!(high, medium);
        assert_ne!(medium, low);
        assert_ne!(high, low);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier_color(0.8), tier_color(0.95));
        assert_eq!(tier_color(0.5), tier_color(0.79));
        assert_eq!(tier_color(0.0), tier_color(0.49));
    }

    #[test]
    fn test_draw_does_not_mutate_source() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            200,
            200,
            image::Rgb([10, 10, 10]),
        ));
        let original = img.clone();

        let det = detection(
            BoundingBox {
                x1: 10,
                y1: 10,
                x2: 100,
                y2: 100,
            },
            0.9,
        );
        let annotated = draw_detections(&img, &[det]);

        assert_eq!(img.to_rgb8().as_raw(), original.to_rgb8().as_raw());
        // Border pixel changed on the copy
        let annotated = annotated.to_rgba8();
        assert_ne!(annotated.get_pixel(10, 10), &Rgba([10, 10, 10, 255]));
    }

    #[test]
    fn test_label_clamped_for_box_at_top_edge() {
        // A box touching y=0 has no room above it; the label must be moved
        // inside the image instead of being drawn at negative coordinates.
        if load_label_font().is_none() {
            eprintln!("skipping: no label font available on this system");
            return;
        }

        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            300,
            300,
            image::Rgb([0, 0, 0]),
        ));
        let det = detection(
            BoundingBox {
                x1: 0,
                y1: 0,
                x2: 120,
                y2: 80,
            },
            0.9,
        );
        let annotated = draw_detections(&img, &[det]).to_rgba8();
        assert_eq!(annotated.dimensions(), (300, 300));

        // The clamped label background starts at the top-left corner.
        // (10, 10) is inside it but off the box border, so it is only
        // painted when the label actually landed inside the image: label
        // background color or a white glyph pixel, never the black source.
        assert_ne!(annotated.get_pixel(10, 10), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_box_border_pixels_painted() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            200,
            200,
            image::Rgb([0, 0, 0]),
        ));
        let det = detection(
            BoundingBox {
                x1: 10,
                y1: 10,
                x2: 100,
                y2: 100,
            },
            0.9,
        );
        let annotated = draw_detections(&img, &[det]).to_rgba8();

        let expected = tier_color(0.9);
        assert_eq!(annotated.get_pixel(50, 10), &expected); // top edge
        assert_eq!(annotated.get_pixel(10, 50), &expected); // left edge
        assert_eq!(annotated.get_pixel(100, 50), &expected); // right edge

        // Box interior untouched
        assert_eq!(annotated.get_pixel(50, 50), &Rgba([0, 0, 0, 255]));
    }
}
