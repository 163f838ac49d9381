use image::DynamicImage;
use ndarray::Array;

use crate::errors::DetectError;

/// Letterbox geometry for one preprocessed image, kept so detections can be
/// mapped back from model-input coordinates to the original image.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    pub scale: f32,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl Letterbox {
    pub fn compute(orig_width: u32, orig_height: u32, target_size: u32) -> Self {
        let max_dim = orig_width.max(orig_height);
        let scale = target_size as f32 / max_dim as f32;
        let new_width = (orig_width as f32 * scale) as u32;
        let new_height = (orig_height as f32 * scale) as u32;

        Self {
            scale,
            x_offset: (target_size - new_width) / 2,
            y_offset: (target_size - new_height) / 2,
        }
    }

    /// Map a model-input coordinate back into original-image space.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.x_offset as f32) / self.scale,
            (y - self.y_offset as f32) / self.scale,
        )
    }
}

/// Letterbox-resize to a square model input with gray padding and convert to
/// a normalized NCHW f32 tensor.
pub fn preprocess_image(
    img: &DynamicImage,
    target_size: u32,
) -> Result<(Array<f32, ndarray::IxDyn>, Letterbox), DetectError> {
    let rgb_img = img.to_rgb8();
    let (orig_width, orig_height) = rgb_img.dimensions();

    let letterbox = Letterbox::compute(orig_width, orig_height, target_size);
    let new_width = (orig_width as f32 * letterbox.scale) as u32;
    let new_height = (orig_height as f32 * letterbox.scale) as u32;

    let resized = image::imageops::resize(
        &rgb_img,
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    );

    // Gray padding (114,114,114), the value YOLO models are trained with
    let mut letterboxed = image::RgbImage::new(target_size, target_size);
    for pixel in letterboxed.pixels_mut() {
        *pixel = image::Rgb([114, 114, 114]);
    }

    for y in 0..new_height {
        for x in 0..new_width {
            let src_pixel = resized.get_pixel(x, y);
            letterboxed.put_pixel(x + letterbox.x_offset, y + letterbox.y_offset, *src_pixel);
        }
    }

    // NCHW order: channel, then row, then column
    let mut input_data = Vec::with_capacity((3 * target_size * target_size) as usize);
    for c in 0..3 {
        for y in 0..target_size {
            for x in 0..target_size {
                let pixel = letterboxed.get_pixel(x, y);
                input_data.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    let input = Array::from_shape_vec(
        ndarray::IxDyn(&[1, 3, target_size as usize, target_size as usize]),
        input_data,
    )
    .map_err(|e| DetectError::Inference(format!("failed to shape input tensor: {e}")))?;

    Ok((input, letterbox))
}
