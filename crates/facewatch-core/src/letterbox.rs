//! Aspect-preserving resize into a square model input.

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;

/// Metadata for mapping model-input coordinates back to the source image.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub new_w: u32,
    pub new_h: u32,
}

impl Letterbox {
    /// Fit a `width`×`height` image inside a `size`×`size` square.
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let side = size as f32;
        let scale = (side / width as f32).min(side / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
        Self {
            scale,
            pad_x: (side - new_w as f32) / 2.0,
            pad_y: (side - new_h as f32) / 2.0,
            new_w,
            new_h,
        }
    }

    /// Map a point in model-input pixels back to source pixels.
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox a grayscale image into a `[1, 3, size, size]` tensor,
/// normalized as `(p - mean) / std` with the gray channel replicated.
/// Padding uses `mean`, so it normalizes to zero.
pub(crate) fn letterbox_tensor(
    image: &GrayImage,
    size: usize,
    mean: f32,
    std: f32,
) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::fit(image.width(), image.height(), size as u32);
    let resized = image::imageops::resize(image, letterbox.new_w, letterbox.new_h, FilterType::Triangle);

    let pad_x = letterbox.pad_x.floor() as usize;
    let pad_y = letterbox.pad_y.floor() as usize;
    let (new_w, new_h) = (letterbox.new_w as usize, letterbox.new_h as usize);

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            let inside = (pad_y..pad_y + new_h).contains(&y) && (pad_x..pad_x + new_w).contains(&x);
            let pixel = if inside {
                resized.get_pixel((x - pad_x) as u32, (y - pad_y) as u32).0[0] as f32
            } else {
                mean
            };

            let normalized = (pixel - mean) / std;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    (tensor, letterbox)
}
