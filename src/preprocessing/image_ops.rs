//! Functions to resize inputs and convert them to tensors.

use image::{DynamicImage, GrayImage};
use image::imageops::FilterType;
use ndarray::{Array2, Array3};

/// Resizes an image to the target size with bilinear filtering.
pub fn resize_image(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let mut resizer = fast_image_resize::Resizer::new();
    let options = fast_image_resize::ResizeOptions {
        algorithm: fast_image_resize::ResizeAlg::Convolution(
            fast_image_resize::FilterType::Bilinear,
        ),
        ..Default::default()
    };

    let mut new_image = DynamicImage::new(width, height, image.color());
    if let Err(err) = resizer.resize(image, &mut new_image, &options) {
        log::warn!("Failed to use `fast_image_resize` ({err}). Falling back.");
        new_image = image::imageops::resize(image, width, height, FilterType::Triangle).into();
    }
    new_image
}

/// Resizes a label map with nearest-neighbour filtering. Class ids must
/// never be interpolated, so this is the only valid filter for labels.
pub fn resize_label(label: &GrayImage, width: u32, height: u32) -> GrayImage {
    image::imageops::resize(label, width, height, FilterType::Nearest)
}

/// Converts an image to an `[height, width, 3]` tensor of raw u8 values.
pub fn image_to_array(image: &DynamicImage) -> Array3<u8> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw())
        .expect("rgb buffer length matches its dimensions")
}

/// Converts a label map to an `[height, width]` tensor of class ids.
pub fn label_to_array(label: &GrayImage) -> Array2<i32> {
    let (width, height) = label.dimensions();
    let values: Vec<i32> = label.as_raw().iter().map(|&v| v as i32).collect();
    Array2::from_shape_vec((height as usize, width as usize), values)
        .expect("label buffer length matches its dimensions")
}
