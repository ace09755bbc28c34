use std::collections::HashMap;
use image::{DynamicImage, GenericImageView, GrayImage};
use ndarray::{Array2, Array4};

/// One input to the segmenter: an image and, when available, its ground
/// truth annotation. Width/height are cached from the image at construction.
#[derive(Debug, Clone)]
pub struct BvrSample {
    pub image: DynamicImage,
    /// Per-pixel class ids, same spatial size as `image`.
    pub label: Option<GrayImage>,
    pub img_width: u32,
    pub img_height: u32,
    pub augment: bool,
    /// Resize image and label to this size before preprocessing.
    pub target_size: Option<(u32, u32)>,
}

impl BvrSample {
    pub fn new(image: DynamicImage, label: Option<GrayImage>, augment: bool) -> Self {
        let (img_width, img_height) = image.dimensions();
        Self {
            image,
            label,
            img_width,
            img_height,
            augment,
            target_size: None,
        }
    }

    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_size = Some((width, height));
        self
    }
}

/// Result of one segmentation run.
#[derive(Debug, Clone)]
pub struct BvrSegmentation {
    /// Logits per output head, at merge-stage (or decoder) resolution.
    pub logits: HashMap<String, Array4<f32>>,
    /// Argmax of the `semantic` head, one class id per pixel.
    pub label_map: Array2<i32>,
    pub last_inference_time: u128,
}

impl BvrSegmentation {
    pub fn num_heads(&self) -> usize {
        self.logits.len()
    }

    pub fn print_summary(&self) {
        println!(
            "Segmentation: Heads: {}, Label map: {}x{}, Time: {}ms",
            self.num_heads(),
            self.label_map.nrows(),
            self.label_map.ncols(),
            self.last_inference_time
        );
    }
}
