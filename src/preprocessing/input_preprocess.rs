//! Prepares the data used for segmentation training/evaluation.

use image::{DynamicImage, GrayImage};
use ndarray::{s, Array2, Array3};
use rand::rngs::StdRng;
use crate::data::{ModelVariant, SegError};
use crate::network::mean_pixel;
use crate::preprocessing::{image_to_array, label_to_array, flip_pair};

// The probability of flipping the images and labels
// left-right during training
const PROB_OF_FLIP: f32 = 0.5;

// Flipped spatial dimension: 1 is width, a left-right flip.
const FLIP_DIM: usize = 1;

/// Output of [`preprocess_image_and_label`].
#[derive(Debug, Clone)]
pub struct PreprocessedSample {
    /// Unmodified input, kept for later visualization/overlay.
    pub original_image: Array3<u8>,
    /// Float image with the variant's mean pixel subtracted.
    pub image: Array3<f32>,
    /// Ground truth class ids, when provided.
    pub label: Option<Array2<i32>>,
    pub flipped: bool,
}

/// Preprocesses the image and label.
///
/// During training the label is mandatory and the pair is randomly flipped
/// left-right on one shared draw. A missing `model_variant` is not an
/// error: a warning is logged and the generic mean pixel is subtracted.
pub fn preprocess_image_and_label(
    image: &DynamicImage,
    label: Option<&GrayImage>,
    is_training: bool,
    model_variant: Option<ModelVariant>,
    rng: &mut StdRng,
) -> Result<PreprocessedSample, SegError> {
    if is_training && label.is_none() {
        return Err(SegError::MissingLabel);
    }
    if model_variant.is_none() {
        log::warn!(
            "Default mean-subtraction is performed. Please specify a model_variant \
            for the mean values matching the chosen backbone."
        );
    }

    // Keep reference to original image.
    let original_image = image_to_array(image);

    let mut processed_image = original_image.mapv(|v| v as f32);
    let mean = mean_pixel(model_variant);
    for (channel, mean_value) in mean.iter().enumerate() {
        processed_image
            .slice_mut(s![.., .., channel])
            .mapv_inplace(|v| v - mean_value);
    }

    let processed_label = label.map(label_to_array);

    let (processed_image, processed_label, flipped) = if is_training {
        flip_pair(processed_image, processed_label, PROB_OF_FLIP, FLIP_DIM, rng)?
    } else {
        (processed_image, processed_label, false)
    };

    Ok(PreprocessedSample {
        original_image,
        image: processed_image,
        label: processed_label,
        flipped,
    })
}
