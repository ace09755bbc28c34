//! Extracts features by the particular model variant.

use ndarray::Array4;
use rand::rngs::StdRng;
use crate::data::{ModelVariant, SegError};
use crate::network::hyper_params::HyperParams;
use crate::network::xception::{EndPoints, Xception65, XceptionConfig};

// Mean pixel value per channel, RGB order, shared by the registered
// ImageNet-pretrained variants and used as the generic default.
const MEAN_RGB: [f32; 3] = [123.68, 116.779, 103.939];

/// Mean pixel for the given variant; the generic default when unspecified.
pub fn mean_pixel(model_variant: Option<ModelVariant>) -> [f32; 3] {
    match model_variant {
        Some(ModelVariant::Xception65) | None => MEAN_RGB,
    }
}

/// Arguments of feature extraction that are not part of [`crate::data::ModelOptions`].
#[derive(Debug, Clone)]
pub struct FeatureExtractionOptions {
    pub output_stride: usize,
    pub multi_grid: Option<Vec<usize>>,
    /// Channel multiplier for depth-scaled variants (MobileNet family).
    /// The xception variants ignore it.
    pub depth_multiplier: f32,
    pub weight_decay: f32,
    pub is_training: bool,
    pub fine_tune_batch_norm: bool,
    pub regularize_depthwise: bool,
    /// Classification head size; dense prediction tasks leave this `None`.
    pub num_classes: Option<usize>,
    /// Global pooling for image classification; dense prediction tasks do
    /// not use this.
    pub global_pool: bool,
}

impl Default for FeatureExtractionOptions {
    fn default() -> Self {
        Self {
            output_stride: 8,
            multi_grid: None,
            depth_multiplier: 1.0,
            weight_decay: 1e-4,
            is_training: false,
            fine_tune_batch_norm: false,
            regularize_depthwise: false,
            num_classes: None,
            global_pool: false,
        }
    }
}

/// The registered backbones. Dispatch is a closed match, so an unsupported
/// variant can never slip past construction.
#[derive(Debug)]
enum Backbone {
    Xception65(Xception65),
}

#[derive(Debug)]
pub struct FeatureExtractor {
    variant: ModelVariant,
    backbone: Backbone,
}

impl FeatureExtractor {
    pub fn new(
        variant: ModelVariant,
        options: &FeatureExtractionOptions,
        rng: &mut StdRng,
    ) -> Result<Self, SegError> {
        let backbone = match variant {
            ModelVariant::Xception65 => {
                let params = HyperParams::xception(
                    options.weight_decay,
                    options.regularize_depthwise,
                    options.is_training,
                    options.fine_tune_batch_norm,
                );
                let config = XceptionConfig {
                    output_stride: options.output_stride,
                    multi_grid: options.multi_grid.clone(),
                    num_classes: options.num_classes,
                    global_pool: options.global_pool,
                };
                Backbone::Xception65(Xception65::new(&config, &params, rng)?)
            }
        };
        Ok(Self { variant, backbone })
    }

    /// Resolves the variant by name first; an unrecognized name fails with
    /// [`SegError::UnknownVariant`] before anything is built.
    pub fn from_name(
        name: &str,
        options: &FeatureExtractionOptions,
        rng: &mut StdRng,
    ) -> Result<Self, SegError> {
        let variant = ModelVariant::from_name(name)?;
        Self::new(variant, options, rng)
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Channel count of the feature map returned by [`Self::extract_features`].
    pub fn output_channels(&self) -> usize {
        match &self.backbone {
            Backbone::Xception65(net) => net.output_channels(),
        }
    }

    /// Channel count of the end point the decoder fuses with.
    pub fn decoder_end_point_channels(&self) -> usize {
        match self.variant {
            ModelVariant::Xception65 => 256,
        }
    }

    /// Runs the backbone, returning the deepest feature map and the named
    /// intermediate activations.
    pub fn extract_features(
        &self,
        images: &Array4<f32>,
    ) -> Result<(Array4<f32>, EndPoints), SegError> {
        match &self.backbone {
            Backbone::Xception65(net) => net.forward(images),
        }
    }
}
