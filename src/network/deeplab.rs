//! Model assembly: backbone features, ASPP context, optional decoder
//! refinement, and the logits heads.

use std::collections::{BTreeMap, HashMap};
use ndarray::Array4;
use rand::rngs::StdRng;
use crate::data::{ModelOptions, SegError};
use crate::network::aspp::Aspp;
use crate::network::decoder::Decoder;
use crate::network::feature_extractor::{FeatureExtractionOptions, FeatureExtractor};
use crate::network::hyper_params::HyperParams;
use crate::network::layers::Conv2d;

const WEIGHT_DECAY: f32 = 1e-4;

/// The assembled network.
///
/// A forward pass is strictly sequential: extract features, build and merge
/// the ASPP branches, optionally refine through the decoder, then emit one
/// logits map per output head.
#[derive(Debug)]
pub struct DeepLab {
    options: ModelOptions,
    feature_extractor: FeatureExtractor,
    aspp: Aspp,
    decoder: Option<Decoder>,
    logits_heads: BTreeMap<String, Conv2d>,
}

impl DeepLab {
    pub fn new(
        options: &ModelOptions,
        is_training: bool,
        fine_tune_batch_norm: bool,
        rng: &mut StdRng,
    ) -> Result<Self, SegError> {
        if options.outputs_to_num_classes.is_empty() {
            return Err(SegError::ShapeMismatch {
                context: "outputs_to_num_classes",
                expected: vec![1],
                actual: vec![0],
            });
        }
        if options.logits_kernel_size % 2 == 0 {
            return Err(SegError::ShapeMismatch {
                context: "logits_kernel_size (must be odd)",
                expected: vec![1],
                actual: vec![options.logits_kernel_size],
            });
        }

        let extraction_options = FeatureExtractionOptions {
            output_stride: options.output_stride,
            multi_grid: options.multi_grid.clone(),
            weight_decay: WEIGHT_DECAY,
            is_training,
            fine_tune_batch_norm,
            ..Default::default()
        };
        let feature_extractor =
            FeatureExtractor::new(options.model_variant, &extraction_options, rng)?;

        let head_params = HyperParams::dense_prediction(WEIGHT_DECAY, is_training, fine_tune_batch_norm);
        let aspp = Aspp::new(
            feature_extractor.output_channels(),
            options,
            &head_params,
            rng,
        );

        let decoder = options.decoder_output_stride.map(|decoder_output_stride| {
            Decoder::new(
                feature_extractor.decoder_end_point_channels(),
                aspp.out_channels(),
                decoder_output_stride,
                options,
                &head_params,
                rng,
            )
        });

        let logits_in = decoder
            .as_ref()
            .map(Decoder::out_channels)
            .unwrap_or_else(|| aspp.out_channels());
        let mut logits_heads = BTreeMap::new();
        for (name, &num_classes) in &options.outputs_to_num_classes {
            logits_heads.insert(
                name.clone(),
                Conv2d::new(
                    logits_in,
                    num_classes,
                    options.logits_kernel_size,
                    1,
                    1,
                    false,
                    false,
                    &head_params,
                    rng,
                ),
            );
        }

        log::info!(
            "Assembled {} | output stride: {} | ASPP branches: {} | decoder: {:?}",
            options.model_variant.name(),
            options.output_stride,
            aspp.num_branches(),
            options.decoder_output_stride,
        );

        Ok(Self {
            options: options.clone(),
            feature_extractor,
            aspp,
            decoder,
            logits_heads,
        })
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn aspp(&self) -> &Aspp {
        &self.aspp
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    /// Runs the network on a `[batch, height, width, 3]` image tensor and
    /// returns one logits tensor per output head.
    pub fn forward(
        &self,
        images: &Array4<f32>,
    ) -> Result<HashMap<String, Array4<f32>>, SegError> {
        let (_, input_h, input_w, _) = images.dim();

        let (features, end_points) = self.feature_extractor.extract_features(images)?;
        let mut net = self.aspp.forward(&features)?;
        if let Some(decoder) = &self.decoder {
            net = decoder.forward(&net, &end_points, (input_h, input_w))?;
        }

        let mut outputs = HashMap::with_capacity(self.logits_heads.len());
        for (name, head) in &self.logits_heads {
            outputs.insert(name.clone(), head.forward(&net)?);
        }
        Ok(outputs)
    }
}
