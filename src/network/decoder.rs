//! Decoder stage: recovers boundary detail lost to backbone downsampling.

use ndarray::Array4;
use rand::rngs::StdRng;
use crate::data::{ModelOptions, SegError};
use crate::network::hyper_params::HyperParams;
use crate::network::layers::{Conv2d, SeparableConv2d};
use crate::network::ops;
use crate::network::xception::EndPoints;

/// Channel depth of the shallow-feature projection.
const SHALLOW_PROJECTION_DEPTH: usize = 48;
/// Channel depth of the refinement convolutions.
const REFINE_DEPTH: usize = 256;

#[derive(Debug)]
enum RefineConv {
    Conv(Conv2d),
    Separable(SeparableConv2d),
}

impl RefineConv {
    fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>, SegError> {
        match self {
            RefineConv::Conv(conv) => conv.forward(input),
            RefineConv::Separable(conv) => conv.forward(input),
        }
    }
}

/// Upsamples the merged features to the decoder output stride, fuses them
/// with a shallow backbone activation, and refines the fusion.
#[derive(Debug)]
pub struct Decoder {
    output_stride: usize,
    end_point: &'static str,
    feature_projection: Conv2d,
    refine: Vec<RefineConv>,
}

impl Decoder {
    pub fn new(
        shallow_channels: usize,
        deep_channels: usize,
        output_stride: usize,
        options: &ModelOptions,
        params: &HyperParams,
        rng: &mut StdRng,
    ) -> Self {
        let feature_projection = Conv2d::new(
            shallow_channels,
            SHALLOW_PROJECTION_DEPTH,
            1,
            1,
            1,
            true,
            true,
            params,
            rng,
        );

        let mut refine = Vec::with_capacity(2);
        let mut refine_in = deep_channels + SHALLOW_PROJECTION_DEPTH;
        for _ in 0..2 {
            refine.push(if options.decoder_use_separable_conv {
                RefineConv::Separable(SeparableConv2d::new(
                    refine_in,
                    REFINE_DEPTH,
                    3,
                    1,
                    1,
                    true,
                    true,
                    params,
                    rng,
                ))
            } else {
                RefineConv::Conv(Conv2d::new(
                    refine_in, REFINE_DEPTH, 3, 1, 1, true, true, params, rng,
                ))
            });
            refine_in = REFINE_DEPTH;
        }

        Self {
            output_stride,
            end_point: options.model_variant.decoder_end_point(),
            feature_projection,
            refine,
        }
    }

    pub fn out_channels(&self) -> usize {
        REFINE_DEPTH
    }

    /// `input_size` is the spatial size of the network input; the decoder
    /// upsamples to `input_size / output_stride`.
    pub fn forward(
        &self,
        features: &Array4<f32>,
        end_points: &EndPoints,
        input_size: (usize, usize),
    ) -> Result<Array4<f32>, SegError> {
        let target_h = ops::scale_dimension(input_size.0, self.output_stride);
        let target_w = ops::scale_dimension(input_size.1, self.output_stride);

        let shallow = end_points
            .get(self.end_point)
            .ok_or_else(|| SegError::MissingEndPoint(self.end_point.to_string()))?;

        let upsampled = ops::resize_bilinear(features, target_h, target_w);
        let projected = self.feature_projection.forward(shallow)?;
        let projected = ops::resize_bilinear(&projected, target_h, target_w);

        let mut net = ops::concat_channels(&[&upsampled, &projected])?;
        for conv in &self.refine {
            net = conv.forward(&net)?;
        }
        Ok(net)
    }
}
