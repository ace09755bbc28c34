//! Atrous Spatial Pyramid Pooling.

use ndarray::Array4;
use rand::rngs::StdRng;
use crate::data::{MergeMethod, ModelOptions, SegError};
use crate::network::hyper_params::HyperParams;
use crate::network::layers::{Conv2d, SeparableConv2d};
use crate::network::ops;

/// Channel depth of every ASPP branch.
const ASPP_DEPTH: usize = 256;

#[derive(Debug)]
enum AsppBranch {
    Conv(Conv2d),
    Separable(SeparableConv2d),
}

impl AsppBranch {
    fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>, SegError> {
        match self {
            AsppBranch::Conv(conv) => conv.forward(input),
            AsppBranch::Separable(conv) => conv.forward(input),
        }
    }
}

/// The ASPP branch bank.
///
/// One branch per configured atrous rate (or a single 1x1 projection when
/// no rates are configured), plus an optional image-level branch that pools
/// the whole feature map and broadcasts it back, injecting context no
/// local receptive field can see. Branch outputs all share one depth and
/// are merged element-wise.
#[derive(Debug)]
pub struct Aspp {
    image_level: Option<Conv2d>,
    branches: Vec<AsppBranch>,
    projection: Conv2d,
    merge_method: MergeMethod,
}

impl Aspp {
    pub fn new(
        in_channels: usize,
        options: &ModelOptions,
        params: &HyperParams,
        rng: &mut StdRng,
    ) -> Self {
        let use_bn = options.aspp_with_batch_norm;

        let image_level = options
            .add_image_level_feature
            .then(|| Conv2d::new(in_channels, ASPP_DEPTH, 1, 1, 1, use_bn, true, params, rng));

        let branches = if options.atrous_rates.is_empty() {
            // No dilated context: a lone 1x1 projection branch.
            vec![AsppBranch::Conv(Conv2d::new(
                in_channels,
                ASPP_DEPTH,
                1,
                1,
                1,
                use_bn,
                true,
                params,
                rng,
            ))]
        } else {
            options
                .atrous_rates
                .iter()
                .map(|&rate| {
                    if options.aspp_with_separable_conv {
                        AsppBranch::Separable(SeparableConv2d::new(
                            in_channels,
                            ASPP_DEPTH,
                            3,
                            1,
                            rate,
                            use_bn,
                            true,
                            params,
                            rng,
                        ))
                    } else {
                        AsppBranch::Conv(Conv2d::new(
                            in_channels,
                            ASPP_DEPTH,
                            3,
                            1,
                            rate,
                            use_bn,
                            true,
                            params,
                            rng,
                        ))
                    }
                })
                .collect()
        };

        let projection = Conv2d::new(ASPP_DEPTH, ASPP_DEPTH, 1, 1, 1, use_bn, true, params, rng);

        Self {
            image_level,
            branches,
            projection,
            merge_method: options.merge_method,
        }
    }

    /// Total branch count, the image-level branch included.
    pub fn num_branches(&self) -> usize {
        self.branches.len() + usize::from(self.image_level.is_some())
    }

    pub fn out_channels(&self) -> usize {
        self.projection.out_channels()
    }

    pub fn forward(&self, features: &Array4<f32>) -> Result<Array4<f32>, SegError> {
        let (_, height, width, _) = features.dim();
        let mut outputs = Vec::with_capacity(self.num_branches());

        if let Some(image_level) = &self.image_level {
            let pooled = ops::global_avg_pool(features);
            let projected = image_level.forward(&pooled)?;
            outputs.push(ops::resize_bilinear(&projected, height, width));
        }
        for branch in &self.branches {
            outputs.push(branch.forward(features)?);
        }

        let merged = ops::merge_branches(&outputs, self.merge_method)?;
        self.projection.forward(&merged)
    }
}
