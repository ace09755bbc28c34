//! Xception-65 backbone with atrous (dense-prediction) output strides.
//!
//! The network is assembled as a flat list of residual units. Once the
//! accumulated stride reaches the requested output stride, every later unit
//! runs with stride 1 and folds the stride it would have applied into its
//! atrous rate, so resolution stops shrinking while receptive fields keep
//! growing.

use std::collections::HashMap;
use ndarray::Array4;
use rand::rngs::StdRng;
use crate::data::SegError;
use crate::network::hyper_params::HyperParams;
use crate::network::layers::{Conv2d, SeparableConv2d};
use crate::network::ops;

/// Named intermediate activations exposed for reuse elsewhere in the model.
pub type EndPoints = HashMap<String, Array4<f32>>;

#[derive(Debug, Clone)]
pub struct XceptionConfig {
    pub output_stride: usize,
    /// Atrous rate hierarchy for the three convolutions of the last unit.
    pub multi_grid: Option<Vec<usize>>,
    /// Classification head size; dense prediction leaves this `None`.
    pub num_classes: Option<usize>,
    pub global_pool: bool,
}

impl Default for XceptionConfig {
    fn default() -> Self {
        Self {
            output_stride: 8,
            multi_grid: None,
            num_classes: None,
            global_pool: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SkipKind {
    Conv,
    Sum,
    None,
}

#[derive(Debug)]
enum Skip {
    Conv(Conv2d),
    Sum,
    None,
}

/// One residual unit: three separable convolutions plus a skip connection.
#[derive(Debug)]
struct XceptionModule {
    convs: Vec<SeparableConv2d>,
    skip: Skip,
    record_mid: bool,
}

impl XceptionModule {
    #[allow(clippy::too_many_arguments)]
    fn new(
        in_channels: usize,
        depths: [usize; 3],
        stride: usize,
        rate: usize,
        unit_rates: [usize; 3],
        skip: SkipKind,
        record_mid: bool,
        params: &HyperParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut convs = Vec::with_capacity(3);
        let mut conv_in = in_channels;
        for (i, &depth) in depths.iter().enumerate() {
            // The unit's stride lives on its last separable conv.
            let conv_stride = if i == 2 { stride } else { 1 };
            convs.push(SeparableConv2d::new(
                conv_in,
                depth,
                3,
                conv_stride,
                rate * unit_rates[i],
                true,
                false,
                params,
                rng,
            ));
            conv_in = depth;
        }

        let skip = match skip {
            SkipKind::Conv => Skip::Conv(Conv2d::new(
                in_channels,
                depths[2],
                1,
                stride,
                1,
                true,
                false,
                params,
                rng,
            )),
            SkipKind::Sum => Skip::Sum,
            SkipKind::None => Skip::None,
        };

        Self {
            convs,
            skip,
            record_mid,
        }
    }

    fn forward(
        &self,
        input: &Array4<f32>,
    ) -> Result<(Array4<f32>, Option<Array4<f32>>), SegError> {
        let mut net = input.clone();
        let mut mid = None;
        for (i, conv) in self.convs.iter().enumerate() {
            net = ops::relu(&net);
            net = conv.forward(&net)?;
            if i == 1 && self.record_mid {
                mid = Some(net.clone());
            }
        }
        let output = match &self.skip {
            Skip::Conv(shortcut) => shortcut.forward(input)? + net,
            Skip::Sum => input + &net,
            Skip::None => net,
        };
        Ok((output, mid))
    }
}

#[derive(Debug)]
struct XceptionUnit {
    module: XceptionModule,
    /// End-point name for the unit's output, when it closes a named block.
    output_end_point: Option<String>,
    /// End-point name for the second separable conv, the decoder tap.
    mid_end_point: Option<String>,
}

#[derive(Debug)]
pub struct Xception65 {
    stem_conv1: Conv2d,
    stem_conv2: Conv2d,
    units: Vec<XceptionUnit>,
    global_pool: bool,
    classifier: Option<Conv2d>,
    output_channels: usize,
}

impl Xception65 {
    pub fn new(
        config: &XceptionConfig,
        params: &HyperParams,
        rng: &mut StdRng,
    ) -> Result<Self, SegError> {
        let output_stride = config.output_stride;
        if !output_stride.is_power_of_two() || !(4..=32).contains(&output_stride) {
            return Err(SegError::ShapeMismatch {
                context: "xception output_stride",
                expected: vec![4, 8, 16, 32],
                actual: vec![output_stride],
            });
        }
        let multi_grid = match &config.multi_grid {
            Some(rates) => {
                if rates.len() != 3 {
                    return Err(SegError::ShapeMismatch {
                        context: "multi_grid",
                        expected: vec![3],
                        actual: vec![rates.len()],
                    });
                }
                [rates[0], rates[1], rates[2]]
            }
            None => [1, 1, 1],
        };

        let stem_conv1 = Conv2d::new(3, 32, 3, 2, 1, true, true, params, rng);
        let stem_conv2 = Conv2d::new(32, 64, 3, 1, 1, true, true, params, rng);

        let no_grid = [1usize, 1, 1];
        let blocks: [(&str, [usize; 3], usize, usize, SkipKind, [usize; 3], bool); 6] = [
            ("entry_flow/block1", [128, 128, 128], 1, 2, SkipKind::Conv, no_grid, true),
            ("entry_flow/block2", [256, 256, 256], 1, 2, SkipKind::Conv, no_grid, true),
            ("entry_flow/block3", [728, 728, 728], 1, 2, SkipKind::Conv, no_grid, true),
            ("middle_flow/block1", [728, 728, 728], 16, 1, SkipKind::Sum, no_grid, false),
            ("exit_flow/block1", [728, 1024, 1024], 1, 2, SkipKind::Conv, no_grid, false),
            ("exit_flow/block2", [1536, 1536, 2048], 1, 1, SkipKind::None, multi_grid, false),
        ];

        // Stem conv1 already divided the resolution by two.
        let mut current_stride = 2usize;
        let mut rate = 1usize;
        let mut in_channels = 64usize;
        let mut units = Vec::new();

        for (name, depths, unit_count, block_stride, skip, unit_rates, record_output) in blocks {
            for unit_idx in 0..unit_count {
                let nominal_stride = if unit_idx == unit_count - 1 {
                    block_stride
                } else {
                    1
                };
                let (unit_stride, unit_rate) = if current_stride == output_stride {
                    let unit_rate = rate;
                    rate *= nominal_stride;
                    (1, unit_rate)
                } else {
                    current_stride *= nominal_stride;
                    (nominal_stride, 1)
                };

                let record_mid = name == "entry_flow/block2" && unit_idx == 0;
                let module = XceptionModule::new(
                    in_channels,
                    depths,
                    unit_stride,
                    unit_rate,
                    unit_rates,
                    skip,
                    record_mid,
                    params,
                    rng,
                );
                units.push(XceptionUnit {
                    module,
                    output_end_point: (record_output && unit_idx == unit_count - 1)
                        .then(|| name.to_string()),
                    mid_end_point: record_mid.then(|| {
                        format!("{name}/unit_{}/xception_module/separable_conv2_pointwise", unit_idx + 1)
                    }),
                });
                in_channels = depths[2];
            }
        }

        let classifier = config
            .num_classes
            .map(|num_classes| Conv2d::new(in_channels, num_classes, 1, 1, 1, false, false, params, rng));

        Ok(Self {
            stem_conv1,
            stem_conv2,
            units,
            global_pool: config.global_pool,
            classifier,
            output_channels: in_channels,
        })
    }

    /// Channel count of the deepest feature map.
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    pub fn forward(&self, images: &Array4<f32>) -> Result<(Array4<f32>, EndPoints), SegError> {
        let mut end_points = EndPoints::new();
        let mut net = self.stem_conv1.forward(images)?;
        net = self.stem_conv2.forward(&net)?;

        for unit in &self.units {
            let (output, mid) = unit.module.forward(&net)?;
            if let (Some(name), Some(mid)) = (&unit.mid_end_point, mid) {
                end_points.insert(name.clone(), mid);
            }
            net = output;
            if let Some(name) = &unit.output_end_point {
                end_points.insert(name.clone(), net.clone());
            }
        }

        if self.global_pool {
            net = ops::global_avg_pool(&net);
        }
        if let Some(classifier) = &self.classifier {
            net = classifier.forward(&net)?;
        }
        Ok((net, end_points))
    }
}
