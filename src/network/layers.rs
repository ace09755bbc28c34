//! Convolution building blocks with their normalization and activation.
//!
//! Every constructor takes the family's [`HyperParams`] so nested layers
//! inherit consistent defaults without per-call repetition.

use ndarray::{Array1, Array3, Array4};
use rand::rngs::StdRng;
use rand::Rng;
use crate::data::SegError;
use crate::network::hyper_params::HyperParams;
use crate::network::ops;

fn he_uniform_4d(
    shape: (usize, usize, usize, usize),
    fan_in: usize,
    rng: &mut StdRng,
) -> Array4<f32> {
    let limit = (6.0 / fan_in as f32).sqrt();
    Array4::from_shape_fn(shape, |_| rng.gen::<f32>() * 2.0 * limit - limit)
}

fn he_uniform_3d(shape: (usize, usize, usize), fan_in: usize, rng: &mut StdRng) -> Array3<f32> {
    let limit = (6.0 / fan_in as f32).sqrt();
    Array3::from_shape_fn(shape, |_| rng.gen::<f32>() * 2.0 * limit - limit)
}

/// Inference-form batch normalization over the channel axis.
#[derive(Debug, Clone)]
pub struct BatchNorm {
    pub gamma: Array1<f32>,
    pub beta: Array1<f32>,
    pub moving_mean: Array1<f32>,
    pub moving_variance: Array1<f32>,
    pub epsilon: f32,
    pub decay: f32,
    /// Whether the statistics would be updated by a training loop.
    pub trainable: bool,
}

impl BatchNorm {
    pub fn new(channels: usize, params: &HyperParams) -> Self {
        Self {
            gamma: Array1::ones(channels),
            beta: Array1::zeros(channels),
            moving_mean: Array1::zeros(channels),
            moving_variance: Array1::ones(channels),
            epsilon: params.batch_norm_epsilon,
            decay: params.batch_norm_decay,
            trainable: params.train_batch_norm,
        }
    }

    pub fn forward(&self, input: &Array4<f32>) -> Array4<f32> {
        let inv_std = (&self.moving_variance + self.epsilon).mapv(|v| 1.0 / v.sqrt());
        let scale = &self.gamma * &inv_std;
        let shift = &self.beta - &(&self.moving_mean * &scale);
        input * &scale + &shift
    }
}

/// Convolution with optional batch norm and relu.
#[derive(Debug, Clone)]
pub struct Conv2d {
    pub weights: Array4<f32>,
    pub bias: Option<Array1<f32>>,
    pub stride: usize,
    pub rate: usize,
    pub batch_norm: Option<BatchNorm>,
    pub relu: bool,
}

impl Conv2d {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        rate: usize,
        use_batch_norm: bool,
        relu: bool,
        params: &HyperParams,
        rng: &mut StdRng,
    ) -> Self {
        let fan_in = kernel_size * kernel_size * in_channels;
        let weights = he_uniform_4d(
            (kernel_size, kernel_size, in_channels, out_channels),
            fan_in,
            rng,
        );
        // A batch-normalized convolution has no use for a bias: the shift
        // is folded into the normalization offset.
        let bias = (!use_batch_norm).then(|| Array1::zeros(out_channels));
        let batch_norm = use_batch_norm.then(|| BatchNorm::new(out_channels, params));
        Self {
            weights,
            bias,
            stride,
            rate,
            batch_norm,
            relu,
        }
    }

    pub fn out_channels(&self) -> usize {
        self.weights.dim().3
    }

    pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>, SegError> {
        let mut output = ops::conv2d(
            input,
            &self.weights,
            self.bias.as_ref(),
            self.stride,
            self.rate,
        )?;
        if let Some(batch_norm) = &self.batch_norm {
            output = batch_norm.forward(&output);
        }
        if self.relu {
            output = ops::relu(&output);
        }
        Ok(output)
    }
}

/// Depthwise convolution followed by a 1x1 pointwise projection.
#[derive(Debug, Clone)]
pub struct SeparableConv2d {
    pub depthwise: Array3<f32>,
    pub pointwise: Array4<f32>,
    pub bias: Option<Array1<f32>>,
    pub stride: usize,
    pub rate: usize,
    pub depthwise_norm: Option<BatchNorm>,
    pub pointwise_norm: Option<BatchNorm>,
    /// Relu between and after the two stages (otherwise the pair acts as
    /// one linear separable filter).
    pub depth_activation: bool,
}

impl SeparableConv2d {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        rate: usize,
        use_batch_norm: bool,
        depth_activation: bool,
        params: &HyperParams,
        rng: &mut StdRng,
    ) -> Self {
        let depthwise = he_uniform_3d(
            (kernel_size, kernel_size, in_channels),
            kernel_size * kernel_size,
            rng,
        );
        let pointwise = he_uniform_4d((1, 1, in_channels, out_channels), in_channels, rng);
        let bias = (!use_batch_norm).then(|| Array1::zeros(out_channels));
        let depthwise_norm = use_batch_norm.then(|| BatchNorm::new(in_channels, params));
        let pointwise_norm = use_batch_norm.then(|| BatchNorm::new(out_channels, params));
        Self {
            depthwise,
            pointwise,
            bias,
            stride,
            rate,
            depthwise_norm,
            pointwise_norm,
            depth_activation,
        }
    }

    pub fn out_channels(&self) -> usize {
        self.pointwise.dim().3
    }

    pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>, SegError> {
        let mut net = ops::depthwise_conv2d(input, &self.depthwise, self.stride, self.rate)?;
        if let Some(norm) = &self.depthwise_norm {
            net = norm.forward(&net);
        }
        if self.depth_activation {
            net = ops::relu(&net);
        }
        net = ops::conv2d(&net, &self.pointwise, self.bias.as_ref(), 1, 1)?;
        if let Some(norm) = &self.pointwise_norm {
            net = norm.forward(&net);
        }
        if self.depth_activation {
            net = ops::relu(&net);
        }
        Ok(net)
    }
}
