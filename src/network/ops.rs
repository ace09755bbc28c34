//! Eager NHWC tensor kernels shared by all layers.
//!
//! Feature maps are `[batch, height, width, channels]`, convolution weights
//! `[kernel_h, kernel_w, in_channels, out_channels]`. All convolutions use
//! SAME padding with the `ceil(input / stride)` output size rule.

use ndarray::{concatenate, s, Array1, Array2, Array3, Array4, Axis};
use rayon::prelude::*;
use crate::data::{MergeMethod, SegError};

/// Spatial size after striding with SAME padding; also the target size of a
/// feature map at the given output stride: `ceil(size / stride)`.
pub fn scale_dimension(size: usize, stride: usize) -> usize {
    size.div_ceil(stride)
}

/// 2-D convolution with optional stride and atrous rate.
///
/// A rate above 1 inserts `rate - 1` gaps between kernel taps, enlarging
/// the receptive field without touching resolution or parameter count.
pub fn conv2d(
    input: &Array4<f32>,
    weights: &Array4<f32>,
    bias: Option<&Array1<f32>>,
    stride: usize,
    rate: usize,
) -> Result<Array4<f32>, SegError> {
    let (batch, in_h, in_w, in_c) = input.dim();
    let (kernel_h, kernel_w, weights_in_c, out_c) = weights.dim();
    if weights_in_c != in_c {
        return Err(SegError::ShapeMismatch {
            context: "conv2d input channels",
            expected: vec![weights_in_c],
            actual: vec![in_c],
        });
    }

    let eff_kernel_h = (kernel_h - 1) * rate + 1;
    let eff_kernel_w = (kernel_w - 1) * rate + 1;
    let out_h = scale_dimension(in_h, stride);
    let out_w = scale_dimension(in_w, stride);
    let pad_top = ((out_h - 1) * stride + eff_kernel_h).saturating_sub(in_h) / 2;
    let pad_left = ((out_w - 1) * stride + eff_kernel_w).saturating_sub(in_w) / 2;

    let mut output = Array4::<f32>::zeros((batch, out_h, out_w, out_c));
    for b in 0..batch {
        let input_b = input.index_axis(Axis(0), b);
        let mut output_b = output.index_axis_mut(Axis(0), b);
        output_b
            .outer_iter_mut()
            .into_par_iter()
            .enumerate()
            .for_each(|(oh, mut row)| {
                for ow in 0..out_w {
                    let mut acc = Array1::<f32>::zeros(out_c);
                    for ki in 0..kernel_h {
                        let ih = (oh * stride + ki * rate) as isize - pad_top as isize;
                        if ih < 0 || ih >= in_h as isize {
                            continue;
                        }
                        for kj in 0..kernel_w {
                            let iw = (ow * stride + kj * rate) as isize - pad_left as isize;
                            if iw < 0 || iw >= in_w as isize {
                                continue;
                            }
                            let pixel = input_b.slice(s![ih as usize, iw as usize, ..]);
                            let taps = weights.slice(s![ki, kj, .., ..]);
                            acc += &pixel.dot(&taps);
                        }
                    }
                    row.slice_mut(s![ow, ..]).assign(&acc);
                }
            });
    }

    if let Some(bias) = bias {
        output += bias;
    }
    Ok(output)
}

/// Depthwise 2-D convolution: one `[kernel_h, kernel_w]` filter per input
/// channel, weights `[kernel_h, kernel_w, channels]`.
pub fn depthwise_conv2d(
    input: &Array4<f32>,
    weights: &Array3<f32>,
    stride: usize,
    rate: usize,
) -> Result<Array4<f32>, SegError> {
    let (batch, in_h, in_w, in_c) = input.dim();
    let (kernel_h, kernel_w, weights_c) = weights.dim();
    if weights_c != in_c {
        return Err(SegError::ShapeMismatch {
            context: "depthwise_conv2d channels",
            expected: vec![weights_c],
            actual: vec![in_c],
        });
    }

    let eff_kernel_h = (kernel_h - 1) * rate + 1;
    let eff_kernel_w = (kernel_w - 1) * rate + 1;
    let out_h = scale_dimension(in_h, stride);
    let out_w = scale_dimension(in_w, stride);
    let pad_top = ((out_h - 1) * stride + eff_kernel_h).saturating_sub(in_h) / 2;
    let pad_left = ((out_w - 1) * stride + eff_kernel_w).saturating_sub(in_w) / 2;

    let mut output = Array4::<f32>::zeros((batch, out_h, out_w, in_c));
    for b in 0..batch {
        let input_b = input.index_axis(Axis(0), b);
        let mut output_b = output.index_axis_mut(Axis(0), b);
        output_b
            .outer_iter_mut()
            .into_par_iter()
            .enumerate()
            .for_each(|(oh, mut row)| {
                for ow in 0..out_w {
                    let mut acc = Array1::<f32>::zeros(in_c);
                    for ki in 0..kernel_h {
                        let ih = (oh * stride + ki * rate) as isize - pad_top as isize;
                        if ih < 0 || ih >= in_h as isize {
                            continue;
                        }
                        for kj in 0..kernel_w {
                            let iw = (ow * stride + kj * rate) as isize - pad_left as isize;
                            if iw < 0 || iw >= in_w as isize {
                                continue;
                            }
                            let pixel = input_b.slice(s![ih as usize, iw as usize, ..]);
                            let taps = weights.slice(s![ki, kj, ..]);
                            acc += &(&pixel * &taps);
                        }
                    }
                    row.slice_mut(s![ow, ..]).assign(&acc);
                }
            });
    }
    Ok(output)
}

pub fn relu(input: &Array4<f32>) -> Array4<f32> {
    input.mapv(|v| v.max(0.0))
}

/// Global average pooling over the spatial axes, keeping them as size 1.
pub fn global_avg_pool(input: &Array4<f32>) -> Array4<f32> {
    let (_, height, width, _) = input.dim();
    let scale = (height * width) as f32;
    let pooled = input.sum_axis(Axis(1)).sum_axis(Axis(1)) / scale;
    pooled.insert_axis(Axis(1)).insert_axis(Axis(2))
}

/// Bilinear resize with align-corners sampling.
pub fn resize_bilinear(input: &Array4<f32>, out_h: usize, out_w: usize) -> Array4<f32> {
    let (batch, in_h, in_w, channels) = input.dim();
    if out_h == in_h && out_w == in_w {
        return input.clone();
    }

    let scale_h = if out_h > 1 {
        (in_h - 1) as f32 / (out_h - 1) as f32
    } else {
        0.0
    };
    let scale_w = if out_w > 1 {
        (in_w - 1) as f32 / (out_w - 1) as f32
    } else {
        0.0
    };

    let mut output = Array4::<f32>::zeros((batch, out_h, out_w, channels));
    for b in 0..batch {
        for oh in 0..out_h {
            let src_y = oh as f32 * scale_h;
            let y0 = src_y.floor() as usize;
            let y1 = (y0 + 1).min(in_h - 1);
            let fy = src_y - y0 as f32;
            for ow in 0..out_w {
                let src_x = ow as f32 * scale_w;
                let x0 = src_x.floor() as usize;
                let x1 = (x0 + 1).min(in_w - 1);
                let fx = src_x - x0 as f32;

                let top = &input.slice(s![b, y0, x0, ..]) * (1.0 - fx)
                    + &input.slice(s![b, y0, x1, ..]) * fx;
                let bottom = &input.slice(s![b, y1, x0, ..]) * (1.0 - fx)
                    + &input.slice(s![b, y1, x1, ..]) * fx;
                let pixel = top * (1.0 - fy) + bottom * fy;
                output.slice_mut(s![b, oh, ow, ..]).assign(&pixel);
            }
        }
    }
    output
}

/// Concatenates feature maps along the channel axis.
pub fn concat_channels(inputs: &[&Array4<f32>]) -> Result<Array4<f32>, SegError> {
    let views: Vec<_> = inputs.iter().map(|x| x.view()).collect();
    concatenate(Axis(3), &views).map_err(|_| SegError::ShapeMismatch {
        context: "concat_channels",
        expected: inputs
            .first()
            .map(|x| x.shape().to_vec())
            .unwrap_or_default(),
        actual: inputs
            .last()
            .map(|x| x.shape().to_vec())
            .unwrap_or_default(),
    })
}

/// Merges equally-shaped branch outputs element-wise.
///
/// `Max` keeps, per element, the strongest branch response; `Avg` weighs
/// all receptive-field scales uniformly.
pub fn merge_branches(
    branches: &[Array4<f32>],
    method: MergeMethod,
) -> Result<Array4<f32>, SegError> {
    let first = branches.first().ok_or(SegError::ShapeMismatch {
        context: "merge_branches",
        expected: vec![1],
        actual: vec![0],
    })?;
    for branch in &branches[1..] {
        if branch.dim() != first.dim() {
            return Err(SegError::ShapeMismatch {
                context: "merge_branches",
                expected: first.shape().to_vec(),
                actual: branch.shape().to_vec(),
            });
        }
    }

    let merged = match method {
        MergeMethod::Max => {
            let mut merged = first.clone();
            for branch in &branches[1..] {
                ndarray::Zip::from(&mut merged)
                    .and(branch)
                    .for_each(|m, &b| *m = m.max(b));
            }
            merged
        }
        MergeMethod::Avg => {
            let mut merged = first.clone();
            for branch in &branches[1..] {
                merged += branch;
            }
            merged / branches.len() as f32
        }
    };
    Ok(merged)
}

/// Per-pixel argmax over the channel axis, as `[batch, height, width]`
/// class ids.
pub fn argmax_channels(logits: &Array4<f32>) -> Array3<i32> {
    let (batch, height, width, _) = logits.dim();
    let mut labels = Array3::<i32>::zeros((batch, height, width));
    for b in 0..batch {
        for h in 0..height {
            for w in 0..width {
                let scores = logits.slice(s![b, h, w, ..]);
                let mut best = 0usize;
                let mut best_score = f32::NEG_INFINITY;
                for (idx, &score) in scores.iter().enumerate() {
                    if score > best_score {
                        best = idx;
                        best_score = score;
                    }
                }
                labels[[b, h, w]] = best as i32;
            }
        }
    }
    labels
}

/// Argmax of the first batch element as a 2-D label map.
pub fn argmax_label_map(logits: &Array4<f32>) -> Array2<i32> {
    argmax_channels(logits)
        .index_axis(Axis(0), 0)
        .to_owned()
}
