//! Utility functions related to preprocessing inputs.

use ndarray::{Array2, Array3, ArrayD, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use crate::data::SegError;

/// Randomly flips a dimension of the given tensors.
///
/// The decision to flip is made together: all or none of the tensors passed
/// in are flipped. A single uniform value is drawn per call, so paired
/// inputs can never end up with mismatched orientations.
///
/// Returns the possibly flipped tensors and a flag that is `true` if the
/// inputs were flipped.
pub fn flip_dim(
    tensors: Vec<ArrayD<f32>>,
    prob: f32,
    dim: usize,
    rng: &mut StdRng,
) -> Result<(Vec<ArrayD<f32>>, bool), SegError> {
    let random_value: f32 = rng.gen();
    flip_dim_with_draw(tensors, random_value, prob, dim)
}

/// Deterministic body of [`flip_dim`]: the uniform draw in [0, 1) is
/// supplied by the caller. `dim` is validated against every tensor before
/// any data is touched.
pub fn flip_dim_with_draw(
    tensors: Vec<ArrayD<f32>>,
    draw: f32,
    prob: f32,
    dim: usize,
) -> Result<(Vec<ArrayD<f32>>, bool), SegError> {
    for tensor in &tensors {
        if dim >= tensor.ndim() {
            return Err(SegError::InvalidDimension { dim, rank: tensor.ndim() });
        }
    }

    if draw > prob {
        return Ok((tensors, false));
    }

    let flipped = tensors
        .into_iter()
        .map(|tensor| reverse_axis(tensor, dim))
        .collect();
    Ok((flipped, true))
}

/// Flips an image/label pair on one shared draw.
///
/// The image is `[height, width, channels]`, the label `[height, width]`.
/// Exactly one uniform value decides for both tensors; flipping one without
/// the other would desynchronize their spatial alignment.
pub fn flip_pair(
    image: Array3<f32>,
    label: Option<Array2<i32>>,
    prob: f32,
    dim: usize,
    rng: &mut StdRng,
) -> Result<(Array3<f32>, Option<Array2<i32>>, bool), SegError> {
    if dim >= image.ndim() {
        return Err(SegError::InvalidDimension { dim, rank: image.ndim() });
    }
    if let Some(label) = &label {
        if dim >= label.ndim() {
            return Err(SegError::InvalidDimension { dim, rank: label.ndim() });
        }
    }

    let random_value: f32 = rng.gen();
    if random_value > prob {
        return Ok((image, label, false));
    }

    let mut image = image;
    image.invert_axis(Axis(dim));
    let image = image.as_standard_layout().to_owned();

    let label = label.map(|mut label| {
        label.invert_axis(Axis(dim));
        label.as_standard_layout().to_owned()
    });

    Ok((image, label, true))
}

fn reverse_axis(mut tensor: ArrayD<f32>, dim: usize) -> ArrayD<f32> {
    tensor.invert_axis(Axis(dim));
    tensor.as_standard_layout().to_owned()
}
