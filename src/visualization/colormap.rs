//! Visualizes segmentation results via the dataset color map.

use ndarray::{Array3, ArrayD};
use once_cell::sync::Lazy;
use crate::data::SegError;

/// Max number of entries in the colormap.
pub const DATASET_MAX_ENTRIES: usize = 256;

static COLORMAP: Lazy<[[u8; 3]; DATASET_MAX_ENTRIES]> = Lazy::new(create_label_colormap);

/// Creates the label colormap.
///
/// Each entry spreads the bits of its index across the three channels: for
/// eight shift levels, every channel takes one bit of the progressively
/// right-shifted index. Deterministic, reproducible bit-for-bit.
pub fn create_label_colormap() -> [[u8; 3]; DATASET_MAX_ENTRIES] {
    let mut colormap = [[0u8; 3]; DATASET_MAX_ENTRIES];
    let mut indices: [u32; DATASET_MAX_ENTRIES] = std::array::from_fn(|i| i as u32);

    for shift in (0..8).rev() {
        for (entry, index) in colormap.iter_mut().zip(indices.iter_mut()) {
            for (channel, value) in entry.iter_mut().enumerate() {
                *value |= ((((*index) >> channel) & 1) << shift) as u8;
            }
            *index >>= 3;
        }
    }
    colormap
}

/// The cached colormap table.
pub fn label_colormap() -> &'static [[u8; 3]; DATASET_MAX_ENTRIES] {
    &COLORMAP
}

/// Adds color defined by the colormap to the label.
///
/// The label must be a 2-D grid of class ids, each within the colormap's
/// capacity; the result is the `[height, width, 3]` color image obtained by
/// gathering from the table.
pub fn label_to_color_image(label: &ArrayD<i32>) -> Result<Array3<u8>, SegError> {
    if label.ndim() != 2 {
        return Err(SegError::InvalidRank {
            expected: 2,
            actual: label.ndim(),
        });
    }
    if let Some(&value) = label.iter().find(|&&v| v < 0 || v as usize >= DATASET_MAX_ENTRIES) {
        return Err(SegError::ValueOutOfRange {
            value: value as i64,
            capacity: DATASET_MAX_ENTRIES,
        });
    }

    let colormap = label_colormap();
    let height = label.shape()[0];
    let width = label.shape()[1];
    let mut image = Array3::<u8>::zeros((height, width, 3));
    for ((row, col), &value) in label
        .view()
        .into_dimensionality::<ndarray::Ix2>()
        .expect("rank was checked above")
        .indexed_iter()
    {
        let color = colormap[value as usize];
        image[[row, col, 0]] = color[0];
        image[[row, col, 1]] = color[1];
        image[[row, col, 2]] = color[2];
    }
    Ok(image)
}
