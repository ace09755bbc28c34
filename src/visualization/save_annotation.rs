//! Saves an annotation as one png image, optionally colormapped for better
//! visualization.

use std::path::Path;
use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use ndarray::ArrayD;
use crate::visualization::colormap::label_to_color_image;

/// Saves the given label to `<save_dir>/<filename>.png`.
///
/// With `add_colormap` the label is gathered through the colormap and saved
/// as RGB; otherwise the raw class ids are written as an 8-bit grayscale
/// image.
pub fn save_annotation(
    label: &ArrayD<i32>,
    save_dir: impl AsRef<Path>,
    filename: &str,
    add_colormap: bool,
) -> Result<()> {
    let path = save_dir.as_ref().join(format!("{filename}.png"));

    if add_colormap {
        let colored = label_to_color_image(label)?;
        let (height, width, _) = colored.dim();
        let buffer = colored.as_standard_layout().iter().copied().collect();
        let image = RgbImage::from_raw(width as u32, height as u32, buffer)
            .context("colored label buffer does not match its dimensions")?;
        image.save(&path).context("failed to save annotation")?;
    } else {
        if label.ndim() != 2 {
            anyhow::bail!("Expect 2-D input label, got rank {}", label.ndim());
        }
        let height = label.shape()[0];
        let width = label.shape()[1];
        let buffer = label.iter().map(|&v| v.clamp(0, 255) as u8).collect();
        let image = GrayImage::from_raw(width as u32, height as u32, buffer)
            .context("label buffer does not match its dimensions")?;
        image.save(&path).context("failed to save annotation")?;
    }

    log::trace!("Saved annotation to {}", path.display());
    Ok(())
}
