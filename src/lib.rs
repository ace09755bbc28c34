mod utils;
pub mod data;
pub mod network;
pub mod preprocessing;
pub mod visualization;

use std::time::Instant;
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::data::{BvrSample, BvrSegmentation, ModelOptions, SEMANTIC};
use crate::network::{argmax_label_map, DeepLab};
use crate::preprocessing::{preprocess_image_and_label, resize_image, resize_label};

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Builds the segmentation network described by `options`. Weights are
/// initialized from `seed`, so two calls with the same inputs assemble
/// identical models.
pub fn init_segmenter(options: &ModelOptions, seed: u64) -> anyhow::Result<DeepLab> {
    log::info!(
        "Initializing segmenter\n{}",
        options.to_string()
    );
    let mut rng = StdRng::seed_from_u64(seed);
    let model = DeepLab::new(options, false, false, &mut rng)?;
    Ok(model)
}

/// Runs one sample through the network and reduces the `semantic` head to a
/// per-pixel label map.
pub fn run_segmentation(
    model: &DeepLab,
    sample: BvrSample,
    options: &ModelOptions,
    rng: &mut StdRng,
) -> anyhow::Result<BvrSegmentation> {
    let now = Instant::now();

    let (image, label) = match sample.target_size {
        Some((width, height)) => (
            resize_image(&sample.image, width, height),
            sample.label.map(|l| resize_label(&l, width, height)),
        ),
        None => (sample.image, sample.label),
    };

    let processed = preprocess_image_and_label(
        &image,
        label.as_ref(),
        sample.augment,
        Some(options.model_variant),
        rng,
    )?;

    let batched = processed.image.insert_axis(Axis(0));
    let logits = model.forward(&batched)?;

    let semantic = logits
        .get(SEMANTIC)
        .or_else(|| logits.values().next())
        .ok_or_else(|| anyhow::anyhow!("model produced no output heads"))?;
    let label_map = argmax_label_map(semantic);

    let elapsed = now.elapsed();
    log::trace!("Segmentation | Total={:.2?}", elapsed);

    Ok(BvrSegmentation {
        logits,
        label_map,
        last_inference_time: elapsed.as_millis(),
    })
}

/// Loads the human-readable class names backing the label ids.
pub fn load_label_names(path: &str) -> anyhow::Result<Vec<String>> {
    Ok(utils::file_to_vec(path.to_string())?)
}
