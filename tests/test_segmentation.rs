extern crate bvr_segment;

use image::{DynamicImage, RgbImage};
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use bvr_segment::data::{BvrSample, FsAccess, MergeMethod, ModelOptions, ModelVariant, SegError};
use bvr_segment::network::{
    merge_branches, Aspp, FeatureExtractionOptions, FeatureExtractor, HyperParams,
};
use bvr_segment::visualization::save_annotation;

const INPUT_SIZE: u32 = 17;

fn test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 13) as u8, (y * 11) as u8, ((x + y) * 7) as u8])
    }))
}

#[test]
fn unknown_variant_fails_fast() {
    assert!(matches!(
        ModelVariant::from_name("unknown_xyz"),
        Err(SegError::UnknownVariant(name)) if name == "unknown_xyz"
    ));

    let mut rng = StdRng::seed_from_u64(0);
    let options = FeatureExtractionOptions::default();
    assert!(matches!(
        FeatureExtractor::from_name("unknown_xyz", &options, &mut rng),
        Err(SegError::UnknownVariant(_))
    ));
}

#[test]
fn aspp_branch_counts_follow_configuration() {
    let mut rng = StdRng::seed_from_u64(1);
    let params = HyperParams::dense_prediction(1e-4, false, false);

    let with_rates = ModelOptions::semantic(5).with_atrous_rates(&[6, 12, 18]);
    assert_eq!(Aspp::new(8, &with_rates, &params, &mut rng).num_branches(), 4);

    let without_rates = ModelOptions::semantic(5);
    assert_eq!(Aspp::new(8, &without_rates, &params, &mut rng).num_branches(), 2);

    let no_image_level = ModelOptions::semantic(5).with_image_level_feature(false);
    assert_eq!(Aspp::new(8, &no_image_level, &params, &mut rng).num_branches(), 1);

    let single_rate = ModelOptions::semantic(5)
        .with_atrous_rates(&[2])
        .with_image_level_feature(false);
    assert_eq!(Aspp::new(8, &single_rate, &params, &mut rng).num_branches(), 1);
}

#[test]
fn merge_methods_combine_branches_elementwise() {
    let first = Array4::from_shape_vec((1, 1, 1, 2), vec![1.0, 2.0]).unwrap();
    let second = Array4::from_shape_vec((1, 1, 1, 2), vec![3.0, 0.0]).unwrap();

    let max = merge_branches(&[first.clone(), second.clone()], MergeMethod::Max).unwrap();
    assert_eq!(max.as_slice().unwrap(), &[3.0, 2.0]);

    let avg = merge_branches(&[first, second], MergeMethod::Avg).unwrap();
    assert_eq!(avg.as_slice().unwrap(), &[2.0, 1.0]);
}

#[test]
fn merge_rejects_mismatched_branches() {
    let first = Array4::<f32>::zeros((1, 2, 2, 3));
    let second = Array4::<f32>::zeros((1, 2, 3, 3));
    assert!(merge_branches(&[first, second], MergeMethod::Max).is_err());
}

#[test]
fn without_decoder_logits_stay_at_merge_resolution() {
    let options = ModelOptions::semantic(5)
        .with_output_stride(16)
        .with_atrous_rates(&[6, 12, 18]);
    let model = bvr_segment::init_segmenter(&options, 42).unwrap();
    assert!(!model.has_decoder());

    let images = Array4::<f32>::from_elem((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3), 0.5);
    let outputs = model.forward(&images).unwrap();

    // ceil(17 / 16) = 2: the merge-stage resolution, not a refined one.
    let logits = &outputs["semantic"];
    assert_eq!(logits.dim(), (1, 2, 2, 5));
    assert!(logits.iter().all(|v| v.is_finite()));
}

#[test]
fn decoder_refines_to_its_output_stride() {
    let options = ModelOptions::semantic(4)
        .with_output("parts", 3)
        .with_output_stride(16)
        .with_atrous_rates(&[6, 12, 18])
        .with_multi_grid(&[1, 2, 4])
        .with_decoder_output_stride(4);
    let model = bvr_segment::init_segmenter(&options, 42).unwrap();
    assert!(model.has_decoder());
    assert_eq!(model.aspp().num_branches(), 4);

    let images = Array4::<f32>::from_elem((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3), 0.5);
    let outputs = model.forward(&images).unwrap();
    assert_eq!(outputs.len(), 2);

    // ceil(17 / 4) = 5: both heads share the decoder resolution.
    assert_eq!(outputs["semantic"].dim(), (1, 5, 5, 4));
    assert_eq!(outputs["parts"].dim(), (1, 5, 5, 3));
}

#[test]
fn segmentation_end_to_end() {
    let options = ModelOptions::semantic(6)
        .with_output_stride(16)
        .with_atrous_rates(&[6, 12, 18]);
    let model = bvr_segment::init_segmenter(&options, 7).unwrap();

    // A larger frame resized down to the working resolution first.
    let sample = BvrSample::new(test_image(64, 48), None, false)
        .with_target_size(INPUT_SIZE, INPUT_SIZE);
    let mut rng = StdRng::seed_from_u64(7);
    let result = bvr_segment::run_segmentation(&model, sample, &options, &mut rng).unwrap();

    assert_eq!(result.label_map.dim(), (2, 2));
    assert!(result.label_map.iter().all(|&v| (0..6).contains(&v)));
    result.print_summary();

    let save_dir = FsAccess::save_out(&["tests"]).unwrap();
    save_annotation(&result.label_map.clone().into_dyn(), save_dir, "test_output", true).unwrap();
}
