extern crate bvr_segment;

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use bvr_segment::data::{ModelVariant, SegError};
use bvr_segment::preprocessing::{
    flip_dim, flip_dim_with_draw, flip_pair, preprocess_image_and_label,
};

fn ramp_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([x as u8, y as u8, 100])
    }))
}

fn ramp_label(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| image::Luma([x as u8]))
}

#[test]
fn flip_dim_draw_below_prob_reverses_all_tensors() {
    let image = Array3::from_shape_fn((2, 4, 3), |(h, w, c)| (h * 100 + w * 10 + c) as f32);
    let label = Array2::from_shape_fn((2, 4), |(h, w)| (h * 10 + w) as f32);
    let tensors = vec![image.clone().into_dyn(), label.clone().into_dyn()];

    let (flipped, was_flipped) = flip_dim_with_draw(tensors, 0.3, 0.5, 1).unwrap();
    assert!(was_flipped);
    assert_eq!(flipped[0][[0, 0, 0]], image[[0, 3, 0]]);
    assert_eq!(flipped[0][[1, 3, 2]], image[[1, 0, 2]]);
    assert_eq!(flipped[1][[0, 0]], label[[0, 3]]);
    assert_eq!(flipped[1][[1, 2]], label[[1, 1]]);
}

#[test]
fn flip_dim_draw_above_prob_leaves_tensors_unchanged() {
    let image = Array3::from_shape_fn((2, 4, 3), |(h, w, c)| (h * 100 + w * 10 + c) as f32);
    let tensors = vec![image.clone().into_dyn()];

    let (kept, was_flipped) = flip_dim_with_draw(tensors, 0.7, 0.5, 1).unwrap();
    assert!(!was_flipped);
    assert_eq!(kept[0], image.into_dyn());
}

#[test]
fn flip_dim_rejects_invalid_dimension() {
    let image = Array3::<f32>::zeros((2, 4, 3));
    let mut rng = StdRng::seed_from_u64(3);
    match flip_dim(vec![image.into_dyn()], 0.5, 5, &mut rng) {
        Err(SegError::InvalidDimension { dim: 5, rank: 3 }) => {}
        other => panic!("expected InvalidDimension, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn flip_pair_never_desynchronizes_image_and_label() {
    let image = Array3::from_shape_fn((3, 5, 3), |(h, w, _)| (h * 10 + w) as f32);
    let label = Array2::from_shape_fn((3, 5), |(h, w)| (h * 10 + w) as i32);

    for seed in 0..32 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (out_image, out_label, flipped) =
            flip_pair(image.clone(), Some(label.clone()), 0.5, 1, &mut rng).unwrap();
        let out_label = out_label.unwrap();

        // Either both tensors flipped or neither did, never exactly one.
        for h in 0..3 {
            for w in 0..5 {
                let source_w = if flipped { 4 - w } else { w };
                assert_eq!(out_image[[h, w, 0]], image[[h, source_w, 0]]);
                assert_eq!(out_label[[h, w]], label[[h, source_w]]);
            }
        }
    }
}

#[test]
fn flip_pair_validates_dim_before_flipping() {
    let image = Array3::<f32>::zeros((3, 5, 3));
    let label = Array2::<i32>::zeros((3, 5));
    let mut rng = StdRng::seed_from_u64(11);
    // dim 2 is the image's channel axis but exceeds the label's rank.
    assert!(matches!(
        flip_pair(image, Some(label), 0.5, 2, &mut rng),
        Err(SegError::InvalidDimension { dim: 2, rank: 2 })
    ));
}

#[test]
fn training_without_label_fails() {
    let image = ramp_image(8, 6);
    let mut rng = StdRng::seed_from_u64(0);
    match preprocess_image_and_label(&image, None, true, Some(ModelVariant::Xception65), &mut rng)
    {
        Err(SegError::MissingLabel) => {}
        other => panic!("expected MissingLabel, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn preprocess_keeps_original_and_subtracts_mean() {
    let image = ramp_image(8, 6);
    let label = ramp_label(8, 6);
    let mut rng = StdRng::seed_from_u64(0);

    let processed =
        preprocess_image_and_label(&image, Some(&label), false, None, &mut rng).unwrap();

    assert!(!processed.flipped);
    assert_eq!(processed.original_image.dim(), (6, 8, 3));
    assert_eq!(processed.image.dim(), (6, 8, 3));
    // Original keeps raw u8 values, the processed image is mean-subtracted.
    assert_eq!(processed.original_image[[0, 3, 0]], 3);
    assert!((processed.image[[0, 3, 0]] - (3.0 - 123.68)).abs() < 1e-4);
    assert_eq!(processed.label.as_ref().unwrap()[[2, 5]], 5);
}

#[test]
fn training_flip_moves_image_and_label_together() {
    let image = ramp_image(9, 4);
    let label = ramp_label(9, 4);

    let mut saw_flipped = false;
    let mut saw_unflipped = false;
    for seed in 0..16 {
        let mut rng = StdRng::seed_from_u64(seed);
        let processed = preprocess_image_and_label(
            &image,
            Some(&label),
            true,
            Some(ModelVariant::Xception65),
            &mut rng,
        )
        .unwrap();
        let out_label = processed.label.unwrap();

        if processed.flipped {
            saw_flipped = true;
            assert_eq!(out_label[[0, 0]], 8);
            assert!((processed.image[[0, 0, 0]] - (8.0 - 123.68)).abs() < 1e-4);
        } else {
            saw_unflipped = true;
            assert_eq!(out_label[[0, 0]], 0);
            assert!((processed.image[[0, 0, 0]] - (0.0 - 123.68)).abs() < 1e-4);
        }
        // The unmodified input is retained either way.
        assert_eq!(processed.original_image[[0, 0, 0]], 0);
    }
    assert!(saw_flipped && saw_unflipped);
}
