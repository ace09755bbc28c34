extern crate bvr_segment;

use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use bvr_segment::data::SegError;
use bvr_segment::visualization::{
    create_label_colormap, label_colormap, label_to_color_image, save_annotation,
    DATASET_MAX_ENTRIES,
};

#[test]
fn colormap_is_deterministic() {
    let first = create_label_colormap();
    let second = create_label_colormap();
    assert_eq!(first, second);
    assert_eq!(&first, label_colormap());
}

#[test]
fn colormap_known_entries() {
    let colormap = create_label_colormap();
    assert_eq!(colormap[0], [0, 0, 0]);
    assert_eq!(colormap[1], [128, 0, 0]);
    assert_eq!(colormap[2], [0, 128, 0]);
    assert_eq!(colormap[3], [128, 128, 0]);
    assert_eq!(colormap[4], [0, 0, 128]);
    assert_eq!(colormap[15], [192, 128, 128]);
}

#[test]
fn label_to_color_gathers_from_table() {
    let mut rng = StdRng::seed_from_u64(7);
    let label =
        Array2::from_shape_fn((24, 31), |_| rng.gen_range(0..DATASET_MAX_ENTRIES as i32));
    let colored = label_to_color_image(&label.clone().into_dyn()).unwrap();
    let colormap = label_colormap();

    assert_eq!(colored.dim(), (24, 31, 3));
    for ((row, col), &value) in label.indexed_iter() {
        let expected = colormap[value as usize];
        for channel in 0..3 {
            assert_eq!(colored[[row, col, channel]], expected[channel]);
        }
    }
}

#[test]
fn label_to_color_rejects_bad_rank() {
    let label = Array3::<i32>::zeros((4, 4, 1)).into_dyn();
    match label_to_color_image(&label) {
        Err(SegError::InvalidRank { expected: 2, actual: 3 }) => {}
        other => panic!("expected InvalidRank, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn label_to_color_rejects_out_of_range_values() {
    let mut label = Array2::<i32>::zeros((4, 4));
    label[[2, 3]] = DATASET_MAX_ENTRIES as i32;
    match label_to_color_image(&label.into_dyn()) {
        Err(SegError::ValueOutOfRange { value, capacity }) => {
            assert_eq!(value, DATASET_MAX_ENTRIES as i64);
            assert_eq!(capacity, DATASET_MAX_ENTRIES);
        }
        other => panic!("expected ValueOutOfRange, got {:?}", other.map(|_| ())),
    }

    let mut negative = Array2::<i32>::zeros((4, 4));
    negative[[0, 0]] = -1;
    assert!(label_to_color_image(&negative.into_dyn()).is_err());
}

#[test]
fn save_annotation_writes_png() {
    let label = Array2::from_shape_fn((8, 8), |(row, col)| ((row + col) % 21) as i32);

    save_annotation(&label.clone().into_dyn(), "tests", "annotation_colored", true).unwrap();
    save_annotation(&label.into_dyn(), "tests", "annotation_raw", false).unwrap();

    let colored = image::open("tests/annotation_colored.png").unwrap();
    assert_eq!(colored.width(), 8);
    assert_eq!(colored.height(), 8);
}
