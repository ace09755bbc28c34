mod image_ops;
mod input_preprocess;
mod preprocess_utils;

pub use image_ops::*;
pub use input_preprocess::*;
pub use preprocess_utils::*;
