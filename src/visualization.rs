mod colormap;
mod save_annotation;

pub use colormap::*;
pub use save_annotation::save_annotation;
