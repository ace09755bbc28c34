mod bvr_sample;
mod filesystem_access;
mod merge_method;
mod model_options;
mod model_variant;
mod seg_error;

pub use bvr_sample::*;
pub use filesystem_access::FsAccess;
pub use merge_method::MergeMethod;
pub use model_options::*;
pub use model_variant::ModelVariant;
pub use seg_error::SegError;
