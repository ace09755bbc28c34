mod aspp;
mod decoder;
mod deeplab;
mod feature_extractor;
mod hyper_params;
mod layers;
mod ops;
mod xception;

pub use aspp::Aspp;
pub use decoder::Decoder;
pub use deeplab::DeepLab;
pub use feature_extractor::*;
pub use hyper_params::HyperParams;
pub use layers::*;
pub use ops::*;
pub use xception::{EndPoints, Xception65, XceptionConfig};
