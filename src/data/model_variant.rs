use serde::{Deserialize, Serialize};
use crate::data::SegError;

/// Registered backbone networks.
///
/// This is a closed registry: resolving a name that is not listed here is a
/// hard error at build time, never a silent fallback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelVariant {
    #[default] Xception65,
}

impl ModelVariant {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Xception65 => "xception_65",
        }
    }

    pub fn from_name(name: &str) -> Result<ModelVariant, SegError> {
        match name.to_lowercase().as_str() {
            "xception_65" => Ok(ModelVariant::Xception65),
            _ => Err(SegError::UnknownVariant(name.to_string())),
        }
    }

    /// End point the decoder fuses with, as recorded by the backbone.
    pub fn decoder_end_point(&self) -> &'static str {
        match self {
            Self::Xception65 => {
                "entry_flow/block2/unit_1/xception_module/separable_conv2_pointwise"
            }
        }
    }
}
