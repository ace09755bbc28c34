//! Options for building segmentation models.

use std::collections::BTreeMap;
use std::path::Path;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use crate::data::{MergeMethod, ModelVariant};

/// Output head name used for semantic segmentation predictions.
pub const SEMANTIC: &str = "semantic";

/// Immutable options describing the network to assemble.
///
/// Constructed once per run, read everywhere, never mutated afterwards. The
/// `with_*` builders consume `self`, so a finished value cannot be edited in
/// place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Output head name to number of classes, e.g. `semantic -> 21`.
    pub outputs_to_num_classes: BTreeMap<String, usize>,
    /// Atrous rates for the ASPP branches. Empty means no dilated context;
    /// the ASPP then builds a single 1x1 projection branch.
    pub atrous_rates: Vec<usize>,
    /// Ratio of input to output spatial resolution.
    pub output_stride: usize,
    pub merge_method: MergeMethod,
    pub add_image_level_feature: bool,
    pub aspp_with_batch_norm: bool,
    pub aspp_with_separable_conv: bool,
    /// Hierarchy of atrous rates for the backbone's last stage.
    pub multi_grid: Option<Vec<usize>>,
    /// Input/output resolution ratio of the decoder stage. `None` skips the
    /// decoder entirely.
    pub decoder_output_stride: Option<usize>,
    pub decoder_use_separable_conv: bool,
    /// Kernel size for the convolution that generates logits.
    pub logits_kernel_size: usize,
    pub model_variant: ModelVariant,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            outputs_to_num_classes: BTreeMap::new(),
            atrous_rates: vec![],
            output_stride: 8,
            merge_method: MergeMethod::Max,
            add_image_level_feature: true,
            aspp_with_batch_norm: true,
            aspp_with_separable_conv: true,
            multi_grid: None,
            decoder_output_stride: None,
            decoder_use_separable_conv: true,
            logits_kernel_size: 1,
            model_variant: ModelVariant::Xception65,
        }
    }
}

impl ModelOptions {
    pub fn new(outputs_to_num_classes: BTreeMap<String, usize>) -> Self {
        Self {
            outputs_to_num_classes,
            ..Default::default()
        }
    }

    /// Options for a single `semantic` head with the given class count.
    pub fn semantic(num_classes: usize) -> Self {
        let mut outputs = BTreeMap::new();
        outputs.insert(SEMANTIC.to_string(), num_classes);
        Self::new(outputs)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn with_output(mut self, name: &str, num_classes: usize) -> Self {
        self.outputs_to_num_classes.insert(name.to_string(), num_classes);
        self
    }

    pub fn with_atrous_rates(mut self, rates: &[usize]) -> Self {
        self.atrous_rates = rates.to_vec();
        self
    }

    pub fn with_output_stride(mut self, output_stride: usize) -> Self {
        self.output_stride = output_stride;
        self
    }

    pub fn with_merge_method(mut self, merge_method: MergeMethod) -> Self {
        self.merge_method = merge_method;
        self
    }

    pub fn with_image_level_feature(mut self, x: bool) -> Self {
        self.add_image_level_feature = x;
        self
    }

    pub fn with_aspp_batch_norm(mut self, x: bool) -> Self {
        self.aspp_with_batch_norm = x;
        self
    }

    pub fn with_aspp_separable_conv(mut self, x: bool) -> Self {
        self.aspp_with_separable_conv = x;
        self
    }

    pub fn with_multi_grid(mut self, rates: &[usize]) -> Self {
        self.multi_grid = Some(rates.to_vec());
        self
    }

    pub fn with_decoder_output_stride(mut self, stride: usize) -> Self {
        self.decoder_output_stride = Some(stride);
        self
    }

    pub fn with_decoder_separable_conv(mut self, x: bool) -> Self {
        self.decoder_use_separable_conv = x;
        self
    }

    pub fn with_logits_kernel_size(mut self, n: usize) -> Self {
        self.logits_kernel_size = n;
        self
    }

    pub fn with_model_variant(mut self, variant: ModelVariant) -> Self {
        self.model_variant = variant;
        self
    }

    pub fn to_string(&self) -> String {
        format!("Model Variant: {}\n\
        Output Heads: {:?}\n\
        Atrous Rates: {:?}\n\
        Output Stride: {}\n\
        Decoder Output Stride: {:?}\n\
        Merge Method: {}",
                self.model_variant.name(), self.outputs_to_num_classes,
                self.atrous_rates, self.output_stride,
                self.decoder_output_stride, self.merge_method.as_str())
    }
}
