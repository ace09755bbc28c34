/// Hyperparameters shared by every convolution of one network family.
///
/// Passed explicitly to every layer constructor, so the defaults a layer
/// inherits are visible at the call site instead of living in hidden
/// global context.
#[derive(Debug, Clone, Copy)]
pub struct HyperParams {
    /// L2 regularization strength for convolution weights.
    pub weight_decay: f32,
    pub batch_norm_decay: f32,
    pub batch_norm_epsilon: f32,
    pub batch_norm_scale: bool,
    /// Apply L2 regularization on depthwise convolution weights too.
    pub regularize_depthwise: bool,
    /// Batch-norm statistics are only trained when the run is a training
    /// run AND batch norm fine-tuning was requested; inference and
    /// frozen-statistics transfer learning both leave this false.
    pub train_batch_norm: bool,
}

impl HyperParams {
    /// Scope for the xception family.
    pub fn xception(
        weight_decay: f32,
        regularize_depthwise: bool,
        is_training: bool,
        fine_tune_batch_norm: bool,
    ) -> Self {
        Self {
            weight_decay,
            batch_norm_decay: 0.9997,
            batch_norm_epsilon: 1e-3,
            batch_norm_scale: true,
            regularize_depthwise,
            train_batch_norm: is_training && fine_tune_batch_norm,
        }
    }

    /// Scope for the dense-prediction head (ASPP, decoder, logits).
    pub fn dense_prediction(
        weight_decay: f32,
        is_training: bool,
        fine_tune_batch_norm: bool,
    ) -> Self {
        Self {
            weight_decay,
            batch_norm_decay: 0.9997,
            batch_norm_epsilon: 1e-5,
            batch_norm_scale: true,
            regularize_depthwise: false,
            train_batch_norm: is_training && fine_tune_batch_norm,
        }
    }
}
