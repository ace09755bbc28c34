use thiserror::Error;

/// Failure taxonomy for model assembly and preprocessing.
///
/// Every variant is a configuration or caller error detected once at
/// build/preprocess time; none of them is transient and nothing retries.
#[derive(Error, Debug)]
pub enum SegError {
    #[error("unknown model variant '{0}'")]
    UnknownVariant(String),

    #[error("during training, label must be provided")]
    MissingLabel,

    #[error("expected a tensor of rank {expected}, got rank {actual}")]
    InvalidRank { expected: usize, actual: usize },

    #[error("dim {dim} must represent a valid dimension for rank {rank}")]
    InvalidDimension { dim: usize, rank: usize },

    #[error("label value {value} too large for the {capacity}-entry colormap")]
    ValueOutOfRange { value: i64, capacity: usize },

    #[error("end point '{0}' was not recorded by the backbone")]
    MissingEndPoint(String),

    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
