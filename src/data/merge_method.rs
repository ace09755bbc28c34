use serde::{Deserialize, Serialize};

/// Scheme to merge the multi-scale ASPP branch outputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMethod {
    #[default] Max,
    Avg,
}

impl MergeMethod {
    pub fn from_str(method: &str) -> Option<Self> {
        match method.to_lowercase().as_str() {
            "max" => Some(MergeMethod::Max),
            "avg" => Some(MergeMethod::Avg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Max => "max",
            MergeMethod::Avg => "avg",
        }
    }
}
