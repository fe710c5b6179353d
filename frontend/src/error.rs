use melfront_dsp::DspError;
use thiserror::Error;

use crate::DType;

/// Errors returned by frontend construction and execution.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("frontend: missing required config field `{0}`")]
    MissingField(&'static str),

    #[error("frontend: invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("frontend: output_dim should always be 1, got {0}; did you mean to configure num_filters instead?")]
    OutputDim(usize),

    #[error("frontend: dtype {0} is not supported by the spectral transform")]
    UnsupportedDtype(DType),

    #[error("frontend: expected an input shape of rank {expected}, got rank {got}")]
    InvalidRank { expected: usize, got: usize },

    #[error("frontend: {what} shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("frontend: transform: {0}")]
    Transform(String),

    #[error(transparent)]
    Dsp(#[from] DspError),
}

impl FrontendError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { field, reason: reason.into() }
    }
}
