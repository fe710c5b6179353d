use thiserror::Error;

/// Errors returned by the DSP primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DspError {
    #[error("dsp: {name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: usize },

    #[error("dsp: pre-emphasis needs frames of at least 2 samples, got {0}")]
    FrameTooShort(usize),

    #[error("dsp: invalid mel band edges: lower {lower} Hz, upper {upper} Hz, nyquist {nyquist} Hz")]
    InvalidEdges { lower: f64, upper: f64, nyquist: f64 },

    #[error("dsp: spectrogram has {got} bins but the filterbank expects {want}")]
    BinMismatch { got: usize, want: usize },

    #[error("dsp: fft: {0}")]
    Fft(String),
}
