//! Log-mel spectrogram frontend for speech models.
//!
//! [`LogMelFrontend`] turns a padded batch of waveforms into log-mel
//! features and frame-level paddings:
//!
//! ```text
//! [batch, seq_len] samples + paddings
//!   -> frames          [batch, num_frames, frame_size (+1 with pre-emphasis)]
//!   -> pre-emphasis    [batch, num_frames, frame_size]
//!   -> window
//!   -> spectral transform (compute dtype from `fft_dtype`)
//!   -> |X|, mel projection, ln(max(x, mel_floor))
//!   -> optional output transformation
//!   -> [batch, num_frames, num_filters, 1] with padded frames zeroed
//! ```
//!
//! The spectral transform and the output transformation are pluggable via
//! [`SpectralTransform`] and [`OutputTransform`].
//!
//! # Example
//!
//! ```rust
//! use melfront::{LogMelFrontend, LogMelFrontendConfig, Tensor};
//! use ndarray::Array2;
//!
//! let frontend = LogMelFrontend::new(LogMelFrontendConfig::new(16000, 25.0, 10.0, 80, 1e-6))?;
//!
//! let inputs = Tensor::from_array(&Array2::<f32>::zeros((2, 16000)));
//! let paddings = Array2::<f64>::zeros((2, 16000));
//! let out = frontend.forward(&inputs, paddings.view())?;
//!
//! assert_eq!(out.outputs.shape(), &[2, 98, 80, 1]);
//! assert_eq!(frontend.output_shape(&[Some(2), Some(16000)])?, [Some(2), Some(98), Some(80), Some(1)]);
//! # Ok::<(), melfront::FrontendError>(())
//! ```

mod config;
mod dtype;
mod error;
mod frontend;
mod stages;
mod tensor;

pub use config::{
    DEFAULT_LOWER_EDGE_HZ, DEFAULT_PRE_EMPHASIS_COEFF, FftConfig, FftSizeFn, LogMelFrontendConfig,
    OutputTransformConfig, PreEmphasisConfig, SpectrogramConfig, SpectrogramParams,
};
pub use dtype::{DType, fft_dtype, rfft_dtype};
pub use error::FrontendError;
pub use frontend::{FrontendOutput, LogMelFrontend, MAX_FFT_SIZE, MAX_FRAME_SIZE};
pub use stages::{Features, Frames, OutputTransform, SpectralTransform};
pub use tensor::{Element, Spectrum, Tensor};

pub use melfront_dsp::spectrum::Complex;
pub use melfront_dsp::{FrameEnd, FramePaddingPolicy, WindowType};
