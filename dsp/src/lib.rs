//! Numeric primitives for log-mel feature extraction.
//!
//! Every function here operates on batched `ndarray` tensors with `f64`
//! storage:
//!
//! - [`units`]: millisecond/sample conversion and FFT sizing
//! - [`framing`]: overlapping frame extraction and frame-level paddings
//! - [`window`]: Hann and Hamming analysis windows
//! - [`emphasis`]: first-difference pre-emphasis filter
//! - [`mel`]: HTK mel scale and the linear-to-mel weight matrix
//! - [`spectrum`]: real FFT, magnitude spectrogram and log-mel compression
//!
//! # Example
//!
//! ```rust
//! use melfront_dsp::framing::FrameGeometry;
//! use melfront_dsp::units::ms_to_samples;
//!
//! let frame_size = ms_to_samples(25.0, 16000);
//! let hop_size = ms_to_samples(10.0, 16000);
//! let geometry = FrameGeometry::new(frame_size, hop_size).unwrap();
//!
//! // (16000 - 400) / 160 + 1
//! assert_eq!(geometry.num_frames(16000), 98);
//! ```

pub mod emphasis;
mod error;
pub mod framing;
pub mod mel;
pub mod spectrum;
pub mod units;
pub mod window;

pub use error::DspError;
pub use framing::{FrameEnd, FrameGeometry, FramePaddingPolicy};
pub use spectrum::{Precision, RealFft};
pub use window::WindowType;
