//! Frontend configuration.
//!
//! [`LogMelFrontendConfig`] is plain data: it can be deserialized from YAML
//! or JSON, built with `with_*` setters, and is never modified by the
//! frontend. Required fields are `Option`s so a missing value is reported at
//! construction instead of being silently defaulted.

use std::sync::Arc;

use melfront_dsp::units::next_power_of_2;
use melfront_dsp::{FrameEnd, FramePaddingPolicy, WindowType};
use serde::{Deserialize, Serialize};

use crate::stages::{OutputTransform, SpectralTransform};

/// Maps the nominal frame size (in samples) to the FFT size.
pub type FftSizeFn = fn(usize) -> usize;

pub const DEFAULT_PRE_EMPHASIS_COEFF: f64 = 0.97;
pub const DEFAULT_LOWER_EDGE_HZ: f64 = 125.0;

/// Configures [`LogMelFrontend`](crate::LogMelFrontend).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogMelFrontendConfig {
    /// Number of output channels. Must be 1.
    pub output_dim: usize,
    /// Input samples per second, e.g. 16000. Required.
    pub sample_rate: Option<usize>,
    /// Frame size in ms. Required.
    pub frame_size_ms: Option<f64>,
    /// Hop size in ms. Required.
    pub hop_size_ms: Option<f64>,
    /// Number of mel filters in the output. Required.
    pub num_filters: Option<usize>,
    /// Floor of the mel energies before the log. Required.
    /// Around 1e-6 or smaller keeps low-energy signals.
    pub mel_floor: Option<f64>,
    /// Computes the FFT size from the nominal frame size.
    #[serde(skip, default = "default_fft_size_fn")]
    pub fft_size_fn: FftSizeFn,
    /// Pre-emphasis filter. `None` skips pre-emphasis.
    pub pre_emphasis: Option<PreEmphasisConfig>,
    /// Spectral transform.
    pub fft: FftConfig,
    /// Log-mel spectrogram stage. Unset fields are filled from the frontend.
    pub spectrogram: SpectrogramConfig,
    /// Optional post-processing of the log-mel features.
    pub output_transformation: Option<OutputTransformConfig>,
    /// Analysis window.
    pub window: WindowType,
    /// Handling of trailing samples that do not fill a frame.
    pub frame_end: FrameEnd,
    /// Rule for marking frames as padded.
    pub padding_policy: FramePaddingPolicy,
}

fn default_fft_size_fn() -> FftSizeFn {
    next_power_of_2
}

impl Default for LogMelFrontendConfig {
    fn default() -> Self {
        Self {
            output_dim: 1,
            sample_rate: None,
            frame_size_ms: None,
            hop_size_ms: None,
            num_filters: None,
            mel_floor: None,
            fft_size_fn: next_power_of_2,
            pre_emphasis: Some(PreEmphasisConfig::default()),
            fft: FftConfig::default(),
            spectrogram: SpectrogramConfig::default(),
            output_transformation: None,
            window: WindowType::default(),
            frame_end: FrameEnd::default(),
            padding_policy: FramePaddingPolicy::default(),
        }
    }
}

impl LogMelFrontendConfig {
    /// Creates a config with every required field set.
    pub fn new(
        sample_rate: usize,
        frame_size_ms: f64,
        hop_size_ms: f64,
        num_filters: usize,
        mel_floor: f64,
    ) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            frame_size_ms: Some(frame_size_ms),
            hop_size_ms: Some(hop_size_ms),
            num_filters: Some(num_filters),
            mel_floor: Some(mel_floor),
            ..Self::default()
        }
    }

    pub fn with_output_dim(mut self, output_dim: usize) -> Self {
        self.output_dim = output_dim;
        self
    }

    pub fn with_fft_size_fn(mut self, f: FftSizeFn) -> Self {
        self.fft_size_fn = f;
        self
    }

    pub fn with_pre_emphasis(mut self, pre_emphasis: Option<PreEmphasisConfig>) -> Self {
        self.pre_emphasis = pre_emphasis;
        self
    }

    pub fn with_fft(mut self, fft: FftConfig) -> Self {
        self.fft = fft;
        self
    }

    pub fn with_spectrogram(mut self, spectrogram: SpectrogramConfig) -> Self {
        self.spectrogram = spectrogram;
        self
    }

    pub fn with_output_transformation(mut self, t: Option<OutputTransformConfig>) -> Self {
        self.output_transformation = t;
        self
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    pub fn with_frame_end(mut self, frame_end: FrameEnd) -> Self {
        self.frame_end = frame_end;
        self
    }

    pub fn with_padding_policy(mut self, policy: FramePaddingPolicy) -> Self {
        self.padding_policy = policy;
        self
    }
}

/// Configures the pre-emphasis stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreEmphasisConfig {
    pub coeff: f64,
}

impl Default for PreEmphasisConfig {
    fn default() -> Self {
        Self { coeff: DEFAULT_PRE_EMPHASIS_COEFF }
    }
}

/// Selects the spectral transform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FftConfig {
    /// Real FFT computed in f32 or f64.
    #[default]
    Rfft,
    /// A caller-supplied transform, e.g. a sharded FFT.
    ///
    /// `n` is always overwritten with the frontend's FFT size.
    #[serde(skip)]
    Custom {
        transform: Arc<dyn SpectralTransform>,
        n: Option<usize>,
    },
}

impl FftConfig {
    pub fn custom(transform: Arc<dyn SpectralTransform>) -> Self {
        FftConfig::Custom { transform, n: None }
    }
}

/// Configures the log-mel spectrogram stage.
///
/// `num_filters`, `sample_rate`, `fft_size` and `mel_floor` are filled from
/// the frontend when unset; values set here take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    pub num_filters: Option<usize>,
    pub sample_rate: Option<usize>,
    pub fft_size: Option<usize>,
    pub mel_floor: Option<f64>,
    /// Lower edge of the lowest mel band (default 125 Hz).
    pub lower_edge_hz: Option<f64>,
    /// Upper edge of the highest mel band (default 95% of Nyquist).
    pub upper_edge_hz: Option<f64>,
}

/// Fully resolved parameters of the log-mel spectrogram stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrogramParams {
    pub num_filters: usize,
    pub sample_rate: usize,
    pub fft_size: usize,
    pub mel_floor: f64,
    pub lower_edge_hz: f64,
    pub upper_edge_hz: f64,
}

impl SpectrogramConfig {
    /// Fills every unset field from the frontend-derived values and returns
    /// the resolved parameters. `self` is left untouched.
    pub fn resolve(
        &self,
        num_filters: usize,
        sample_rate: usize,
        fft_size: usize,
        mel_floor: f64,
    ) -> SpectrogramParams {
        let sample_rate = self.sample_rate.unwrap_or(sample_rate);
        SpectrogramParams {
            num_filters: self.num_filters.unwrap_or(num_filters),
            sample_rate,
            fft_size: self.fft_size.unwrap_or(fft_size),
            mel_floor: self.mel_floor.unwrap_or(mel_floor),
            lower_edge_hz: self.lower_edge_hz.unwrap_or(DEFAULT_LOWER_EDGE_HZ),
            // 7600 Hz at 16 kHz: keeps the top filter clear of Nyquist.
            upper_edge_hz: self
                .upper_edge_hz
                .unwrap_or(0.95 * (sample_rate / 2) as f64),
        }
    }
}

/// Selects the output transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputTransformConfig {
    /// Subtracts `mean` and/or divides by `max(std, eps)`. Each vector holds
    /// either one value per filter or a single value for all filters.
    MeanStd {
        #[serde(default)]
        mean: Option<Vec<f64>>,
        #[serde(default)]
        std: Option<Vec<f64>>,
    },
    /// Per-utterance mean and variance normalization over unpadded frames.
    Cmvn,
    /// A caller-supplied transformation.
    #[serde(skip)]
    Custom(Arc<dyn OutputTransform>),
}
