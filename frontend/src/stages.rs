//! Frontend stages.
//!
//! Each configurable slot of the pipeline is built once by a factory
//! (`build`) from its config and then invoked as a pure function of its
//! inputs on every call.

use std::fmt;
use std::sync::Arc;

use melfront_dsp::emphasis::pre_emphasis;
use melfront_dsp::mel::linear_to_mel_weight_matrix;
use melfront_dsp::RealFft;
use melfront_dsp::spectrum::{linear_to_log_mel_spectrogram, magnitude_spectrogram};
use ndarray::{Array1, Array2, ArrayView2, Axis, Ix3};
use tracing::debug;

use crate::config::{
    FftConfig, OutputTransformConfig, PreEmphasisConfig, SpectrogramParams,
};
use crate::dtype::{precision, rfft_dtype};
use crate::{DType, FrontendError, Spectrum, Tensor};

/// `[batch, num_frames, frame_size]` frames.
pub type Frames = Tensor<Ix3>;

/// `[batch, num_frames, num_filters]` features.
pub type Features = Tensor<Ix3>;

/// A substitutable spectral transform.
///
/// `frames` arrive in the compute dtype chosen by
/// [`fft_dtype`](crate::fft_dtype); the transform is responsible for its own
/// precision handling. It must return `n / 2 + 1` bins per frame unless the
/// spectrogram stage is configured with a matching `fft_size`.
///
/// Implementations must be safe for concurrent use.
pub trait SpectralTransform: Send + Sync + fmt::Debug {
    fn transform(&self, frames: &Frames, n: usize) -> Result<Spectrum, FrontendError>;
}

/// A substitutable output transformation.
///
/// `paddings` is the `[batch, num_frames]` frame padding mask; padded frames
/// are zeroed by the frontend afterwards regardless of what is returned for
/// them.
pub trait OutputTransform: Send + Sync + fmt::Debug {
    fn apply(
        &self,
        features: Features,
        paddings: ArrayView2<'_, f64>,
    ) -> Result<Features, FrontendError>;
}

/// Built pre-emphasis stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PreEmphasis {
    coeff: f64,
}

impl PreEmphasis {
    pub(crate) fn build(cfg: &PreEmphasisConfig) -> Result<Self, FrontendError> {
        if !cfg.coeff.is_finite() {
            return Err(FrontendError::invalid(
                "pre_emphasis.coeff",
                format!("{} is not finite", cfg.coeff),
            ));
        }
        Ok(Self { coeff: cfg.coeff })
    }

    /// Consumes the leading sample of every frame.
    pub(crate) fn apply(&self, frames: &Frames) -> Result<Frames, FrontendError> {
        let out = pre_emphasis(frames.view(), self.coeff)?;
        Ok(Tensor::tagged(out, frames.dtype()))
    }
}

/// Built spectral transform stage.
#[derive(Debug, Clone)]
pub(crate) enum FftStage {
    Rfft(RealFft),
    Custom { transform: Arc<dyn SpectralTransform>, n: usize },
}

impl FftStage {
    /// Builds the transform for `fft_size`, overriding any size the caller
    /// put in the config. The direct transform is planned here once.
    pub(crate) fn build(cfg: &FftConfig, fft_size: usize) -> Result<Self, FrontendError> {
        match cfg {
            FftConfig::Rfft => Ok(FftStage::Rfft(RealFft::new(fft_size)?)),
            FftConfig::Custom { transform, n } => {
                if let Some(n) = n.filter(|&n| n != fft_size) {
                    debug!(configured = n, fft_size, "overriding custom transform size");
                }
                Ok(FftStage::Custom { transform: Arc::clone(transform), n: fft_size })
            }
        }
    }

    pub(crate) fn run(&self, frames: Frames) -> Result<Spectrum, FrontendError> {
        match self {
            FftStage::Rfft(fft) => {
                let dtype = rfft_dtype(frames.dtype());
                let frames = frames.cast(dtype);
                let data = fft.process(frames.view(), precision(dtype))?;
                Ok(Spectrum { data, dtype })
            }
            FftStage::Custom { transform, n } => transform.transform(&frames, *n),
        }
    }

    /// Number of bins the direct transform emits; `None` for custom ones.
    pub(crate) fn num_bins(&self) -> Option<usize> {
        match self {
            FftStage::Rfft(fft) => Some(fft.num_bins()),
            FftStage::Custom { .. } => None,
        }
    }
}

/// Magnitude spectrogram, mel projection and log compression.
///
/// The filterbank is built once in [`LogMelSpectrogram::build`].
#[derive(Debug, Clone)]
pub(crate) struct LogMelSpectrogram {
    params: SpectrogramParams,
    filterbank: Array2<f64>,
}

impl LogMelSpectrogram {
    pub(crate) fn build(params: SpectrogramParams) -> Result<Self, FrontendError> {
        if !(params.mel_floor.is_finite() && params.mel_floor > 0.0) {
            return Err(FrontendError::invalid(
                "mel_floor",
                format!("must be a positive finite number, got {}", params.mel_floor),
            ));
        }
        if params.fft_size == 0 {
            return Err(FrontendError::invalid("spectrogram.fft_size", "must be positive"));
        }
        let filterbank = linear_to_mel_weight_matrix(
            params.num_filters,
            params.fft_size / 2 + 1,
            params.sample_rate,
            params.lower_edge_hz,
            params.upper_edge_hz,
        )?;
        Ok(Self { params, filterbank })
    }

    pub(crate) fn filterbank(&self) -> &Array2<f64> {
        &self.filterbank
    }

    /// Computes `[batch, num_frames, num_filters]` log-mel features in `dtype`.
    pub(crate) fn apply(&self, fft: &Spectrum, dtype: DType) -> Result<Features, FrontendError> {
        let magnitude = Tensor::new(magnitude_spectrogram(fft.data.view()), dtype);
        let log_mel = linear_to_log_mel_spectrogram(
            magnitude.view(),
            self.filterbank.view(),
            self.params.mel_floor,
        )?;
        Ok(Tensor::new(log_mel, dtype))
    }
}

/// Built output transformation.
#[derive(Debug, Clone)]
pub(crate) enum OutputStage {
    MeanStd {
        mean: Option<Array1<f64>>,
        std: Option<Array1<f64>>,
    },
    Cmvn,
    Custom(Arc<dyn OutputTransform>),
}

impl OutputStage {
    pub(crate) fn build(
        cfg: &OutputTransformConfig,
        num_filters: usize,
    ) -> Result<Self, FrontendError> {
        match cfg {
            OutputTransformConfig::MeanStd { mean, std } => Ok(OutputStage::MeanStd {
                mean: mean
                    .as_deref()
                    .map(|v| per_filter("output_transformation.mean", v, num_filters))
                    .transpose()?,
                std: std
                    .as_deref()
                    .map(|v| per_filter("output_transformation.std", v, num_filters))
                    .transpose()?,
            }),
            OutputTransformConfig::Cmvn => Ok(OutputStage::Cmvn),
            OutputTransformConfig::Custom(t) => Ok(OutputStage::Custom(Arc::clone(t))),
        }
    }

    pub(crate) fn apply(
        &self,
        features: Features,
        paddings: ArrayView2<'_, f64>,
    ) -> Result<Features, FrontendError> {
        match self {
            OutputStage::MeanStd { mean, std } => Ok(normalize_by_mean_std(
                features,
                mean.as_ref(),
                std.as_ref(),
            )),
            OutputStage::Cmvn => Ok(cmvn(features, paddings)),
            OutputStage::Custom(t) => t.apply(features, paddings),
        }
    }
}

fn per_filter(
    field: &'static str,
    values: &[f64],
    num_filters: usize,
) -> Result<Array1<f64>, FrontendError> {
    match values.len() {
        1 => Ok(Array1::from_elem(num_filters, values[0])),
        n if n == num_filters => Ok(Array1::from(values.to_vec())),
        n => Err(FrontendError::invalid(
            field,
            format!("expected 1 or {num_filters} values, got {n}"),
        )),
    }
}

fn epsilon(dtype: DType) -> f64 {
    dtype.epsilon().unwrap_or(f32::EPSILON as f64)
}

/// Subtracts `mean` and divides by `max(std, eps)` along the filter axis.
/// Statistics are rounded to the feature dtype first.
fn normalize_by_mean_std(
    features: Features,
    mean: Option<&Array1<f64>>,
    std: Option<&Array1<f64>>,
) -> Features {
    let dtype = features.dtype();
    let mut x = features.into_data();
    if let Some(mean) = mean {
        x -= &mean.mapv(|m| dtype.quantize(m));
    }
    if let Some(std) = std {
        let eps = epsilon(dtype);
        x /= &std.mapv(|s| dtype.quantize(s).max(eps));
    }
    Tensor::new(x, dtype)
}

/// Smallest standard deviation cmvn divides by.
const CMVN_MIN_STD: f64 = 1e-10;

/// Spread below this fraction of a filter's mean magnitude is rounding noise.
const CMVN_MIN_RELATIVE_STD: f64 = 1e-6;

/// Normalizes each filter of each utterance to zero mean and unit variance
/// over its unpadded frames. Utterances without unpadded frames are left
/// unchanged. Near-constant filters map to values near zero.
fn cmvn(features: Features, paddings: ArrayView2<'_, f64>) -> Features {
    let dtype = features.dtype();
    let mut x = features.into_data();

    for (mut utt, pad) in x.outer_iter_mut().zip(paddings.outer_iter()) {
        let valid: Vec<usize> = pad
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p == 0.0)
            .map(|(t, _)| t)
            .collect();
        if valid.is_empty() {
            continue;
        }
        let count = valid.len() as f64;
        for mut column in utt.axis_iter_mut(Axis(1)) {
            let mean = valid.iter().map(|&t| column[t]).sum::<f64>() / count;
            let var = valid
                .iter()
                .map(|&t| {
                    let d = column[t] - mean;
                    d * d
                })
                .sum::<f64>()
                / count;
            let std = var
                .sqrt()
                .max(CMVN_MIN_STD)
                .max(CMVN_MIN_RELATIVE_STD * mean.abs());
            column.mapv_inplace(|v| (v - mean) / std);
        }
    }
    Tensor::new(x, dtype)
}
