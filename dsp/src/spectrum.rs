//! Real FFT, magnitude spectrogram and log-mel compression.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};
use realfft::{FftNum, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::DspError;

pub use realfft::num_complex::Complex;

/// Floating-point precision of the real FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    F32,
    F64,
}

trait Sample: FftNum {
    fn from_sample(v: f64) -> Self;
    fn into_f64(self) -> f64;
}

impl Sample for f32 {
    #[inline]
    fn from_sample(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn into_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    #[inline]
    fn from_sample(v: f64) -> Self {
        v
    }

    #[inline]
    fn into_f64(self) -> f64 {
        self
    }
}

/// A planned length-`n` real FFT in both precisions.
///
/// Planning happens once in [`RealFft::new`]; [`RealFft::process`] only runs
/// the transform and can be called concurrently.
#[derive(Clone)]
pub struct RealFft {
    n: usize,
    f32_plan: Arc<dyn RealToComplex<f32>>,
    f64_plan: Arc<dyn RealToComplex<f64>>,
}

impl fmt::Debug for RealFft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealFft").field("n", &self.n).finish()
    }
}

impl RealFft {
    pub fn new(n: usize) -> Result<Self, DspError> {
        if n == 0 {
            return Err(DspError::NonPositive { name: "fft_size", value: n });
        }
        Ok(Self {
            n,
            f32_plan: RealFftPlanner::<f32>::new().plan_fft_forward(n),
            f64_plan: RealFftPlanner::<f64>::new().plan_fft_forward(n),
        })
    }

    /// Transform length.
    pub fn fft_size(&self) -> usize {
        self.n
    }

    /// Number of complex bins per frame, `n / 2 + 1`.
    pub fn num_bins(&self) -> usize {
        self.n / 2 + 1
    }

    /// Transforms every `[batch, num_frames, frame_size]` frame, returning
    /// `[batch, num_frames, n / 2 + 1]` complex bins.
    ///
    /// Frames shorter than `n` are zero-padded, longer frames are truncated.
    pub fn process(
        &self,
        frames: ArrayView3<'_, f64>,
        precision: Precision,
    ) -> Result<Array3<Complex<f64>>, DspError> {
        match precision {
            Precision::F32 => process_with(self.f32_plan.as_ref(), frames),
            Precision::F64 => process_with(self.f64_plan.as_ref(), frames),
        }
    }
}

/// Computes the length-`n` real FFT of every frame. Plans a fresh
/// [`RealFft`]; keep one around for repeated calls.
pub fn rfft(
    frames: ArrayView3<'_, f64>,
    n: usize,
    precision: Precision,
) -> Result<Array3<Complex<f64>>, DspError> {
    RealFft::new(n)?.process(frames, precision)
}

fn process_with<T: Sample>(
    fft: &dyn RealToComplex<T>,
    frames: ArrayView3<'_, f64>,
) -> Result<Array3<Complex<f64>>, DspError> {
    let (batch, num_frames, frame_size) = frames.dim();
    let n = fft.len();
    let mut out = Array3::from_elem((batch, num_frames, n / 2 + 1), Complex::new(0.0, 0.0));

    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();
    let copy_len = frame_size.min(n);
    let zero = T::from_sample(0.0);

    for (frame, mut bins_out) in frames
        .lanes(Axis(2))
        .into_iter()
        .zip(out.lanes_mut(Axis(2)))
    {
        for (i, slot) in input.iter_mut().enumerate() {
            *slot = if i < copy_len { T::from_sample(frame[i]) } else { zero };
        }
        fft.process(&mut input, &mut spectrum)
            .map_err(|e| DspError::Fft(e.to_string()))?;
        for (dst, c) in bins_out.iter_mut().zip(spectrum.iter()) {
            *dst = Complex::new(c.re.into_f64(), c.im.into_f64());
        }
    }
    Ok(out)
}

/// Returns `|X[k]|` for every complex bin.
pub fn magnitude_spectrogram(fft: ArrayView3<'_, Complex<f64>>) -> Array3<f64> {
    fft.mapv(|c| c.norm())
}

/// Projects a `[batch, num_frames, num_bins]` spectrogram through the
/// `[num_bins, num_filters]` weight matrix and returns
/// `ln(max(energy, mel_floor))`.
pub fn linear_to_log_mel_spectrogram(
    spectrogram: ArrayView3<'_, f64>,
    weight_matrix: ArrayView2<'_, f64>,
    mel_floor: f64,
) -> Result<Array3<f64>, DspError> {
    let (batch, num_frames, num_bins) = spectrogram.dim();
    let (want_bins, num_filters) = weight_matrix.dim();
    if num_bins != want_bins {
        return Err(DspError::BinMismatch { got: num_bins, want: want_bins });
    }

    let mut out = Array3::zeros((batch, num_frames, num_filters));
    for (mut mel, spec) in out.outer_iter_mut().zip(spectrogram.outer_iter()) {
        mel.assign(&spec.dot(&weight_matrix));
    }
    out.mapv_inplace(|e: f64| e.max(mel_floor).ln());
    Ok(out)
}
