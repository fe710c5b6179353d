//! Pre-emphasis filter.

use ndarray::{Array3, ArrayView3, Axis, s};

use crate::DspError;

/// Applies `y[t] = x[t] - coeff * x[t - 1]` along the last axis.
///
/// The first sample of each frame is consumed, so `[batch, num_frames, n]`
/// frames become `[batch, num_frames, n - 1]`.
pub fn pre_emphasis(frames: ArrayView3<'_, f64>, coeff: f64) -> Result<Array3<f64>, DspError> {
    let n = frames.len_of(Axis(2));
    if n < 2 {
        return Err(DspError::FrameTooShort(n));
    }
    let current = frames.slice(s![.., .., 1..]);
    let previous = frames.slice(s![.., .., ..n - 1]);
    Ok(&current - &(&previous * coeff))
}
