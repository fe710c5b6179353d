//! Mel-scale utilities and filterbank generation.

use ndarray::Array2;

use crate::DspError;

const MEL_BREAK_FREQUENCY_HERTZ: f64 = 700.0;
const MEL_HIGH_FREQUENCY_Q: f64 = 1127.0;

/// Converts frequency in Hz to the HTK mel scale.
pub fn hertz_to_mel(hz: f64) -> f64 {
    MEL_HIGH_FREQUENCY_Q * (1.0 + hz / MEL_BREAK_FREQUENCY_HERTZ).ln()
}

/// Converts HTK mel back to Hz.
pub fn mel_to_hertz(mel: f64) -> f64 {
    MEL_BREAK_FREQUENCY_HERTZ * ((mel / MEL_HIGH_FREQUENCY_Q).exp() - 1.0)
}

/// Creates the `[num_spectrogram_bins, num_filters]` weight matrix that maps
/// a linear-frequency magnitude spectrogram to mel bands.
///
/// Spectrogram bin `k` sits at `k * nyquist / (num_spectrogram_bins - 1)` Hz.
/// Filter `m` is a triangle in the mel domain spanning band edges `m` and
/// `m + 2` of `num_filters + 2` points spaced evenly between the mel values
/// of `lower_edge_hz` and `upper_edge_hz`. The DC bin gets zero weight.
pub fn linear_to_mel_weight_matrix(
    num_filters: usize,
    num_spectrogram_bins: usize,
    sample_rate: usize,
    lower_edge_hz: f64,
    upper_edge_hz: f64,
) -> Result<Array2<f64>, DspError> {
    if num_filters == 0 {
        return Err(DspError::NonPositive { name: "num_filters", value: num_filters });
    }
    if num_spectrogram_bins < 2 {
        return Err(DspError::NonPositive {
            name: "num_spectrogram_bins - 1",
            value: num_spectrogram_bins.saturating_sub(1),
        });
    }
    if sample_rate == 0 {
        return Err(DspError::NonPositive { name: "sample_rate", value: sample_rate });
    }
    let nyquist = sample_rate as f64 / 2.0;
    if !(lower_edge_hz >= 0.0 && lower_edge_hz < upper_edge_hz && upper_edge_hz <= nyquist) {
        return Err(DspError::InvalidEdges { lower: lower_edge_hz, upper: upper_edge_hz, nyquist });
    }

    // num_filters + 2 equally spaced mel points.
    let low_mel = hertz_to_mel(lower_edge_hz);
    let high_mel = hertz_to_mel(upper_edge_hz);
    let step = (high_mel - low_mel) / (num_filters + 1) as f64;
    let edges: Vec<f64> = (0..num_filters + 2).map(|i| low_mel + i as f64 * step).collect();

    let bin_hz = nyquist / (num_spectrogram_bins - 1) as f64;
    let mut weights = Array2::zeros((num_spectrogram_bins, num_filters));
    for k in 1..num_spectrogram_bins {
        let mel = hertz_to_mel(k as f64 * bin_hz);
        for m in 0..num_filters {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let rising = (mel - left) / (center - left);
            let falling = (right - mel) / (right - center);
            weights[[k, m]] = rising.min(falling).max(0.0);
        }
    }
    Ok(weights)
}
