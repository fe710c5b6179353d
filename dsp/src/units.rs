//! Unit conversions.

/// Converts a duration in milliseconds to a sample count, rounded to the
/// nearest sample.
///
/// Negative and non-finite durations map to 0.
pub fn ms_to_samples(duration_ms: f64, sample_rate: usize) -> usize {
    let samples = (duration_ms * sample_rate as f64 / 1000.0).round();
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Returns the smallest power of two that is `>= n` (1 for `n == 0`), or 0
/// when that power does not fit in a `usize`.
pub fn next_power_of_2(n: usize) -> usize {
    n.max(1).checked_next_power_of_two().unwrap_or(0)
}
