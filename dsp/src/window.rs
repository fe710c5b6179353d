//! Analysis windows.

use std::f64::consts::PI;

use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

/// Window function applied to each frame before the FFT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
}

/// Generates a periodic window of the given length.
pub fn window(window_type: WindowType, size: usize) -> Array1<f64> {
    if size <= 1 {
        return Array1::ones(size);
    }
    let (a, b) = match window_type {
        WindowType::Hann => (0.5, 0.5),
        WindowType::Hamming => (0.54, 0.46),
    };
    Array1::from_shape_fn(size, |i| a - b * (2.0 * PI * i as f64 / size as f64).cos())
}

/// Multiplies every `[batch, num_frames, frame_size]` frame by the window.
pub fn windowing(mut frames: Array3<f64>, window_type: WindowType) -> Array3<f64> {
    let w = window(window_type, frames.len_of(ndarray::Axis(2)));
    frames *= &w;
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let w = window(WindowType::Hann, 400);
        assert_eq!(w.len(), 400);
        assert!(w[0].abs() < 1e-12);
        assert!((w[200] - 1.0).abs() < 1e-12);
        // Periodic: symmetric around the center sample.
        for i in 1..200 {
            assert!((w[i] - w[400 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hamming_window() {
        let w = window(WindowType::Hamming, 400);
        assert!((w[0] - 0.08).abs() < 1e-12);
        assert!((w[200] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_degenerate() {
        assert_eq!(window(WindowType::Hann, 0).len(), 0);
        assert_eq!(window(WindowType::Hann, 1)[0], 1.0);
    }

    #[test]
    fn test_windowing_broadcasts() {
        let frames = Array3::<f64>::ones((2, 3, 8));
        let out = windowing(frames, WindowType::Hann);
        let w = window(WindowType::Hann, 8);
        for b in 0..2 {
            for t in 0..3 {
                for i in 0..8 {
                    assert_eq!(out[[b, t, i]], w[i]);
                }
            }
        }
    }
}
