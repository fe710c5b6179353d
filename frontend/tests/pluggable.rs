//! Caller-supplied spectral transforms and output transformations.

use std::sync::{Arc, Mutex};

use melfront::{
    Complex, DType, Features, FftConfig, Frames, FrontendError, LogMelFrontend,
    LogMelFrontendConfig, OutputTransform, OutputTransformConfig, SpectralTransform, Spectrum,
    Tensor,
};
use ndarray::{Array2, Array3, ArrayView2, s};

fn config() -> LogMelFrontendConfig {
    LogMelFrontendConfig::new(16000, 25.0, 10.0, 80, 1e-6)
}

/// Records the dtype and size of every call and returns a flat spectrum.
#[derive(Debug, Default)]
struct RecordingFft {
    calls: Mutex<Vec<(DType, usize, usize)>>,
}

impl SpectralTransform for RecordingFft {
    fn transform(&self, frames: &Frames, n: usize) -> Result<Spectrum, FrontendError> {
        let frame_len = frames.shape()[2];
        self.calls
            .lock()
            .map_err(|e| FrontendError::Transform(e.to_string()))?
            .push((frames.dtype(), n, frame_len));
        let (batch, num_frames) = (frames.shape()[0], frames.shape()[1]);
        Ok(Spectrum {
            data: Array3::from_elem((batch, num_frames, n / 2 + 1), Complex::new(1.0, 0.0)),
            dtype: frames.dtype(),
        })
    }
}

#[derive(Debug)]
struct Failing;

impl SpectralTransform for Failing {
    fn transform(&self, _frames: &Frames, _n: usize) -> Result<Spectrum, FrontendError> {
        Err(FrontendError::Transform("device unavailable".into()))
    }
}

/// Adds a constant to every feature.
#[derive(Debug)]
struct Shift(f64);

impl OutputTransform for Shift {
    fn apply(
        &self,
        features: Features,
        _paddings: ArrayView2<'_, f64>,
    ) -> Result<Features, FrontendError> {
        let dtype = features.dtype();
        Ok(Tensor::new(features.into_data() + self.0, dtype))
    }
}

/// Drops the last filter.
#[derive(Debug)]
struct Truncate;

impl OutputTransform for Truncate {
    fn apply(
        &self,
        features: Features,
        _paddings: ArrayView2<'_, f64>,
    ) -> Result<Features, FrontendError> {
        let dtype = features.dtype();
        let data = features.data().slice(s![.., .., ..-1]).to_owned();
        Ok(Tensor::new(data, dtype))
    }
}

#[test]
fn fft_receives_compute_dtype() {
    let fft = Arc::new(RecordingFft::default());
    let fe = LogMelFrontend::new(config().with_fft(FftConfig::custom(fft.clone()))).unwrap();
    let paddings = Array2::<f64>::zeros((1, 800));

    let cases = [
        (Tensor::from_array(&Array2::<i16>::zeros((1, 800))), DType::BF16),
        (Tensor::from_array(&Array2::<i32>::zeros((1, 800))), DType::F32),
        (Tensor::from_array(&Array2::<i64>::zeros((1, 800))), DType::F64),
        (Tensor::new(Array2::zeros((1, 800)), DType::BF16), DType::BF16),
        (Tensor::from_array(&Array2::<f32>::zeros((1, 800))), DType::F32),
        (Tensor::from_array(&Array2::<f64>::zeros((1, 800))), DType::F64),
    ];
    for (inputs, want) in &cases {
        let out = fe.forward(inputs, paddings.view()).unwrap();
        assert_eq!(out.outputs.dtype(), *want);
    }

    let calls = fft.calls.lock().unwrap();
    let seen: Vec<DType> = calls.iter().map(|c| c.0).collect();
    let want: Vec<DType> = cases.iter().map(|c| c.1).collect();
    assert_eq!(seen, want);
    // Pre-emphasis has already consumed the extra sample.
    assert!(calls.iter().all(|&(_, n, len)| n == 512 && len == 400));
}

#[test]
fn fft_not_called_for_unsupported_dtype() {
    let fft = Arc::new(RecordingFft::default());
    let fe = LogMelFrontend::new(config().with_fft(FftConfig::custom(fft.clone()))).unwrap();
    let inputs = Tensor::from_array(&Array2::<u8>::zeros((1, 800)));
    let err = fe.forward(&inputs, Array2::zeros((1, 800)).view()).unwrap_err();
    assert!(matches!(err, FrontendError::UnsupportedDtype(DType::U8)));
    assert!(fft.calls.lock().unwrap().is_empty());
}

#[test]
fn fft_size_is_overridden() {
    let fft = Arc::new(RecordingFft::default());
    let cfg = config().with_fft(FftConfig::Custom { transform: fft.clone(), n: Some(1024) });
    let fe = LogMelFrontend::new(cfg).unwrap();
    assert_eq!(fe.fft_size(), 512);

    let inputs = Tensor::from_array(&Array2::<f32>::zeros((1, 800)));
    fe.forward(&inputs, Array2::zeros((1, 800)).view()).unwrap();
    assert_eq!(fft.calls.lock().unwrap()[0].1, 512);
}

#[test]
fn fft_errors_propagate() {
    let fe = LogMelFrontend::new(config().with_fft(FftConfig::custom(Arc::new(Failing)))).unwrap();
    let inputs = Tensor::from_array(&Array2::<f32>::zeros((1, 800)));
    let err = fe.forward(&inputs, Array2::zeros((1, 800)).view()).unwrap_err();
    assert!(matches!(err, FrontendError::Transform(_)));
    assert!(err.to_string().contains("device unavailable"));
}

#[test]
fn custom_output_transform_runs_before_masking() {
    let mut paddings = Array2::<f64>::zeros((1, 3200));
    paddings.slice_mut(s![.., 2000..]).fill(1.0);
    let inputs = Tensor::from_array(&Array2::from_shape_fn((1, 3200), |(_, i)| {
        ((i % 37) as f64 / 37.0 - 0.5) as f32
    }));

    let plain = LogMelFrontend::new(config()).unwrap();
    let shifted = LogMelFrontend::new(
        config().with_output_transformation(Some(OutputTransformConfig::Custom(Arc::new(Shift(2.0))))),
    )
    .unwrap();

    let a = plain.forward(&inputs, paddings.view()).unwrap();
    let b = shifted.forward(&inputs, paddings.view()).unwrap();
    assert_eq!(a.paddings, b.paddings);
    for ((idx, &x), &y) in a.outputs.data().indexed_iter().zip(b.outputs.data().iter()) {
        if a.paddings[[idx.0, idx.1]] == 1.0 {
            assert_eq!(y, 0.0);
        } else {
            assert_eq!(y, DType::F32.quantize(x + 2.0));
        }
    }
}

#[test]
fn output_transform_must_keep_shape() {
    let fe = LogMelFrontend::new(
        config().with_output_transformation(Some(OutputTransformConfig::Custom(Arc::new(Truncate)))),
    )
    .unwrap();
    let inputs = Tensor::from_array(&Array2::<f32>::zeros((1, 800)));
    let err = fe.forward(&inputs, Array2::zeros((1, 800)).view()).unwrap_err();
    assert!(matches!(err, FrontendError::ShapeMismatch { .. }));
}

#[test]
fn mean_std_from_yaml() {
    let yaml = r#"
sample_rate: 16000
frame_size_ms: 25
hop_size_ms: 10
num_filters: 80
mel_floor: 1.0e-6
output_transformation:
  type: mean_std
  mean: [-5.0]
  std: [2.0]
"#;
    let cfg: LogMelFrontendConfig = serde_yaml::from_str(yaml).unwrap();
    let plain = LogMelFrontend::new(config().with_pre_emphasis(cfg.pre_emphasis)).unwrap();
    let normalized = LogMelFrontend::new(cfg).unwrap();

    let inputs = Tensor::from_array(&Array2::from_shape_fn((1, 1600), |(_, i)| {
        ((i * 7 % 100) as f64 / 100.0) as f32
    }));
    let paddings = Array2::<f64>::zeros((1, 1600));
    let a = plain.forward(&inputs, paddings.view()).unwrap();
    let b = normalized.forward(&inputs, paddings.view()).unwrap();
    for (&x, &y) in a.outputs.data().iter().zip(b.outputs.data().iter()) {
        assert_eq!(y, DType::F32.quantize((x + 5.0) / 2.0));
    }
}
