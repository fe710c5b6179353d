//! The log-mel frontend.

use melfront_dsp::units::ms_to_samples;
use melfront_dsp::window::windowing;
use melfront_dsp::{FrameGeometry, FramePaddingPolicy, WindowType};
use ndarray::{Array2, ArrayView2, Axis, Ix2, Ix4, Zip};
use tracing::{debug, trace};

use crate::config::LogMelFrontendConfig;
use crate::dtype::fft_dtype;
use crate::stages::{FftStage, LogMelSpectrogram, OutputStage, PreEmphasis};
use crate::{FrontendError, Tensor};

/// Largest frame size, in samples, accepted at construction.
pub const MAX_FRAME_SIZE: usize = 1 << 24;

/// Largest FFT size accepted from `fft_size_fn`.
pub const MAX_FFT_SIZE: usize = 1 << 25;

/// Output of [`LogMelFrontend::forward`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrontendOutput {
    /// `[batch, num_frames, num_filters, 1]` log-mel features. Padded frames
    /// are exactly zero.
    pub outputs: Tensor<Ix4>,
    /// `[batch, num_frames]` 0/1 frame paddings; 1 marks a padded frame.
    pub paddings: Array2<f64>,
}

/// Computes log-mel spectrogram features.
///
/// The stages run in this order:
///
/// ```text
/// Framer -> PreEmphasis -> Window -> FFT -> LogMel -> OutputTransformation
/// ```
///
/// Every stage and the mel filterbank are built once in [`LogMelFrontend::new`];
/// [`LogMelFrontend::forward`] only reads them, so a frontend can be shared
/// across threads and called concurrently.
#[derive(Debug)]
pub struct LogMelFrontend {
    config: LogMelFrontendConfig,
    num_filters: usize,
    fft_size: usize,
    geometry: FrameGeometry,
    window: WindowType,
    padding_policy: FramePaddingPolicy,
    pre_emphasis: Option<PreEmphasis>,
    fft: FftStage,
    spectrogram: LogMelSpectrogram,
    output_transformation: Option<OutputStage>,
}

impl LogMelFrontend {
    /// Validates `config` and builds every stage.
    pub fn new(config: LogMelFrontendConfig) -> Result<Self, FrontendError> {
        if config.output_dim != 1 {
            return Err(FrontendError::OutputDim(config.output_dim));
        }
        let sample_rate = config.sample_rate.ok_or(FrontendError::MissingField("sample_rate"))?;
        let frame_size_ms = config.frame_size_ms.ok_or(FrontendError::MissingField("frame_size_ms"))?;
        let hop_size_ms = config.hop_size_ms.ok_or(FrontendError::MissingField("hop_size_ms"))?;
        let num_filters = config.num_filters.ok_or(FrontendError::MissingField("num_filters"))?;
        let mel_floor = config.mel_floor.ok_or(FrontendError::MissingField("mel_floor"))?;

        if sample_rate == 0 {
            return Err(FrontendError::invalid("sample_rate", "must be positive"));
        }
        let frame_size = ms_to_samples(frame_size_ms, sample_rate);
        if frame_size == 0 {
            return Err(FrontendError::invalid(
                "frame_size_ms",
                format!("{frame_size_ms} ms is less than one sample at {sample_rate} Hz"),
            ));
        }
        if frame_size > MAX_FRAME_SIZE {
            return Err(FrontendError::invalid(
                "frame_size_ms",
                format!("{frame_size} samples exceeds the limit of {MAX_FRAME_SIZE}"),
            ));
        }
        let hop_size = ms_to_samples(hop_size_ms, sample_rate);
        if hop_size == 0 {
            return Err(FrontendError::invalid(
                "hop_size_ms",
                format!("{hop_size_ms} ms is less than one sample at {sample_rate} Hz"),
            ));
        }

        let fft_size = (config.fft_size_fn)(frame_size);
        if fft_size == 0 || fft_size > MAX_FFT_SIZE {
            return Err(FrontendError::invalid(
                "fft_size_fn",
                format!("returned {fft_size} for frame size {frame_size}, expected 1..={MAX_FFT_SIZE}"),
            ));
        }
        let fft = FftStage::build(&config.fft, fft_size)?;

        let params = config
            .spectrogram
            .resolve(num_filters, sample_rate, fft_size, mel_floor);
        let spectrogram = LogMelSpectrogram::build(params)?;
        if let Some(bins) = fft.num_bins() {
            let want = params.fft_size / 2 + 1;
            if bins != want {
                return Err(FrontendError::invalid(
                    "spectrogram.fft_size",
                    format!(
                        "filterbank expects {want} bins but the transform emits {bins} (fft_size {fft_size})"
                    ),
                ));
            }
        }

        // Features carry the resolved filter count, which may come from the
        // spectrogram config.
        let output_transformation = config
            .output_transformation
            .as_ref()
            .map(|cfg| OutputStage::build(cfg, params.num_filters))
            .transpose()?;

        // Pre-emphasis consumes one extra leading sample per frame.
        let (pre_emphasis, frame_size) = match &config.pre_emphasis {
            Some(cfg) => {
                let extended = frame_size.checked_add(1).ok_or_else(|| {
                    FrontendError::invalid("frame_size_ms", "frame size overflows with pre-emphasis")
                })?;
                (Some(PreEmphasis::build(cfg)?), extended)
            }
            None => (None, frame_size),
        };
        let geometry = FrameGeometry::new(frame_size, hop_size)?.with_end(config.frame_end);

        debug!(
            sample_rate,
            frame_size,
            hop_size,
            fft_size,
            num_filters = params.num_filters,
            pre_emphasis = pre_emphasis.is_some(),
            "log-mel frontend ready"
        );

        Ok(Self {
            num_filters: params.num_filters,
            fft_size,
            geometry,
            window: config.window,
            padding_policy: config.padding_policy,
            pre_emphasis,
            fft,
            spectrogram,
            output_transformation,
            config,
        })
    }

    pub fn config(&self) -> &LogMelFrontendConfig {
        &self.config
    }

    /// Frame size used for slicing, including the extra pre-emphasis sample.
    pub fn frame_size(&self) -> usize {
        self.geometry.frame_size()
    }

    pub fn hop_size(&self) -> usize {
        self.geometry.hop_size()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn num_filters(&self) -> usize {
        self.num_filters
    }

    /// The `[fft_size / 2 + 1, num_filters]` mel filterbank.
    pub fn filterbank(&self) -> ArrayView2<'_, f64> {
        self.spectrogram.filterbank().view()
    }

    /// Computes log-mel features.
    ///
    /// `inputs` is `[batch, seq_len]`; `paddings` is a `[batch, seq_len]`
    /// 0/1 mask where 1 marks padded samples.
    pub fn forward(
        &self,
        inputs: &Tensor<Ix2>,
        paddings: ArrayView2<'_, f64>,
    ) -> Result<FrontendOutput, FrontendError> {
        if inputs.shape() != paddings.shape() {
            return Err(FrontendError::ShapeMismatch {
                what: "paddings",
                expected: inputs.shape().to_vec(),
                got: paddings.shape().to_vec(),
            });
        }

        let compute_dtype = fft_dtype(inputs.dtype())?;
        let frames = Tensor::tagged(self.geometry.frame(inputs.view()), inputs.dtype());
        let frame_paddings = self.geometry.frame_paddings(paddings, self.padding_policy);

        let frames = match &self.pre_emphasis {
            Some(stage) => stage.apply(&frames)?,
            None => frames,
        };
        let dtype = frames.dtype();
        let frames = Tensor::tagged(windowing(frames.into_data(), self.window), dtype);

        trace!(shape = ?frames.shape(), input = %dtype, compute = %compute_dtype, "spectral transform");
        let spectrum = self.fft.run(frames.cast(compute_dtype))?;
        let mut outputs = self.spectrogram.apply(&spectrum, compute_dtype)?;

        if let Some(stage) = &self.output_transformation {
            outputs = stage.apply(outputs, frame_paddings.view())?;
        }
        self.check_features(outputs.shape(), frame_paddings.dim())?;

        let dtype = outputs.dtype();
        let mut data = outputs.into_data();
        Zip::from(data.lanes_mut(Axis(2)))
            .and(&frame_paddings)
            .for_each(|mut features, &padded| {
                if padded != 0.0 {
                    features.fill(0.0);
                }
            });

        Ok(FrontendOutput {
            outputs: Tensor::tagged(data.insert_axis(Axis(3)), dtype),
            paddings: frame_paddings,
        })
    }

    fn check_features(&self, shape: &[usize], frames: (usize, usize)) -> Result<(), FrontendError> {
        let expected = [frames.0, frames.1, self.num_filters];
        if shape != expected {
            return Err(FrontendError::ShapeMismatch {
                what: "features",
                expected: expected.to_vec(),
                got: shape.to_vec(),
            });
        }
        Ok(())
    }

    /// Computes the output shape `[batch_size, num_frames, num_filters, 1]`
    /// for an input shape `[batch_size, seq_len]` without running any stage.
    ///
    /// Unknown dimensions are `None`; an unknown `seq_len` gives an unknown
    /// `num_frames`.
    pub fn output_shape(
        &self,
        input_shape: &[Option<usize>],
    ) -> Result<[Option<usize>; 4], FrontendError> {
        let &[batch_size, seq_len] = input_shape else {
            return Err(FrontendError::InvalidRank { expected: 2, got: input_shape.len() });
        };
        let num_frames = seq_len.map(|n| self.geometry.num_frames(n));
        Ok([batch_size, num_frames, Some(self.num_filters), Some(self.config.output_dim)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn base_config() -> LogMelFrontendConfig {
        LogMelFrontendConfig::new(16000, 25.0, 10.0, 80, 1e-6)
    }

    #[test]
    fn test_derived_geometry() {
        let fe = LogMelFrontend::new(base_config()).unwrap();
        assert_eq!(fe.frame_size(), 401);
        assert_eq!(fe.hop_size(), 160);
        assert_eq!(fe.fft_size(), 512);
        assert_eq!(fe.filterbank().dim(), (257, 80));

        let fe = LogMelFrontend::new(base_config().with_pre_emphasis(None)).unwrap();
        assert_eq!(fe.frame_size(), 400);
        assert_eq!(fe.fft_size(), 512);
    }

    #[test]
    fn test_fft_size_fn_sees_nominal_frame_size() {
        fn exact(n: usize) -> usize {
            n
        }
        let fe = LogMelFrontend::new(base_config().with_fft_size_fn(exact)).unwrap();
        assert_eq!(fe.fft_size(), 400);
        assert_eq!(fe.filterbank().dim(), (201, 80));
    }

    #[test]
    fn test_missing_fields() {
        let mut cfg = base_config();
        cfg.mel_floor = None;
        assert!(matches!(
            LogMelFrontend::new(cfg),
            Err(FrontendError::MissingField("mel_floor"))
        ));
        assert!(matches!(
            LogMelFrontend::new(LogMelFrontendConfig::default()),
            Err(FrontendError::MissingField("sample_rate"))
        ));
    }

    #[test]
    fn test_zero_hop_rejected() {
        let mut cfg = base_config();
        cfg.hop_size_ms = Some(0.0);
        assert!(matches!(
            LogMelFrontend::new(cfg),
            Err(FrontendError::InvalidConfig { field: "hop_size_ms", .. })
        ));
    }

    #[test]
    fn test_mismatched_spectrogram_fft_size_rejected() {
        let cfg = base_config().with_spectrogram(crate::SpectrogramConfig {
            fft_size: Some(1024),
            ..Default::default()
        });
        assert!(matches!(
            LogMelFrontend::new(cfg),
            Err(FrontendError::InvalidConfig { field: "spectrogram.fft_size", .. })
        ));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let cfg = LogMelFrontendConfig::new(16000, 1e300, 10.0, 80, 1e-6);
        assert!(matches!(
            LogMelFrontend::new(cfg),
            Err(FrontendError::InvalidConfig { field: "frame_size_ms", .. })
        ));
        let cfg = LogMelFrontendConfig::new(16000, 1e300, 10.0, 80, 1e-6).with_pre_emphasis(None);
        assert!(LogMelFrontend::new(cfg).is_err());
    }

    #[test]
    fn test_oversized_fft_rejected() {
        fn huge(_: usize) -> usize {
            usize::MAX
        }
        fn overflowed(n: usize) -> usize {
            melfront_dsp::units::next_power_of_2(n.saturating_mul(usize::MAX))
        }
        for f in [huge as fn(usize) -> usize, overflowed] {
            assert!(matches!(
                LogMelFrontend::new(base_config().with_fft_size_fn(f)),
                Err(FrontendError::InvalidConfig { field: "fft_size_fn", .. })
            ));
        }
    }

    #[test]
    fn test_output_stage_uses_spectrogram_filter_count() {
        use crate::{OutputTransformConfig, SpectrogramConfig};

        let cfg = base_config()
            .with_spectrogram(SpectrogramConfig {
                num_filters: Some(40),
                ..Default::default()
            })
            .with_output_transformation(Some(OutputTransformConfig::MeanStd {
                mean: Some(vec![1.0]),
                std: None,
            }));
        let fe = LogMelFrontend::new(cfg).unwrap();
        assert_eq!(fe.num_filters(), 40);

        let inputs = Tensor::from_array(&Array2::<f32>::from_elem((1, 1600), 0.25));
        let paddings = Array2::<f64>::zeros((1, 1600));
        let out = fe.forward(&inputs, paddings.view()).unwrap();
        assert_eq!(out.outputs.shape(), &[1, 8, 40, 1]);

        // Per-filter statistics are sized against the resolved count.
        let cfg = base_config()
            .with_spectrogram(SpectrogramConfig {
                num_filters: Some(40),
                ..Default::default()
            })
            .with_output_transformation(Some(OutputTransformConfig::MeanStd {
                mean: Some(vec![0.0; 80]),
                std: None,
            }));
        assert!(matches!(
            LogMelFrontend::new(cfg),
            Err(FrontendError::InvalidConfig { field: "output_transformation.mean", .. })
        ));
    }

    #[test]
    fn test_forward_rejects_padding_shape() {
        let fe = LogMelFrontend::new(base_config()).unwrap();
        let inputs = Tensor::from_array(&Array2::<f32>::zeros((2, 1000)));
        let paddings = Array2::<f64>::zeros((2, 999));
        assert!(matches!(
            fe.forward(&inputs, paddings.view()),
            Err(FrontendError::ShapeMismatch { what: "paddings", .. })
        ));
    }

    #[test]
    fn test_forward_unsupported_dtype() {
        let fe = LogMelFrontend::new(base_config()).unwrap();
        let inputs = Tensor::from_array(&Array2::<u8>::zeros((1, 1000)));
        let paddings = Array2::<f64>::zeros((1, 1000));
        assert!(matches!(
            fe.forward(&inputs, paddings.view()),
            Err(FrontendError::UnsupportedDtype(crate::DType::U8))
        ));
    }

    #[test]
    fn test_output_shape_rank() {
        let fe = LogMelFrontend::new(base_config()).unwrap();
        let err = fe.output_shape(&[Some(1)]).unwrap_err();
        assert!(matches!(err, FrontendError::InvalidRank { expected: 2, got: 1 }));
        assert!(err.to_string().contains("rank 2"));
        assert!(fe.output_shape(&[Some(1), Some(2), Some(3)]).is_err());
    }

    #[test]
    fn test_output_shape_unknown_dims() {
        let fe = LogMelFrontend::new(base_config()).unwrap();
        assert_eq!(
            fe.output_shape(&[None, None]).unwrap(),
            [None, None, Some(80), Some(1)]
        );
        assert_eq!(
            fe.output_shape(&[Some(4), Some(16000)]).unwrap(),
            [Some(4), Some(98), Some(80), Some(1)]
        );
    }

    #[test]
    fn test_forward_short_input_yields_no_frames() {
        let fe = LogMelFrontend::new(base_config()).unwrap();
        let inputs = Tensor::from_array(&array![[0.1f32, 0.2, 0.3]]);
        let paddings = Array2::<f64>::zeros((1, 3));
        let out = fe.forward(&inputs, paddings.view()).unwrap();
        assert_eq!(out.outputs.shape(), &[1, 0, 80, 1]);
        assert_eq!(out.paddings.dim(), (1, 0));
    }
}
