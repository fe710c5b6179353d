//! Overlapping frame extraction.
//!
//! A [`FrameGeometry`] fixes the frame size, hop size and end-of-signal
//! handling. The same geometry drives [`FrameGeometry::frame`],
//! [`FrameGeometry::frame_paddings`] and [`FrameGeometry::num_frames`], so
//! the frame count predicted for a sequence length always matches the
//! number of frames actually produced.

use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::DspError;

/// How the trailing samples that do not fill a whole frame are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEnd {
    /// Only frames that lie entirely inside the signal are emitted.
    #[default]
    Drop,
    /// A frame starts at every hop; frames running past the end are filled
    /// with zeros and the filled positions count as padding.
    Pad,
}

/// Rule for marking a frame as padded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePaddingPolicy {
    /// A frame is padded if any of its samples is padded.
    #[default]
    AnyPadded,
    /// A frame is padded only if all of its samples are padded.
    AllPadded,
}

/// Frame size, hop size and end handling of a framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    frame_size: usize,
    hop_size: usize,
    end: FrameEnd,
}

impl FrameGeometry {
    /// Creates a geometry that drops trailing partial frames.
    pub fn new(frame_size: usize, hop_size: usize) -> Result<Self, DspError> {
        if frame_size == 0 {
            return Err(DspError::NonPositive { name: "frame_size", value: frame_size });
        }
        if hop_size == 0 {
            return Err(DspError::NonPositive { name: "hop_size", value: hop_size });
        }
        Ok(Self { frame_size, hop_size, end: FrameEnd::Drop })
    }

    /// Returns a copy with the given end handling.
    pub fn with_end(self, end: FrameEnd) -> Self {
        Self { end, ..self }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn end(&self) -> FrameEnd {
        self.end
    }

    /// Number of frames produced for a signal of `seq_len` samples.
    ///
    /// - [`FrameEnd::Drop`]: `floor((seq_len - frame_size) / hop_size) + 1`,
    ///   or 0 when `seq_len < frame_size`.
    /// - [`FrameEnd::Pad`]: `ceil(seq_len / hop_size)`.
    pub fn num_frames(&self, seq_len: usize) -> usize {
        match self.end {
            FrameEnd::Drop => {
                if seq_len < self.frame_size {
                    0
                } else {
                    (seq_len - self.frame_size) / self.hop_size + 1
                }
            }
            FrameEnd::Pad => seq_len.div_ceil(self.hop_size),
        }
    }

    /// Slices `[batch, seq_len]` signals into `[batch, num_frames, frame_size]`.
    ///
    /// Positions past the end of the signal are filled with zeros.
    pub fn frame(&self, signal: ArrayView2<'_, f64>) -> Array3<f64> {
        self.frame_with(signal, 0.0)
    }

    /// Derives `[batch, num_frames]` frame paddings from `[batch, seq_len]`
    /// sample paddings.
    ///
    /// Positions past the end of the signal count as padded. The result is
    /// a 0/1 mask; any non-zero sample padding is treated as padded.
    pub fn frame_paddings(
        &self,
        paddings: ArrayView2<'_, f64>,
        policy: FramePaddingPolicy,
    ) -> Array2<f64> {
        let framed = self.frame_with(paddings, 1.0);
        framed.map_axis(Axis(2), |samples| {
            let padded = match policy {
                FramePaddingPolicy::AnyPadded => samples.iter().any(|&p| p != 0.0),
                FramePaddingPolicy::AllPadded => samples.iter().all(|&p| p != 0.0),
            };
            if padded { 1.0 } else { 0.0 }
        })
    }

    fn frame_with(&self, signal: ArrayView2<'_, f64>, pad_value: f64) -> Array3<f64> {
        let (batch, seq_len) = signal.dim();
        let num_frames = self.num_frames(seq_len);
        let mut frames = Array3::from_elem((batch, num_frames, self.frame_size), pad_value);
        for ((b, t, i), v) in frames.indexed_iter_mut() {
            let pos = t * self.hop_size + i;
            if pos < seq_len {
                *v = signal[[b, pos]];
            }
        }
        frames
    }
}
