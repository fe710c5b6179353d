//! Dtype-tagged tensors.
//!
//! Values are stored as `f64` and always hold numbers representable in the
//! tensor's [`DType`]: constructing or casting a tensor rounds every element
//! to that encoding. Elementwise stages (framing, pre-emphasis, windowing)
//! keep the dtype tag of their input; the frontend re-quantizes only where it
//! casts explicitly.

use melfront_dsp::spectrum::Complex;
use ndarray::{Array, Array1, ArrayBase, ArrayView, Axis, Data, Dimension, Ix2, Ix3};

use crate::DType;

/// Native element types that can be turned into a [`Tensor`].
pub trait Element: Copy {
    const DTYPE: DType;

    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_element! {
    u8 => DType::U8,
    i8 => DType::I8,
    i16 => DType::I16,
    i32 => DType::I32,
    i64 => DType::I64,
    f32 => DType::F32,
    f64 => DType::F64,
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }
}

/// An n-dimensional array of real values with a logical element dtype.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<D: Dimension> {
    data: Array<f64, D>,
    dtype: DType,
}

impl<D: Dimension> Tensor<D> {
    /// Creates a tensor, rounding every value to `dtype`.
    pub fn new(mut data: Array<f64, D>, dtype: DType) -> Self {
        if dtype != DType::F64 {
            data.mapv_inplace(|v| dtype.quantize(v));
        }
        Self { data, dtype }
    }

    /// Creates a tensor from a native array, taking the dtype from the
    /// element type.
    pub fn from_array<S, T>(array: &ArrayBase<S, D>) -> Self
    where
        S: Data<Elem = T>,
        T: Element,
    {
        Self { data: array.mapv(T::to_f64), dtype: T::DTYPE }
    }

    /// Keeps `dtype` as a tag without rounding `data`.
    pub(crate) fn tagged(data: Array<f64, D>, dtype: DType) -> Self {
        Self { data, dtype }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &Array<f64, D> {
        &self.data
    }

    pub fn view(&self) -> ArrayView<'_, f64, D> {
        self.data.view()
    }

    pub fn into_data(self) -> Array<f64, D> {
        self.data
    }

    /// Converts the tensor to `dtype`, rounding values as needed.
    pub fn cast(self, dtype: DType) -> Self {
        if dtype == self.dtype {
            self
        } else {
            Self::new(self.data, dtype)
        }
    }
}

impl Tensor<Ix2> {
    /// Decodes raw little-endian PCM16 bytes into a `[1, num_samples]` i16
    /// tensor. A trailing odd byte is ignored.
    pub fn from_pcm16_le(pcm: &[u8]) -> Self {
        let samples: Array1<f64> = pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f64)
            .collect();
        Self { data: samples.insert_axis(Axis(0)), dtype: DType::I16 }
    }
}

/// Complex output of a spectral transform, `[batch, num_frames, num_bins]`.
///
/// `dtype` is the real precision the transform ran in.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub data: Array<Complex<f64>, Ix3>,
    pub dtype: DType,
}
