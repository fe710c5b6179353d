//! Element encodings and the dtype rules of the spectral transform.

use std::fmt;

use melfront_dsp::Precision;
use serde::{Deserialize, Serialize};

use crate::FrontendError;

/// Logical element encoding of a [`Tensor`](crate::Tensor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    U8,
    I8,
    I16,
    I32,
    I64,
    BF16,
    F32,
    F64,
}

impl DType {
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::U8 => "u8",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::BF16 | DType::F32 | DType::F64)
    }

    /// Machine epsilon of a floating-point dtype.
    pub fn epsilon(self) -> Option<f64> {
        match self {
            DType::BF16 => Some(0.0078125), // 2^-7
            DType::F32 => Some(f32::EPSILON as f64),
            DType::F64 => Some(f64::EPSILON),
            _ => None,
        }
    }

    /// Rounds `v` to the nearest value representable in this dtype.
    ///
    /// Integer conversions truncate toward zero and saturate; NaN maps to 0.
    pub fn quantize(self, v: f64) -> f64 {
        match self {
            DType::Bool => {
                if v != 0.0 { 1.0 } else { 0.0 }
            }
            DType::U8 => v as u8 as f64,
            DType::I8 => v as i8 as f64,
            DType::I16 => v as i16 as f64,
            DType::I32 => v as i32 as f64,
            DType::I64 => v as i64 as f64,
            DType::BF16 => round_bf16(v),
            DType::F32 => v as f32 as f64,
            DType::F64 => v,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Round-to-nearest-even truncation of an f32 to its upper 16 bits.
fn round_bf16(v: f64) -> f64 {
    let x = v as f32;
    if x.is_nan() {
        return f64::NAN;
    }
    let bits = x.to_bits();
    let rounding = 0x7fff + ((bits >> 16) & 1);
    f32::from_bits(bits.wrapping_add(rounding) & 0xffff_0000) as f64
}

/// Maps the dtype of the frames to the dtype the spectrogram is computed in.
///
/// | input | compute |
/// |---|---|
/// | bf16, f32, f64 | unchanged |
/// | i16 | bf16 |
/// | i32 | f32 |
/// | i64 | f64 |
pub fn fft_dtype(input: DType) -> Result<DType, FrontendError> {
    match input {
        DType::BF16 | DType::F32 | DType::F64 => Ok(input),
        DType::I16 => Ok(DType::BF16),
        DType::I32 => Ok(DType::F32),
        DType::I64 => Ok(DType::F64),
        other => Err(FrontendError::UnsupportedDtype(other)),
    }
}

/// The direct real FFT only runs in f32 or f64; everything else goes
/// through f32.
pub fn rfft_dtype(compute: DType) -> DType {
    match compute {
        DType::F32 | DType::F64 => compute,
        _ => DType::F32,
    }
}

pub(crate) fn precision(dtype: DType) -> Precision {
    match dtype {
        DType::F64 => Precision::F64,
        _ => Precision::F32,
    }
}
