use half::{bf16, f16};

use crate::dtype::{DType, WithDType};

// Storage — Typed host buffer behind a tensor
//
// One variant per DType. Kernels in the reference executor read storage as
// f64 (`to_f64_vec`), compute, and write back through `from_f64`, so every
// variant only needs lossless-enough conversion to and from f64.
//
// Bool is stored as one byte per element; any nonzero input becomes 1.

/// Host-side buffer holding the elements of one tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    F16(Vec<f16>),
    BF16(Vec<bf16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    U8(Vec<u8>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    Bool(Vec<u8>),
}

fn cast_from_f64<T: WithDType>(data: &[f64]) -> Vec<T> {
    data.iter().map(|&v| T::from_f64(v)).collect()
}

fn cast_to_f64<T: WithDType>(data: &[T]) -> Vec<f64> {
    data.iter().map(|&v| v.to_f64()).collect()
}

impl Storage {
    /// Allocate `len` zero-valued elements of `dtype`.
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F16 => Storage::F16(vec![f16::ZERO; len]),
            DType::BF16 => Storage::BF16(vec![bf16::ZERO; len]),
            DType::F32 => Storage::F32(vec![0.0; len]),
            DType::F64 => Storage::F64(vec![0.0; len]),
            DType::U8 => Storage::U8(vec![0; len]),
            DType::I32 => Storage::I32(vec![0; len]),
            DType::I64 => Storage::I64(vec![0; len]),
            DType::Bool => Storage::Bool(vec![0; len]),
        }
    }

    /// Convert an f64 slice into storage of `dtype`.
    pub fn from_f64(data: &[f64], dtype: DType) -> Self {
        match dtype {
            DType::F16 => Storage::F16(cast_from_f64(data)),
            DType::BF16 => Storage::BF16(cast_from_f64(data)),
            DType::F32 => Storage::F32(cast_from_f64(data)),
            DType::F64 => Storage::F64(data.to_vec()),
            DType::U8 => Storage::U8(cast_from_f64(data)),
            DType::I32 => Storage::I32(cast_from_f64(data)),
            DType::I64 => Storage::I64(cast_from_f64(data)),
            DType::Bool => Storage::Bool(data.iter().map(|&v| u8::from(v != 0.0)).collect()),
        }
    }

    /// Build storage from a typed slice. I64 values beyond 2^53 lose precision.
    pub fn from_slice<T: WithDType>(data: &[T]) -> Self {
        Storage::from_f64(&cast_to_f64(data), T::DTYPE)
    }

    /// The element type held by this buffer.
    pub fn dtype(&self) -> DType {
        match self {
            Storage::F16(_) => DType::F16,
            Storage::BF16(_) => DType::BF16,
            Storage::F32(_) => DType::F32,
            Storage::F64(_) => DType::F64,
            Storage::U8(_) => DType::U8,
            Storage::I32(_) => DType::I32,
            Storage::I64(_) => DType::I64,
            Storage::Bool(_) => DType::Bool,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Storage::F16(v) => v.len(),
            Storage::BF16(v) => v.len(),
            Storage::F32(v) => v.len(),
            Storage::F64(v) => v.len(),
            Storage::U8(v) => v.len(),
            Storage::I32(v) => v.len(),
            Storage::I64(v) => v.len(),
            Storage::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy every element out as f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Storage::F16(v) => cast_to_f64(v),
            Storage::BF16(v) => cast_to_f64(v),
            Storage::F32(v) => cast_to_f64(v),
            Storage::F64(v) => v.clone(),
            Storage::U8(v) | Storage::Bool(v) => cast_to_f64(v),
            Storage::I32(v) => cast_to_f64(v),
            Storage::I64(v) => cast_to_f64(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_per_dtype() {
        for dtype in DType::ALL {
            let s = Storage::zeros(dtype, 3);
            assert_eq!(s.dtype(), dtype);
            assert_eq!(s.to_f64_vec(), vec![0.0; 3]);
        }
    }

    #[test]
    fn test_bool_normalizes_nonzero() {
        let s = Storage::from_f64(&[0.0, -2.5, 7.0], DType::Bool);
        assert_eq!(s, Storage::Bool(vec![0, 1, 1]));
    }

    #[test]
    fn test_int_truncates() {
        let s = Storage::from_f64(&[1.9, -1.9], DType::I32);
        assert_eq!(s.to_f64_vec(), vec![1.0, -1.0]);
    }
}
