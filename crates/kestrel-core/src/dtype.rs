use std::fmt;

use serde::{Deserialize, Serialize};

// DType — Element data types understood by operators and tensors
//
// Every tensor carries a DType, and every operator's datatype-inference rule
// works purely on DTypes (no data is touched). The set mirrors what a typical
// numeric backend exposes:
//
//   F16  — 16-bit IEEE half float
//   BF16 — 16-bit brain float
//   F32  — 32-bit float, the default
//   F64  — 64-bit float
//   U8   — unsigned byte
//   I32  — signed 32-bit int
//   I64  — signed 64-bit int (indices, labels)
//   Bool — one byte per element, 0 or 1
//
// Only the first four count as "floating-point kind" for inference rules.

/// Enum of all supported element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F16,
    BF16,
    F32,
    F64,
    U8,
    I32,
    I64,
    Bool,
}

impl DType {
    /// Every variant, in declaration order.
    pub const ALL: [DType; 8] = [
        DType::F16,
        DType::BF16,
        DType::F32,
        DType::F64,
        DType::U8,
        DType::I32,
        DType::I64,
        DType::Bool,
    ];

    /// Whether this dtype is a floating-point kind (any IEEE precision).
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::BF16 | DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::U8 => "u8",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::Bool => "bool",
        };
        write!(f, "{}", s)
    }
}

// WithDType — Bridge from Rust element types to DType
//
// Lets callers write `Tensor::from_slice(&[1.0f32, 2.0], (2,))` and have the
// dtype picked from the element type. Bool has no Rust element type here; it
// is created through `from_f64_slice` with nonzero → 1.

/// Trait implemented by Rust types that can be stored in a tensor.
pub trait WithDType: Copy + Send + Sync + 'static + num_traits::NumCast + fmt::Debug {
    /// The corresponding DType enum variant.
    const DTYPE: DType;

    /// Convert this value to f64 (for generic numeric code).
    fn to_f64(self) -> f64;

    /// Create a value of this type from f64.
    fn from_f64(v: f64) -> Self;
}

impl WithDType for f32 {
    const DTYPE: DType = DType::F32;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl WithDType for f64 {
    const DTYPE: DType = DType::F64;
    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl WithDType for half::f16 {
    const DTYPE: DType = DType::F16;
    fn to_f64(self) -> f64 {
        self.to_f32() as f64
    }
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }
}

impl WithDType for half::bf16 {
    const DTYPE: DType = DType::BF16;
    fn to_f64(self) -> f64 {
        self.to_f32() as f64
    }
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }
}

impl WithDType for u8 {
    const DTYPE: DType = DType::U8;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as u8
    }
}

impl WithDType for i32 {
    const DTYPE: DType = DType::I32;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as i32
    }
}

impl WithDType for i64 {
    const DTYPE: DType = DType::I64;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_kinds() {
        let floats: Vec<DType> = DType::ALL.iter().copied().filter(|d| d.is_float()).collect();
        assert_eq!(floats, vec![DType::F16, DType::BF16, DType::F32, DType::F64]);
        assert!(!DType::Bool.is_float());
    }

    #[test]
    fn test_with_dtype_half() {
        assert_eq!(half::f16::DTYPE, DType::F16);
        let v = <half::bf16 as WithDType>::from_f64(0.5);
        assert_eq!(WithDType::to_f64(v), 0.5);
    }

    #[test]
    fn test_dtype_serde_names() {
        let json = serde_json::to_string(&DType::BF16).unwrap();
        assert_eq!(json, "\"BF16\"");
        let back: DType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DType::BF16);
    }
}
