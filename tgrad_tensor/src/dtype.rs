//! Element types and the runtime dtype tag.
//!
//! Tensors are generic over an [`Element`] type, so mixing dtypes in one
//! expression is a compile error rather than a runtime surprise. The
//! [`DType`] tag exists for reflection and for parsing user-facing dtype
//! names.

use std::fmt;
use std::str::FromStr;

use num_traits::{FromPrimitive, NumAssign, Signed, ToPrimitive};

use crate::error::{Error, Result};

/// Runtime tag for the supported element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int32,
    Float32,
    Float64,
}

impl DType {
    pub fn name(self) -> &'static str {
        match self {
            DType::Int32 => "int32",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    pub fn is_float(self) -> bool {
        !matches!(self, DType::Int32)
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::Int32 | DType::Float32 => 4,
            DType::Float64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int32" | "int" => Ok(DType::Int32),
            "float32" | "float" => Ok(DType::Float32),
            "float64" | "double" => Ok(DType::Float64),
            other => Err(Error::Dtype(format!("unsupported data type '{other}'"))),
        }
    }
}

/// Scalar element of a tensor. Implemented for `i32`, `f32` and `f64`.
pub trait Element:
    Copy
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + NumAssign
    + Signed
    + FromPrimitive
    + ToPrimitive
    + 'static
{
    const DTYPE: DType;

    /// Conversion from `f64` that fails when the value cannot be
    /// represented without truncation or overflow. For the float types
    /// this only rounds, which counts as representable.
    fn from_f64_exact(v: f64) -> Option<Self>;

    /// Truncating conversion from `f64`.
    fn from_f64_trunc(v: f64) -> Self;

    /// Widening conversion to `f64`, always exact for the supported types.
    fn as_f64(self) -> f64;
}

impl Element for i32 {
    const DTYPE: DType = DType::Int32;

    fn from_f64_exact(v: f64) -> Option<Self> {
        if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 {
            Some(v as i32)
        } else {
            None
        }
    }

    fn from_f64_trunc(v: f64) -> Self {
        v as i32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::Float32;

    fn from_f64_exact(v: f64) -> Option<Self> {
        Some(v as f32)
    }

    fn from_f64_trunc(v: f64) -> Self {
        v as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;

    fn from_f64_exact(v: f64) -> Option<Self> {
        Some(v)
    }

    fn from_f64_trunc(v: f64) -> Self {
        v
    }

    fn as_f64(self) -> f64 {
        self
    }
}

/// Floating-point element. Gates the transcendental operations,
/// activations, losses and the backward pass.
pub trait FloatElement: Element + num_traits::Float {}

impl FloatElement for f32 {}
impl FloatElement for f64 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("int32".parse::<DType>().unwrap(), DType::Int32);
        assert_eq!("int".parse::<DType>().unwrap(), DType::Int32);
        assert_eq!("float".parse::<DType>().unwrap(), DType::Float32);
        assert_eq!("float32".parse::<DType>().unwrap(), DType::Float32);
        assert_eq!("double".parse::<DType>().unwrap(), DType::Float64);
        assert_eq!("float64".parse::<DType>().unwrap(), DType::Float64);
        assert!("float16".parse::<DType>().is_err());
    }

    #[test]
    fn exact_conversion_rejects_fractional_ints() {
        assert_eq!(i32::from_f64_exact(3.0), Some(3));
        assert_eq!(i32::from_f64_exact(3.5), None);
        assert_eq!(i32::from_f64_exact(1e12), None);
        assert_eq!(f64::from_f64_exact(3.5), Some(3.5));
    }

    #[test]
    fn truncating_conversion_drops_fractions() {
        assert_eq!(i32::from_f64_trunc(3.9), 3);
        assert_eq!(i32::from_f64_trunc(-3.9), -3);
    }

    #[test]
    fn dtype_reflection() {
        assert!(DType::Float32.is_float());
        assert!(!DType::Int32.is_float());
        assert_eq!(DType::Float64.size_of(), 8);
        assert_eq!(format!("{}", DType::Float32), "float32");
    }
}
