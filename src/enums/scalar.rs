// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Scalar Module - *Single Value Container*
//!
//! Contains the Scalar type for holding a single element of any [`DType`].
//!
//! ## Purpose
//! - Carries one element between typed buffers and kernels.
//! - Implements the by-convention value conversions used when the dispatcher casts
//!   an argument into the dtype of the selected kernel row.

use std::fmt::{Display, Formatter};

use half::{bf16, f16};

use crate::enums::dtype::DType;
use crate::structs::complex::Complex;

/// # Scalar
///
/// Single values covering all supported dtypes.
///
/// Missing values are not a variant: a null element is `None` in an
/// `Option<Scalar>`, keeping the null channel orthogonal to the dtype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    BFloat16(bf16),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    Complex32(Complex<f16>),
    Complex64(Complex<f32>),
    Complex128(Complex<f64>),
}

/// Widest representation of a value, used as the pivot for conversions.
#[derive(Debug, Clone, Copy)]
enum Wide {
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex(f64, f64),
}

impl Wide {
    #[inline]
    fn int(self) -> i128 {
        match self {
            Wide::Bool(b) => b as i128,
            Wide::Int(v) => v,
            Wide::Float(v) => v as i128,
            Wide::Complex(re, _) => re as i128,
        }
    }

    #[inline]
    fn float(self) -> f64 {
        match self {
            Wide::Bool(b) => b as u8 as f64,
            Wide::Int(v) => v as f64,
            Wide::Float(v) => v,
            Wide::Complex(re, _) => re,
        }
    }

    #[inline]
    fn complex(self) -> (f64, f64) {
        match self {
            Wide::Complex(re, im) => (re, im),
            other => (other.float(), 0.0),
        }
    }

    #[inline]
    fn truth(self) -> bool {
        match self {
            Wide::Bool(b) => b,
            Wide::Int(v) => v != 0,
            Wide::Float(v) => v != 0.0,
            Wide::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }
}

impl Scalar {
    /// Returns the dtype of the held value.
    #[inline]
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Bool(_) => DType::Bool,
            Scalar::Int8(_) => DType::Int8,
            Scalar::Int16(_) => DType::Int16,
            Scalar::Int32(_) => DType::Int32,
            Scalar::Int64(_) => DType::Int64,
            Scalar::UInt8(_) => DType::UInt8,
            Scalar::UInt16(_) => DType::UInt16,
            Scalar::UInt32(_) => DType::UInt32,
            Scalar::UInt64(_) => DType::UInt64,
            Scalar::BFloat16(_) => DType::BFloat16,
            Scalar::Float16(_) => DType::Float16,
            Scalar::Float32(_) => DType::Float32,
            Scalar::Float64(_) => DType::Float64,
            Scalar::Complex32(_) => DType::Complex32,
            Scalar::Complex64(_) => DType::Complex64,
            Scalar::Complex128(_) => DType::Complex128,
        }
    }

    fn wide(&self) -> Wide {
        match *self {
            Scalar::Bool(v) => Wide::Bool(v),
            Scalar::Int8(v) => Wide::Int(v as i128),
            Scalar::Int16(v) => Wide::Int(v as i128),
            Scalar::Int32(v) => Wide::Int(v as i128),
            Scalar::Int64(v) => Wide::Int(v as i128),
            Scalar::UInt8(v) => Wide::Int(v as i128),
            Scalar::UInt16(v) => Wide::Int(v as i128),
            Scalar::UInt32(v) => Wide::Int(v as i128),
            Scalar::UInt64(v) => Wide::Int(v as i128),
            Scalar::BFloat16(v) => Wide::Float(v.to_f64()),
            Scalar::Float16(v) => Wide::Float(v.to_f64()),
            Scalar::Float32(v) => Wide::Float(v as f64),
            Scalar::Float64(v) => Wide::Float(v),
            Scalar::Complex32(c) => Wide::Complex(c.re.to_f64(), c.im.to_f64()),
            Scalar::Complex64(c) => Wide::Complex(c.re as f64, c.im as f64),
            Scalar::Complex128(c) => Wide::Complex(c.re, c.im),
        }
    }

    /// Converts the value into `to`.
    ///
    /// Integer targets wrap like an `as` cast from a wider integer, float to integer
    /// saturates, complex to real keeps the real part. The dispatcher only requests
    /// conversions that the cast resolver accepted.
    pub fn cast(&self, to: DType) -> Scalar {
        if self.dtype() == to {
            return *self;
        }
        let w = self.wide();
        match to {
            DType::Bool => Scalar::Bool(w.truth()),
            DType::Int8 => Scalar::Int8(w.int() as i8),
            DType::Int16 => Scalar::Int16(w.int() as i16),
            DType::Int32 => Scalar::Int32(w.int() as i32),
            DType::Int64 => Scalar::Int64(w.int() as i64),
            DType::UInt8 => Scalar::UInt8(w.int() as u8),
            DType::UInt16 => Scalar::UInt16(w.int() as u16),
            DType::UInt32 => Scalar::UInt32(w.int() as u32),
            DType::UInt64 => Scalar::UInt64(w.int() as u64),
            DType::BFloat16 => Scalar::BFloat16(bf16::from_f64(w.float())),
            DType::Float16 => Scalar::Float16(f16::from_f64(w.float())),
            DType::Float32 => Scalar::Float32(w.float() as f32),
            DType::Float64 => Scalar::Float64(w.float()),
            DType::Complex32 => {
                let (re, im) = w.complex();
                Scalar::Complex32(Complex::new(f16::from_f64(re), f16::from_f64(im)))
            }
            DType::Complex64 => {
                let (re, im) = w.complex();
                Scalar::Complex64(Complex::new(re as f32, im as f32))
            }
            DType::Complex128 => {
                let (re, im) = w.complex();
                Scalar::Complex128(Complex::new(re, im))
            }
        }
    }

    /// Real value as `f64`. Complex values return their real part.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.wide().float()
    }

    /// Integer value, truncating floats.
    #[inline]
    pub fn to_i64(&self) -> i64 {
        self.wide().int() as i64
    }

    /// Truthiness: non-zero numbers are `true`.
    #[inline]
    pub fn to_bool(&self) -> bool {
        self.wide().truth()
    }

    #[inline]
    pub fn is_nan(&self) -> bool {
        match self {
            Scalar::BFloat16(v) => v.is_nan(),
            Scalar::Float16(v) => v.is_nan(),
            Scalar::Float32(v) => v.is_nan(),
            Scalar::Float64(v) => v.is_nan(),
            Scalar::Complex32(c) => c.is_nan(),
            Scalar::Complex64(c) => c.is_nan(),
            Scalar::Complex128(c) => c.is_nan(),
            _ => false,
        }
    }

    /// Zero of the given dtype.
    #[inline]
    pub fn zero(dtype: DType) -> Scalar {
        Scalar::Bool(false).cast(dtype)
    }

    /// One of the given dtype.
    #[inline]
    pub fn one(dtype: DType) -> Scalar {
        Scalar::Bool(true).cast(dtype)
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int8(v) => write!(f, "{v}"),
            Scalar::Int16(v) => write!(f, "{v}"),
            Scalar::Int32(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::UInt8(v) => write!(f, "{v}"),
            Scalar::UInt16(v) => write!(f, "{v}"),
            Scalar::UInt32(v) => write!(f, "{v}"),
            Scalar::UInt64(v) => write!(f, "{v}"),
            Scalar::BFloat16(v) => write!(f, "{v}"),
            Scalar::Float16(v) => write!(f, "{v}"),
            Scalar::Float32(v) => write!(f, "{v}"),
            Scalar::Float64(v) => write!(f, "{v}"),
            Scalar::Complex32(c) => write!(f, "{}", Complex::new(c.re.to_f64(), c.im.to_f64())),
            Scalar::Complex64(c) => write!(f, "{c}"),
            Scalar::Complex128(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_widening() {
        assert_eq!(Scalar::Int8(-3).cast(DType::Int64), Scalar::Int64(-3));
        assert_eq!(Scalar::UInt8(200).cast(DType::Float32), Scalar::Float32(200.0));
        assert_eq!(Scalar::Float32(1.5).cast(DType::Complex128), Scalar::Complex128(Complex::new(1.5, 0.0)));
        assert_eq!(Scalar::Bool(true).cast(DType::UInt16), Scalar::UInt16(1));
    }

    #[test]
    fn test_cast_by_convention() {
        assert_eq!(Scalar::Float64(2.9).cast(DType::Int32), Scalar::Int32(2));
        assert_eq!(Scalar::Int64(0).cast(DType::Bool), Scalar::Bool(false));
        assert_eq!(Scalar::Float64(1.0).cast(DType::Float16), Scalar::Float16(f16::from_f64(1.0)));
    }

    #[test]
    fn test_zero_one() {
        assert_eq!(Scalar::zero(DType::Float64), Scalar::Float64(0.0));
        assert_eq!(Scalar::one(DType::Int32), Scalar::Int32(1));
        assert_eq!(Scalar::zero(DType::Complex64).dtype(), DType::Complex64);
    }

    #[test]
    fn test_is_nan() {
        assert!(Scalar::Float32(f32::NAN).is_nan());
        assert!(Scalar::BFloat16(bf16::NAN).is_nan());
        assert!(!Scalar::Int64(1).is_nan());
    }
}
