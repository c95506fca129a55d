// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # DType Module
//!
//! Closed set of primitive element types that can live at the leaf of an array type.
//!
//! ## Promotion
//! Promotion between dtypes follows a lossless lattice:
//! - `bool` casts into every numeric dtype.
//! - Integers widen within their signedness, and unsigned integers cast into strictly
//!   wider signed integers.
//! - Integers cast into a floating dtype only when its mantissa represents every value
//!   exactly (8-bit into half precision, 16-bit into `float32`, 32-bit into `float64`).
//!   64-bit integers have no exact floating target.
//! - Floats widen, and cast into complex dtypes whose components are at least as wide.
//!
//! The lattice is implemented in [`DType::can_cast_safely`] and the least upper bound of
//! a set of dtypes in [`DType::promoted`].

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Numeric family of a [`DType`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DTypeKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Complex,
}

/// Primitive element types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    /// Brain floating point: 8 exponent bits, 7 mantissa bits.
    BFloat16,
    /// IEEE 754 half precision.
    Float16,
    Float32,
    Float64,
    /// Two `float16` components.
    Complex32,
    /// Two `float32` components.
    Complex64,
    /// Two `float64` components.
    Complex128,
}

/// Every dtype in promotion order: the first entry that all candidates cast into
/// safely is their least upper bound.
pub const PROMOTION_ORDER: [DType; 16] = [
    DType::Bool,
    DType::UInt8,
    DType::Int8,
    DType::UInt16,
    DType::Int16,
    DType::UInt32,
    DType::Int32,
    DType::UInt64,
    DType::Int64,
    DType::Float16,
    DType::BFloat16,
    DType::Float32,
    DType::Float64,
    DType::Complex32,
    DType::Complex64,
    DType::Complex128,
];

impl DType {
    /// Returns all dtypes in declaration order.
    pub const ALL: [DType; 16] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::BFloat16,
        DType::Float16,
        DType::Float32,
        DType::Float64,
        DType::Complex32,
        DType::Complex64,
        DType::Complex128,
    ];

    #[inline]
    pub fn kind(&self) -> DTypeKind {
        use DType::*;
        match self {
            Bool => DTypeKind::Bool,
            Int8 | Int16 | Int32 | Int64 => DTypeKind::Signed,
            UInt8 | UInt16 | UInt32 | UInt64 => DTypeKind::Unsigned,
            BFloat16 | Float16 | Float32 | Float64 => DTypeKind::Float,
            Complex32 | Complex64 | Complex128 => DTypeKind::Complex,
        }
    }

    /// Width in bits of the whole value (both components for complex dtypes).
    #[inline]
    pub fn bits(&self) -> usize {
        self.itemsize() * 8
    }

    /// Size in bytes.
    #[inline]
    pub fn itemsize(&self) -> usize {
        use DType::*;
        match self {
            Bool | Int8 | UInt8 => 1,
            Int16 | UInt16 | BFloat16 | Float16 => 2,
            Int32 | UInt32 | Float32 | Complex32 => 4,
            Int64 | UInt64 | Float64 | Complex64 => 8,
            Complex128 => 16,
        }
    }

    /// Natural alignment in bytes. Complex dtypes align to their component.
    #[inline]
    pub fn align(&self) -> usize {
        match self.kind() {
            DTypeKind::Complex => self.itemsize() / 2,
            _ => self.itemsize(),
        }
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self.kind(), DTypeKind::Signed | DTypeKind::Unsigned)
    }

    #[inline]
    pub fn is_inexact(&self) -> bool {
        matches!(self.kind(), DTypeKind::Float | DTypeKind::Complex)
    }

    /// Number of integer values representable exactly, as a bit count, for floats.
    /// Counts the implicit leading mantissa bit.
    #[inline]
    fn exact_integer_bits(&self) -> usize {
        use DType::*;
        match self {
            BFloat16 => 8,
            Float16 => 11,
            Float32 => 24,
            Float64 => 53,
            Complex32 => 11,
            Complex64 => 24,
            Complex128 => 53,
            _ => 0,
        }
    }

    /// Component dtype of a complex dtype, or `self` otherwise.
    #[inline]
    pub fn component(&self) -> DType {
        match self {
            DType::Complex32 => DType::Float16,
            DType::Complex64 => DType::Float32,
            DType::Complex128 => DType::Float64,
            other => *other,
        }
    }

    /// Returns `true` when every value of `self` is exactly representable in `other`.
    ///
    /// Always `true` when `self == other`.
    pub fn can_cast_safely(&self, other: &DType) -> bool {
        use DTypeKind::*;
        if self == other {
            return true;
        }
        match (self.kind(), other.kind()) {
            (Bool, _) => true,
            (_, Bool) => false,
            (Signed, Signed) | (Unsigned, Unsigned) => self.bits() <= other.bits(),
            (Unsigned, Signed) => self.bits() < other.bits(),
            (Signed, Unsigned) => false,
            (Signed | Unsigned, Float | Complex) => {
                // signed values need one bit for the sign, which floats carry separately
                let magnitude = if self.kind() == Signed { self.bits() - 1 } else { self.bits() };
                magnitude <= other.exact_integer_bits()
            }
            (Float, Float) => match (self, other) {
                (DType::Float16, DType::BFloat16) | (DType::BFloat16, DType::Float16) => false,
                _ => self.bits() < other.bits(),
            },
            (Float, Complex) => self.can_cast_safely(&other.component()),
            (Complex, Complex) => self.bits() < other.bits(),
            (Float | Complex, Signed | Unsigned) | (Complex, Float) => false,
        }
    }

    /// Returns `true` when `self` converts into `other` only by rounding: an integer
    /// into a floating dtype too narrow for it.
    pub fn is_inexact_cast(&self, other: &DType) -> bool {
        self.is_integer() && other.is_inexact() && !self.can_cast_safely(other)
    }

    /// Least upper bound of `dtypes` under [`DType::can_cast_safely`].
    ///
    /// Order invariant. Returns `None` for an empty slice or when no dtype holds all
    /// inputs exactly, e.g. `int64` with `uint64`.
    pub fn promoted(dtypes: &[DType]) -> Option<DType> {
        if dtypes.is_empty() {
            return None;
        }
        PROMOTION_ORDER
            .iter()
            .copied()
            .find(|candidate| dtypes.iter().all(|d| d.can_cast_safely(candidate)))
    }

    /// Canonical name as used by the type grammar.
    pub fn name(&self) -> &'static str {
        use DType::*;
        match self {
            Bool => "bool",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            UInt8 => "uint8",
            UInt16 => "uint16",
            UInt32 => "uint32",
            UInt64 => "uint64",
            BFloat16 => "bfloat16",
            Float16 => "float16",
            Float32 => "float32",
            Float64 => "float64",
            Complex32 => "complex32",
            Complex64 => "complex64",
            Complex128 => "complex128",
        }
    }

    /// Looks up a dtype by its grammar name.
    pub fn from_name(name: &str) -> Option<DType> {
        DType::ALL.iter().copied().find(|d| d.name() == name)
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::from_name(s).ok_or_else(|| format!("unknown dtype '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DType::*;

    #[test]
    fn test_layout() {
        assert_eq!(Complex128.itemsize(), 16);
        assert_eq!(Complex128.align(), 8);
        assert_eq!(Complex64.align(), 4);
        assert_eq!(Complex32.itemsize(), 4);
        assert_eq!(Bool.itemsize(), 1);
    }

    #[test]
    fn test_can_cast_safely() {
        assert!(Bool.can_cast_safely(&Complex128));
        assert!(UInt8.can_cast_safely(&Int16));
        assert!(!UInt8.can_cast_safely(&Int8));
        assert!(Int16.can_cast_safely(&Float32));
        assert!(Int32.can_cast_safely(&Float64));
        assert!(!Int32.can_cast_safely(&Float32));
        assert!(!Int64.can_cast_safely(&Float64));
        assert!(UInt8.can_cast_safely(&BFloat16));
        assert!(!Float16.can_cast_safely(&BFloat16));
        assert!(Float32.can_cast_safely(&Complex64));
        assert!(!Float64.can_cast_safely(&Complex64));
        assert!(!Float64.can_cast_safely(&Int64));
    }

    #[test]
    fn test_promoted() {
        assert_eq!(DType::promoted(&[Int8, UInt8]), Some(Int16));
        assert_eq!(DType::promoted(&[Float16, BFloat16]), Some(Float32));
        assert_eq!(DType::promoted(&[Int32, Float32]), Some(Float64));
        assert_eq!(DType::promoted(&[Complex64, Float64]), Some(Complex128));
        assert_eq!(DType::promoted(&[Bool, Int8]), Some(Int8));
        assert_eq!(DType::promoted(&[Int64, UInt64]), None);
        assert_eq!(DType::promoted(&[]), None);
    }

    #[test]
    fn test_inexact_cast() {
        assert!(Int64.is_inexact_cast(&Float64));
        assert!(!Int32.is_inexact_cast(&Float64));
        assert!(!Float32.is_inexact_cast(&Float64));
    }

    #[test]
    fn test_names_roundtrip() {
        for d in DType::ALL {
            assert_eq!(d.name().parse::<DType>().unwrap(), d);
        }
    }
}
